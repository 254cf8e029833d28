//! Merge-time unique-index validation.
//!
//! Scans the edit stream against each unique secondary index of the
//! merged schema. When two or more merged rows share one non-NULL index
//! key, the newer of the colliding rows is reified as the violation; the
//! driver then withholds it from the user table, where the oldest
//! carrier keeps the key. Rows whose indexed columns include NULL never
//! collide.

use crate::{
    error::InternalError,
    merge::{
        fk::PendingViolation,
        rows::{EditOp, EditOrigin, RowEdit},
    },
    store::{IndexMap, Root, TupleKey, index_key_from},
    violation::{ViolationKind, ViolationRow, unique_violation_info},
};
use std::collections::BTreeMap;

// Age rank of one merged row for the newest-loses rule: rows untouched
// by the merge are oldest, then ours-side edits, then theirs-side, with
// edit sequence and key order breaking ties.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct AgeRank {
    origin: u8,
    sequence: usize,
}

const fn origin_age(origin: EditOrigin) -> u8 {
    match origin {
        EditOrigin::Ours | EditOrigin::Both => 1,
        EditOrigin::Theirs => 2,
    }
}

/// Validate one table's edit stream against its unique indexes.
pub(crate) fn validate_unique(
    merged: &Root,
    table_name: &str,
    edits: &[RowEdit],
    ours_ish: &str,
    theirs_ish: &str,
    out: &mut Vec<PendingViolation>,
) -> Result<(), InternalError> {
    let Some(table) = merged.table(table_name) else {
        return Ok(());
    };

    let unique_indexes: Vec<_> = table
        .schema()
        .indexes()
        .iter()
        .filter(|index| index.unique())
        .cloned()
        .collect();
    if unique_indexes.is_empty() {
        return Ok(());
    }

    // Age of every row an edit (re)wrote, by key.
    let mut edited_age: BTreeMap<&TupleKey, AgeRank> = BTreeMap::new();
    for (sequence, edit) in edits.iter().enumerate() {
        if matches!(edit.op, EditOp::Insert | EditOp::Update) && edit.new.is_some() {
            edited_age.insert(
                &edit.key,
                AgeRank {
                    origin: origin_age(edit.origin),
                    sequence,
                },
            );
        }
    }
    if edited_age.is_empty() {
        return Ok(());
    }

    for index in unique_indexes {
        let positions: Vec<usize> = index
            .columns()
            .iter()
            .filter_map(|column| table.schema().column_position(column))
            .collect();
        if positions.len() != index.columns().len() {
            continue;
        }

        let merged_index = IndexMap::build(table, index.columns())?;

        for edit in edits {
            if !matches!(edit.op, EditOp::Insert | EditOp::Update) {
                continue;
            }
            let Some(new_row) = &edit.new else {
                continue;
            };
            let Some(index_key) = index_key_from(new_row.values(), &positions) else {
                continue;
            };
            let Some(group) = merged_index.rows_for(&index_key) else {
                continue;
            };
            if group.len() < 2 {
                continue;
            }

            // The oldest group member keeps the key without violating.
            let oldest = group.iter().min_by_key(|key| {
                edited_age.get(*key).copied().unwrap_or(AgeRank {
                    origin: 0,
                    sequence: 0,
                })
            });
            if oldest == Some(&edit.key) {
                continue;
            }

            out.push(PendingViolation {
                table: table_name.to_string(),
                row: ViolationRow {
                    from_root_ish: match edit.origin {
                        EditOrigin::Ours | EditOrigin::Both => ours_ish.to_string(),
                        EditOrigin::Theirs => theirs_ish.to_string(),
                    },
                    kind: ViolationKind::UniqueIndex,
                    key: edit.key.clone(),
                    row_values: new_row.values().to_vec(),
                    info: unique_violation_info(&index),
                },
            });
        }
    }

    Ok(())
}
