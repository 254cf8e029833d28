//! Merge-time foreign-key validation.
//!
//! Every check reads the merged state only: both endpoints of a foreign
//! key are re-read from the merged maps, which makes cyclic and
//! self-referential declarations ordinary cases and keeps violations
//! from cascading down chains. Validators never mutate user data; they
//! emit pending violations the driver persists.

use crate::{
    error::InternalError,
    merge::rows::{EditOp, EditOrigin, RowEdit},
    schema::ForeignKey,
    store::{IndexMap, Root, index_key_from},
    value::Value,
    violation::{ViolationKind, ViolationRow, fk_violation_info},
};

///
/// PendingViolation
///
/// One violation waiting for the driver to persist into `table`'s
/// sidecar once validation finishes.
///

#[derive(Clone, Debug)]
pub(crate) struct PendingViolation {
    pub table: String,
    pub row: ViolationRow,
}

///
/// ResolvedFk
///
/// A foreign key whose endpoints and supporting indexes all exist in
/// the merged schema, snapshotted with the derived indexes over the
/// merged state it validates against.
///

pub(crate) struct ResolvedFk {
    fk: ForeignKey,
    parent_index: IndexMap,
    child_index: IndexMap,
    child_positions: Vec<usize>,
    parent_positions: Vec<usize>,
}

impl ResolvedFk {
    pub(crate) fn fk(&self) -> &ForeignKey {
        &self.fk
    }
}

// A supporting index covers a column list when the list is its prefix.
fn index_covers(index_columns: &[String], columns: &[String]) -> bool {
    index_columns.len() >= columns.len() && &index_columns[..columns.len()] == columns
}

/// Whether `fk` is resolved within `root`: the declaration is present,
/// both endpoint tables exist, and both supporting indexes exist.
pub(crate) fn fk_resolved_in(root: &Root, fk: &ForeignKey) -> bool {
    let (Some(child), Some(parent)) = (root.table(fk.table()), root.table(fk.referenced_table()))
    else {
        return false;
    };

    child
        .schema()
        .foreign_keys()
        .iter()
        .any(|declared| declared.name() == fk.name())
        && child
            .schema()
            .supporting_index_columns(fk.index())
            .is_some_and(|columns| index_covers(columns, fk.columns()))
        && parent
            .schema()
            .supporting_index_columns(fk.referenced_index())
            .is_some_and(|columns| index_covers(columns, fk.referenced_columns()))
}

/// Collect every foreign key resolved in the merged schema, with its
/// derived merged-state indexes. Unresolved declarations are skipped;
/// they stay in the schema untouched.
pub(crate) fn resolve_foreign_keys(merged: &Root) -> Result<Vec<ResolvedFk>, InternalError> {
    let mut resolved = Vec::new();

    for (table_name, table) in merged.tables() {
        for fk in table.schema().foreign_keys() {
            if fk.table() != table_name {
                // A declaration carried onto a foreign schema never resolves.
                continue;
            }

            let Some(parent) = merged.table(fk.referenced_table()) else {
                continue;
            };

            let child_supported = table
                .schema()
                .supporting_index_columns(fk.index())
                .is_some_and(|columns| index_covers(columns, fk.columns()));
            let parent_supported = parent
                .schema()
                .supporting_index_columns(fk.referenced_index())
                .is_some_and(|columns| index_covers(columns, fk.referenced_columns()));

            if !child_supported || !parent_supported {
                // Unresolved: preserved in schema, exempt from validation.
                continue;
            }

            let child_positions: Option<Vec<usize>> = fk
                .columns()
                .iter()
                .map(|column| table.schema().column_position(column))
                .collect();
            let parent_positions: Option<Vec<usize>> = fk
                .referenced_columns()
                .iter()
                .map(|column| parent.schema().column_position(column))
                .collect();
            let (Some(child_positions), Some(parent_positions)) =
                (child_positions, parent_positions)
            else {
                continue;
            };

            resolved.push(ResolvedFk {
                fk: fk.clone(),
                parent_index: IndexMap::build(parent, fk.referenced_columns())?,
                child_index: IndexMap::build(table, fk.columns())?,
                child_positions,
                parent_positions,
            });
        }
    }

    Ok(resolved)
}

/// Validate one edit against every resolved foreign key it touches.
///
/// Child-role checks run before parent-role checks so a self-referential
/// edit attributes its violation to the inserting side first.
pub(crate) fn validate_edit(
    merged: &Root,
    resolved: &[ResolvedFk],
    table: &str,
    edit: &RowEdit,
    ours_ish: &str,
    theirs_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    let from_root_ish = origin_ish(edit.origin, ours_ish, theirs_ish);

    for entry in resolved {
        if entry.fk.table() == table {
            validate_child_side(entry, edit, from_root_ish, out);
        }
        if entry.fk.referenced_table() == table {
            validate_parent_side(merged, entry, edit, from_root_ish, out);
        }
    }
}

const fn origin_ish<'a>(origin: EditOrigin, ours_ish: &'a str, theirs_ish: &'a str) -> &'a str {
    match origin {
        EditOrigin::Ours | EditOrigin::Both => ours_ish,
        EditOrigin::Theirs => theirs_ish,
    }
}

// Child-side insert or update: the referring values must exist in the
// merged parent index. NULL in any referring column exempts the row.
fn validate_child_side(
    entry: &ResolvedFk,
    edit: &RowEdit,
    from_root_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    if !matches!(edit.op, EditOp::Insert | EditOp::Update) {
        return;
    }
    let Some(new_row) = &edit.new else {
        return;
    };
    check_child_row(entry, &edit.key, new_row.values(), from_root_ish, out);
}

fn check_child_row(
    entry: &ResolvedFk,
    key: &crate::store::TupleKey,
    values: &[Value],
    from_root_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    let Some(referring) = index_key_from(values, &entry.child_positions) else {
        return;
    };

    if entry.parent_index.contains(&referring) {
        return;
    }

    out.push(PendingViolation {
        table: entry.fk.table().to_string(),
        row: ViolationRow {
            from_root_ish: from_root_ish.to_string(),
            kind: ViolationKind::ForeignKey,
            key: key.clone(),
            row_values: values.to_vec(),
            info: fk_violation_info(&entry.fk),
        },
    });
}

/// Validate every child row of one foreign key against the merged
/// parent index.
///
/// Used for declarations that became resolved through this merge (added
/// on one side, or an endpoint table created on one side): rows that
/// were legal in the ancestor but violate under the merged schema carry
/// no triggering edit, so the whole child relation is swept once.
pub(crate) fn validate_all_children(
    merged: &Root,
    entry: &ResolvedFk,
    from_root_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    let Some(child) = merged.table(entry.fk.table()) else {
        return;
    };
    for (key, row) in child.rows() {
        check_child_row(entry, key, row.values(), from_root_ish, out);
    }
}

// Parent-side delete, or update that moves the referenced values: every
// child row still referencing the departed values violates, unless
// another parent row with the same values remains in the merged state.
fn validate_parent_side(
    merged: &Root,
    entry: &ResolvedFk,
    edit: &RowEdit,
    from_root_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    let Some(old_row) = &edit.old else {
        return;
    };
    let Some(departed) = index_key_from(old_row.values(), &entry.parent_positions) else {
        return;
    };

    match edit.op {
        EditOp::Delete => {}
        EditOp::Update => {
            let arrived = edit
                .new
                .as_ref()
                .and_then(|row| index_key_from(row.values(), &entry.parent_positions));
            if arrived.as_ref() == Some(&departed) {
                // Referenced values unchanged; nothing departed.
                return;
            }
        }
        EditOp::Insert => return,
    }

    // Parent-value multiplicity: a surviving duplicate absorbs the loss.
    if entry.parent_index.contains(&departed) {
        return;
    }

    emit_stranded_children(merged, entry, &departed, from_root_ish, out);
}

fn emit_stranded_children(
    merged: &Root,
    entry: &ResolvedFk,
    departed: &[Value],
    from_root_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    let Some(children) = entry.child_index.rows_for(departed) else {
        return;
    };
    let Some(child_table) = merged.table(entry.fk.table()) else {
        return;
    };

    for child_key in children {
        let Some(child_row) = child_table.get(child_key) else {
            continue;
        };
        out.push(PendingViolation {
            table: entry.fk.table().to_string(),
            row: ViolationRow {
                from_root_ish: from_root_ish.to_string(),
                kind: ViolationKind::ForeignKey,
                key: child_key.clone(),
                row_values: child_row.values().to_vec(),
                info: fk_violation_info(&entry.fk),
            },
        });
    }
}
