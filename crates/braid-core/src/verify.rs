//! Constraint re-derivation (`constraints verify`).
//!
//! Re-runs the merge-time validators outside a merge. The default scope
//! is the set of rows touched since HEAD (derived by diffing HEAD
//! against the working root); `--all` reconsiders every row of the
//! selected tables, including rows that predate the engine.
//! `--output-only` computes the violation set without persisting any
//! sidecar.

use crate::{
    error::{ErrorOrigin, InternalError},
    merge::{
        EditOp, EditOrigin, RowEdit,
        fk::{PendingViolation, resolve_foreign_keys},
        uniq::validate_unique,
    },
    obs::{MetricsEvent, record},
    store::Root,
    value::Value,
    violation::{SummaryRow, ViolationKind, ViolationRow, not_null_violation_info},
};
use std::collections::BTreeMap;

///
/// VerifyOptions
///

#[derive(Clone, Debug, Default)]
pub struct VerifyOptions {
    /// Reconsider every row, not just rows touched since HEAD.
    pub all: bool,
    /// Report without persisting sidecars.
    pub output_only: bool,
    /// Restrict verification to these tables; empty means every table.
    pub tables: Vec<String>,
}

///
/// VerifyReport
///

#[derive(Clone, Debug)]
pub struct VerifyReport {
    /// Violations found by this run, idempotent duplicates included.
    pub found: u64,
    /// Violations newly recorded into sidecars (zero for output-only).
    pub recorded: u64,
    /// Post-run summary of the (possibly hypothetical) sidecar state.
    pub summary: Vec<SummaryRow>,
}

impl VerifyReport {
    #[must_use]
    pub const fn any_found(&self) -> bool {
        self.found > 0
    }
}

/// Re-derive constraint violations for the working root against HEAD.
pub fn verify_constraints(
    head: &Root,
    working: &mut Root,
    opts: &VerifyOptions,
) -> Result<VerifyReport, InternalError> {
    let selected = selected_tables(working, &opts.tables)?;
    let from_root_ish = working.root_ish()?;

    // Scope derivation happens against the published working state; the
    // validators then classify exactly as they would inside a merge.
    let mut edit_streams: BTreeMap<String, Vec<RowEdit>> = BTreeMap::new();
    for name in &selected {
        let edits = if opts.all {
            synthesize_full_scan(working, name)?
        } else {
            diff_against_head(head, working, name)?
        };
        edit_streams.insert(name.clone(), edits);
    }

    let resolved = resolve_foreign_keys(working)?;
    let mut pending: Vec<PendingViolation> = Vec::new();

    for (name, edits) in &edit_streams {
        for edit in edits {
            crate::merge::fk::validate_edit(
                working,
                &resolved,
                name,
                edit,
                &from_root_ish,
                &from_root_ish,
                &mut pending,
            );
        }
        validate_unique(working, name, edits, &from_root_ish, &from_root_ish, &mut pending)?;
    }

    if opts.all {
        scan_not_null(working, &selected, &from_root_ish, &mut pending);
    }

    // Record into a scratch copy so output-only runs stay side-effect
    // free and failed runs publish nothing.
    let mut target = working.clone();
    let found = pending.len() as u64;
    let mut recorded = 0u64;
    for violation in pending {
        let schema = target.try_table(&violation.table)?.schema().clone();
        if target.record_violation(&schema, violation.row)? {
            recorded = recorded.saturating_add(1);
        }
    }

    record(MetricsEvent::VerifyRun { violations: found });

    let summary = target.violation_summary();
    if opts.output_only {
        return Ok(VerifyReport {
            found,
            recorded: 0,
            summary,
        });
    }

    *working = target;
    Ok(VerifyReport {
        found,
        recorded,
        summary,
    })
}

fn selected_tables(working: &Root, requested: &[String]) -> Result<Vec<String>, InternalError> {
    if requested.is_empty() {
        return Ok(working.tables().keys().cloned().collect());
    }

    for name in requested {
        if working.table(name).is_none() {
            return Err(InternalError::not_found(
                ErrorOrigin::Verify,
                format!("cannot verify unknown table '{name}'"),
            ));
        }
    }
    Ok(requested.to_vec())
}

// `--all`: every row becomes an insert-shaped edit.
fn synthesize_full_scan(working: &Root, name: &str) -> Result<Vec<RowEdit>, InternalError> {
    let table = working.try_table(name)?;
    Ok(table
        .rows()
        .iter()
        .map(|(key, row)| RowEdit {
            origin: EditOrigin::Ours,
            op: EditOp::Insert,
            key: key.clone(),
            old: None,
            new: Some(row.clone()),
        })
        .collect())
}

// Default scope: rows differing from HEAD, as insert/update/delete edits.
fn diff_against_head(head: &Root, working: &Root, name: &str) -> Result<Vec<RowEdit>, InternalError> {
    let table = working.try_table(name)?;
    let head_rows = match head.table(name) {
        Some(head_table) => head_table.project_to(table.schema())?.rows().clone(),
        None => BTreeMap::new(),
    };

    let mut edits = Vec::new();

    for (key, row) in table.rows() {
        match head_rows.get(key) {
            None => edits.push(RowEdit {
                origin: EditOrigin::Ours,
                op: EditOp::Insert,
                key: key.clone(),
                old: None,
                new: Some(row.clone()),
            }),
            Some(head_row) if head_row != row => edits.push(RowEdit {
                origin: EditOrigin::Ours,
                op: EditOp::Update,
                key: key.clone(),
                old: Some(head_row.clone()),
                new: Some(row.clone()),
            }),
            Some(_) => {}
        }
    }

    for (key, head_row) in &head_rows {
        if table.get(key).is_none() {
            edits.push(RowEdit {
                origin: EditOrigin::Ours,
                op: EditOp::Delete,
                key: key.clone(),
                old: Some(head_row.clone()),
                new: None,
            });
        }
    }

    // Deletes arrive after the in-order walk above; restore key order so
    // emission order matches the merge-time contract.
    edits.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(edits)
}

// `--all` additionally surfaces NULL sitting in NOT NULL columns.
fn scan_not_null(
    working: &Root,
    selected: &[String],
    from_root_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    for name in selected {
        let Some(table) = working.table(name) else {
            continue;
        };
        for (position, column) in table.schema().columns().iter().enumerate() {
            if column.nullable {
                continue;
            }
            for (key, row) in table.rows() {
                if row.value(position).is_some_and(Value::is_null) {
                    out.push(PendingViolation {
                        table: name.clone(),
                        row: ViolationRow {
                            from_root_ish: from_root_ish.to_string(),
                            kind: ViolationKind::NotNull,
                            key: key.clone(),
                            row_values: row.values().to_vec(),
                            info: not_null_violation_info(std::slice::from_ref(&column.name)),
                        },
                    });
                }
            }
        }
    }
}
