//! Three-way merge driver.
//!
//! Contract:
//! - schemas merge first and fix the layout the data merger projects into
//! - every table merges before any validator runs, so validators only
//!   ever consult merged indexes (cycles and self-references need the
//!   fixed point)
//! - violations are persisted through the sidecar manager; the caller
//!   publishes the returned root atomically or not at all

pub(crate) mod fk;
pub(crate) mod rows;
pub(crate) mod uniq;


use crate::{
    error::InternalError,
    merge::fk::{PendingViolation, resolve_foreign_keys},
    obs::{MetricsEvent, record},
    schema::merge_table_schemas,
    store::{Root, Row, TableData, TupleKey},
    value::Value,
    violation::{ViolationKind, ViolationRow, not_null_violation_info},
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use rows::{EditOp, EditOrigin, RowEdit, RowMergeOutput, merge_rows};

///
/// MergeOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergeOutcome {
    /// No conflicts, no violations.
    Clean,
    /// Working state applied, sidecars non-empty, commit gate armed.
    Violations,
    /// Two-sided value conflicts present (violations may also be present).
    Conflicts,
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Clean => "clean",
            Self::Violations => "violations",
            Self::Conflicts => "conflicts",
        };
        write!(f, "{label}")
    }
}

impl MergeOutcome {
    pub(crate) const fn metric_kind(self) -> crate::obs::sink::MergeOutcomeKind {
        match self {
            Self::Clean => crate::obs::sink::MergeOutcomeKind::Clean,
            Self::Violations => crate::obs::sink::MergeOutcomeKind::Violations,
            Self::Conflicts => crate::obs::sink::MergeOutcomeKind::Conflicts,
        }
    }
}

///
/// MergeReport
///

#[derive(Debug)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    pub merged: Root,
    /// Violations recorded by this merge (idempotent duplicates excluded).
    pub violations: u64,
    /// Value conflicts recorded by this merge.
    pub conflicts: u64,
}

/// Merge `ours` and `theirs` against their common ancestor `base`.
///
/// Returns the merged root plus populated sidecars and conflict
/// ledgers. Nothing is published here: a cancelled or failed merge
/// leaves the caller's working state untouched.
pub fn merge_roots(base: &Root, ours: &Root, theirs: &Root) -> Result<MergeReport, InternalError> {
    record(MetricsEvent::MergeStart);

    let ours_ish = ours.root_ish()?;
    let theirs_ish = theirs.root_ish()?;

    // Pass 1: schemas, then per-table data. Edits buffer until every
    // table is merged so validators can query merged indexes.
    let mut merged = Root::new();
    let mut edit_streams: BTreeMap<String, Vec<RowEdit>> = BTreeMap::new();

    for name in table_name_union(base, ours, theirs) {
        let Some(schema) = merge_table_schemas(
            &name,
            base.table(&name).map(TableData::schema),
            ours.table(&name).map(TableData::schema),
            theirs.table(&name).map(TableData::schema),
        )?
        else {
            continue;
        };

        let base_rows = projected_rows(base, &name, &schema)?;
        let our_rows = projected_rows(ours, &name, &schema)?;
        let their_rows = projected_rows(theirs, &name, &schema)?;

        let output = merge_rows(&base_rows, &our_rows, &their_rows);
        record(MetricsEvent::TableMerged {
            edits: output.edits.len() as u64,
            conflicts: output.conflicts.len() as u64,
        });

        let mut table = TableData::new(schema);
        table.replace_rows(output.rows);
        merged.put_table(table);

        if !output.conflicts.is_empty() {
            let ledger = merged.conflict_ledger_mut(&name);
            for conflict in output.conflicts {
                ledger.record(conflict);
            }
        }

        edit_streams.insert(name, output.edits);
    }

    // Pass 2: classification against the merged fixed point.
    let resolved = resolve_foreign_keys(&merged)?;
    let mut pending: Vec<PendingViolation> = Vec::new();

    for (name, edits) in &edit_streams {
        for edit in edits {
            fk::validate_edit(
                &merged, &resolved, name, edit, &ours_ish, &theirs_ish, &mut pending,
            );
        }
        uniq::validate_unique(&merged, name, edits, &ours_ish, &theirs_ish, &mut pending)?;
    }

    // Declarations first resolved by this merge have no triggering
    // edits; their whole child relation is swept against merged state.
    for entry in &resolved {
        if fk::fk_resolved_in(base, entry.fk()) {
            continue;
        }
        let declared_by_ours = declares_fk(ours, entry.fk());
        let from_root_ish = if declared_by_ours { &ours_ish } else { &theirs_ish };
        fk::validate_all_children(&merged, entry, from_root_ish, &mut pending);
    }

    validate_added_not_null(base, ours, theirs, &merged, &ours_ish, &theirs_ish, &mut pending);

    // Pass 3: persistence through the sidecar manager. A unique-index
    // violator is withheld from the merged user table afterwards: the
    // index cannot physically carry both rows, so the newer one survives
    // only as sidecar evidence.
    let mut recorded = 0u64;
    let mut withheld: Vec<(String, TupleKey)> = Vec::new();
    for violation in pending {
        let schema = merged.try_table(&violation.table)?.schema().clone();
        let kind = violation.row.kind;
        if kind == ViolationKind::UniqueIndex {
            withheld.push((violation.table.clone(), violation.row.key.clone()));
        }
        if merged.record_violation(&schema, violation.row)? {
            recorded = recorded.saturating_add(1);
            record(MetricsEvent::ViolationRecorded { kind });
        }
    }
    for (table, key) in withheld {
        if let Some(data) = merged.table_mut(&table) {
            data.remove_entry(&key);
        }
    }

    let conflicts = merged
        .conflicts()
        .values()
        .map(|ledger| ledger.len() as u64)
        .sum::<u64>();

    let outcome = if conflicts > 0 {
        MergeOutcome::Conflicts
    } else if merged.has_violations() {
        MergeOutcome::Violations
    } else {
        MergeOutcome::Clean
    };
    record(MetricsEvent::MergeFinish {
        outcome: outcome.metric_kind(),
    });

    Ok(MergeReport {
        outcome,
        merged,
        violations: recorded,
        conflicts,
    })
}

// Whether a side's schema carries this exact foreign-key declaration.
fn declares_fk(root: &Root, fk: &crate::schema::ForeignKey) -> bool {
    root.table(fk.table()).is_some_and(|table| {
        table
            .schema()
            .foreign_keys()
            .iter()
            .any(|declared| declared == fk)
    })
}

fn table_name_union(base: &Root, ours: &Root, theirs: &Root) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for root in [base, ours, theirs] {
        names.extend(root.tables().keys().cloned());
    }
    names
}

fn projected_rows(
    root: &Root,
    name: &str,
    schema: &crate::schema::TableSchema,
) -> Result<BTreeMap<TupleKey, Row>, InternalError> {
    match root.table(name) {
        Some(table) => Ok(table.project_to(schema)?.rows().clone()),
        None => Ok(BTreeMap::new()),
    }
}

// One-sided column adds can leave NULL in a NOT NULL column on rows the
// adding side never saw; those rows are reified rather than rejected.
fn validate_added_not_null(
    base: &Root,
    ours: &Root,
    theirs: &Root,
    merged: &Root,
    ours_ish: &str,
    theirs_ish: &str,
    out: &mut Vec<PendingViolation>,
) {
    for (name, table) in merged.tables() {
        let in_root = |root: &Root, column: &str| {
            root.table(name)
                .is_some_and(|table| table.schema().column(column).is_some())
        };

        for (position, column) in table.schema().columns().iter().enumerate() {
            if column.nullable || in_root(base, &column.name) {
                continue;
            }

            // The side that never saw the column owns the NULL rows.
            let from_root_ish = match (in_root(ours, &column.name), in_root(theirs, &column.name)) {
                (true, false) => theirs_ish,
                (false, true) => ours_ish,
                _ => continue,
            };

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
