//! Commit gate and status reporting.
//!
//! The gate is a read-only predicate over the working root's sidecars
//! and conflict ledgers; it takes no locks and consults the summary once
//! per commit attempt. A forced commit (together with the session
//! setting) bypasses the gate but never clears a sidecar.

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    obs::{MetricsEvent, record},
    session::SessionConfig,
    store::Root,
};
use std::fmt;

///
/// ConstraintStatus
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstraintStatus {
    /// At least one sidecar row remains for the table.
    FixConstraintViolations,
    /// The table's sidecar was drained since the merge but the drain is
    /// not yet committed.
    ConstraintViolationsFixed,
}

impl fmt::Display for ConstraintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FixConstraintViolations => "fix constraint violations",
            Self::ConstraintViolationsFixed => "constraint violations fixed",
        };
        write!(f, "{label}")
    }
}

///
/// StatusNote
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusNote {
    pub table: String,
    pub status: ConstraintStatus,
}

///
/// TableChange
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TableChange {
    Added(String),
    Dropped(String),
    Modified(String),
}

///
/// StatusReport
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StatusReport {
    pub table_changes: Vec<TableChange>,
    pub notes: Vec<StatusNote>,
    /// Tables with an undrained conflicts ledger.
    pub conflict_tables: Vec<String>,
}

impl StatusReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.table_changes.is_empty() && self.notes.is_empty() && self.conflict_tables.is_empty()
    }
}

/// Decide whether the working root may commit.
///
/// Fails with a constraint-violation error while any sidecar holds a
/// row, unless `force` is passed together with
/// `braid_force_transaction_commit=1`. Conflicts gate independently
/// through `braid_allow_commit_conflicts`.
pub fn check_commit(root: &Root, session: &SessionConfig, force: bool) -> Result<(), InternalError> {
    if root.has_violations() && !(force && session.force_transaction_commit) {
        record(MetricsEvent::CommitBlocked);
        let tables = root.violation_tables().join(", ");
        return Err(InternalError::constraint_violation(
            ErrorOrigin::Commit,
            format!("constraint violation: fix constraint violations in {tables} before committing"),
        ));
    }

    if root.has_conflicts() && !session.allow_commit_conflicts {
        record(MetricsEvent::CommitBlocked);
        return Err(InternalError::new(
            ErrorClass::Conflict,
            ErrorOrigin::Commit,
            "unresolved conflicts present; resolve them or set braid_allow_commit_conflicts",
        ));
    }

    Ok(())
}

/// Build the working-set status against the current HEAD root.
///
/// `merge_violation_tables` is the set of tables whose sidecars the last
/// merge populated; a member whose sidecar is now empty reports
/// "constraint violations fixed" until the fix commits.
#[must_use]
pub fn status(head: &Root, working: &Root, merge_violation_tables: &[String]) -> StatusReport {
    let mut report = StatusReport::default();

    for (name, table) in working.tables() {
        match head.table(name) {
            None => report.table_changes.push(TableChange::Added(name.clone())),
            Some(head_table) if head_table != table => {
                report.table_changes.push(TableChange::Modified(name.clone()));
            }
            Some(_) => {}
        }
    }
    for name in head.tables().keys() {
        if working.table(name).is_none() {
            report.table_changes.push(TableChange::Dropped(name.clone()));
        }
    }

    let violating = working.violation_tables();
    for table in &violating {
        report.notes.push(StatusNote {
            table: table.clone(),
            status: ConstraintStatus::FixConstraintViolations,
        });
    }
    for table in merge_violation_tables {
        if !violating.contains(table) {
            report.notes.push(StatusNote {
                table: table.clone(),
                status: ConstraintStatus::ConstraintViolationsFixed,
            });
        }
    }

    report.conflict_tables = working
        .conflicts()
        .iter()
        .filter(|(_, ledger)| !ledger.is_empty())
        .map(|(table, _)| table.clone())
        .collect();

    report
}
