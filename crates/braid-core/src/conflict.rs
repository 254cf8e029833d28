//! Two-sided value conflicts.
//!
//! When both sides change one row differently the merge records the
//! three-way evidence here and keeps the `ours` row in the merged map.
//! The ledger is independent of the violation sidecar: one row may sit
//! in both, and both must be drained before commit.

use crate::store::{Row, TupleKey};
use serde::{Deserialize, Serialize};

///
/// Conflict
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Conflict {
    pub key: TupleKey,
    pub base: Option<Row>,
    pub ours: Option<Row>,
    pub theirs: Option<Row>,
}

///
/// ConflictLedger
///
/// Per-table record of unresolved value conflicts, in row-merge emission
/// order.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConflictLedger {
    rows: Vec<Conflict>,
}

impl ConflictLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn record(&mut self, conflict: Conflict) {
        self.rows.push(conflict);
    }

    #[must_use]
    pub fn rows(&self) -> &[Conflict] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// User-driven resolution: drop every recorded conflict.
    pub fn delete_all(&mut self) -> usize {
        let removed = self.rows.len();
        self.rows.clear();
        removed
    }
}
