//! Reified constraint violations.
//!
//! A violation is never raised to callers as an error during merge; it is
//! materialized as a durable, queryable sidecar row next to the user table
//! so the merged working state stays self-describing. Sidecars are created
//! lazily, extended only by the validators, and truncated only by explicit
//! user deletes.

mod info;

#[cfg(test)]
mod tests;

use crate::{
    schema::{Column, TableSchema},
    store::TupleKey,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use info::{fk_violation_info, not_null_violation_info, unique_violation_info};

/// Name prefix of every per-table violation sidecar relation.
pub const SIDECAR_PREFIX: &str = "braid_constraint_violations_";

/// Name of the derived summary relation.
pub const SUMMARY_TABLE: &str = "braid_constraint_violations";

/// Surrogate-key column surfaced for keyless tables.
pub const ROW_HASH_COLUMN: &str = "braid_row_hash";

///
/// ViolationKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ViolationKind {
    ForeignKey,
    UniqueIndex,
    CheckConstraint,
    NotNull,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ForeignKey => "foreign key",
            Self::UniqueIndex => "unique index",
            Self::CheckConstraint => "check constraint",
            Self::NotNull => "not null",
        };
        write!(f, "{label}")
    }
}

///
/// ViolationRow
///
/// One reified violation: the offending user row copied in full (so a
/// later user-table delete still leaves inspectable evidence) plus the
/// constraint metadata frozen at emission time.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ViolationRow {
    pub from_root_ish: String,
    pub kind: ViolationKind,
    pub key: TupleKey,
    pub row_values: Vec<Value>,
    pub info: serde_json::Value,
}

///
/// Sidecar
///
/// The per-table violation relation `braid_constraint_violations_<table>`.
/// Column layout is derived from the user table's schema at creation and
/// is never rewritten afterwards: recorded rows outlive later schema
/// changes to the user table.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Sidecar {
    table: String,
    columns: Vec<Column>,
    keyless: bool,
    rows: Vec<ViolationRow>,
}

impl Sidecar {
    #[must_use]
    pub fn for_table(schema: &TableSchema) -> Self {
        Self {
            table: schema.name().to_string(),
            columns: schema.columns().to_vec(),
            keyless: schema.is_keyless(),
            rows: Vec::new(),
        }
    }

    /// Relation name of this sidecar.
    #[must_use]
    pub fn relation_name(&self) -> String {
        format!("{SIDECAR_PREFIX}{}", self.table)
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// User-table columns as recorded at sidecar creation.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names of the sidecar relation, in wire order: the fixed
    /// prefix, the user table's columns as recorded, the info column,
    /// and the surrogate hash column for keyless carriers.
    #[must_use]
    pub fn relation_columns(&self) -> Vec<String> {
        let mut out = vec!["from_root_ish".to_string(), "violation_type".to_string()];
        out.extend(self.columns.iter().map(|column| column.name.clone()));
        out.push("violation_info".to_string());
        if self.keyless {
            out.push(ROW_HASH_COLUMN.to_string());
        }
        out
    }

    #[must_use]
    pub const fn is_keyless(&self) -> bool {
        self.keyless
    }

    #[must_use]
    pub fn rows(&self) -> &[ViolationRow] {
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

    /// Append one violation, idempotently.
    ///
    /// The dedup key is `(kind, primary key, violation_info)`: re-running
    /// a validator over identical inputs must not grow the sidecar. The
    /// first emission wins, including its `from_root_ish`.
    pub fn record(&mut self, row: ViolationRow) -> bool {
        let duplicate = self.rows.iter().any(|existing| {
            existing.kind == row.kind && existing.key == row.key && existing.info == row.info
        });
        if duplicate {
            return false;
        }

        self.rows.push(row);
        true
    }

    /// User-driven delete of every recorded violation.
    pub fn delete_all(&mut self) -> usize {
        let removed = self.rows.len();
        self.rows.clear();
        removed
    }

    /// User-driven delete of the violations recorded for one row key.
    pub fn delete_for_key(&mut self, key: &TupleKey) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| &row.key != key);
        before - self.rows.len()
    }
}

///
/// SummaryRow
///
/// One row of the derived `braid_constraint_violations` relation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SummaryRow {
    pub table: String,
    pub num_violations: u64,
}
