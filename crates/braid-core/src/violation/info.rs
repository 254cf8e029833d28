//! `violation_info` JSON builders.
//!
//! The emitted key ordering is a per-version output contract: keys are
//! alphabetical, which `serde_json`'s BTree-backed map produces without a
//! feature flag. Values freeze the schema metadata at emission time;
//! later schema changes never rewrite recorded objects.

use crate::schema::{ForeignKey, IndexSchema};
use serde_json::json;

/// Foreign-key `violation_info` object.
///
/// Keys: `Columns`, `ForeignKey`, `Index`, `OnDelete`, `OnUpdate`,
/// `ReferencedColumns`, `ReferencedIndex`, `ReferencedTable`, `Table`.
#[must_use]
pub fn fk_violation_info(fk: &ForeignKey) -> serde_json::Value {
    json!({
        "Columns": fk.columns(),
        "ForeignKey": fk.name(),
        "Index": fk.index(),
        "OnDelete": fk.on_delete().to_string(),
        "OnUpdate": fk.on_update().to_string(),
        "ReferencedColumns": fk.referenced_columns(),
        "ReferencedIndex": fk.referenced_index(),
        "ReferencedTable": fk.referenced_table(),
        "Table": fk.table(),
    })
}

/// Unique-index `violation_info` object. Keys: `Columns`, `Name`.
#[must_use]
pub fn unique_violation_info(index: &IndexSchema) -> serde_json::Value {
    json!({
        "Columns": index.columns(),
        "Name": index.name(),
    })
}

/// NOT NULL `violation_info` object. Keys: `Columns`.
#[must_use]
pub fn not_null_violation_info(columns: &[String]) -> serde_json::Value {
    json!({ "Columns": columns })
}
