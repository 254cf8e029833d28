use crate::{
    conflict::ConflictLedger,
    error::{ErrorClass, ErrorOrigin, InternalError},
    hash::digest_hex,
    schema::TableSchema,
    serialize::serialize,
    store::TableData,
    violation::{Sidecar, SummaryRow, ViolationRow},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Root
///
/// One full named-table snapshot: user tables plus the sidecars and
/// conflict ledgers riding with them. Commits point at roots; the
/// working set is a mutable root. Sidecars and ledgers propagate across
/// branches only by traveling inside their root.
///
/// Invariant: a table has a sidecar entry iff that sidecar has at least
/// one row. The pruning helpers below maintain it; an empty sidecar is
/// indistinguishable from absence.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Root {
    tables: BTreeMap<String, TableData>,
    sidecars: BTreeMap<String, Sidecar>,
    conflicts: BTreeMap<String, ConflictLedger>,
}

impl Root {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            sidecars: BTreeMap::new(),
            conflicts: BTreeMap::new(),
        }
    }

    /// Opaque identifier of this root: hex SHA-256 over the canonical
    /// CBOR encoding. Every `from_root_ish` value is one of these.
    pub fn root_ish(&self) -> Result<String, InternalError> {
        let bytes = serialize(self)?;
        Ok(digest_hex("braid:root:v1", &bytes))
    }

    // --- tables

    #[must_use]
    pub const fn tables(&self) -> &BTreeMap<String, TableData> {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableData> {
        self.tables.get_mut(name)
    }

    pub fn try_table(&self, name: &str) -> Result<&TableData, InternalError> {
        self.table(name).ok_or_else(|| {
            InternalError::not_found(ErrorOrigin::Store, format!("table '{name}' not found"))
        })
    }

    pub fn try_table_mut(&mut self, name: &str) -> Result<&mut TableData, InternalError> {
        self.tables.get_mut(name).ok_or_else(|| {
            InternalError::not_found(ErrorOrigin::Store, format!("table '{name}' not found"))
        })
    }

    pub fn create_table(&mut self, schema: TableSchema) -> Result<(), InternalError> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(InternalError::new(
                ErrorClass::Conflict,
                ErrorOrigin::Store,
                format!("table '{name}' already exists"),
            ));
        }
        self.tables.insert(name, TableData::new(schema));
        Ok(())
    }

    pub fn put_table(&mut self, table: TableData) {
        self.tables
            .insert(table.schema().name().to_string(), table);
    }

    pub fn drop_table(&mut self, name: &str) -> Option<TableData> {
        // Dropping the carrier also drops its sidecar and ledger.
        self.sidecars.remove(name);
        self.conflicts.remove(name);
        self.tables.remove(name)
    }

    // --- violation sidecars

    #[must_use]
    pub const fn sidecars(&self) -> &BTreeMap<String, Sidecar> {
        &self.sidecars
    }

    #[must_use]
    pub fn sidecar(&self, table: &str) -> Option<&Sidecar> {
        self.sidecars.get(table)
    }

    /// Record one violation, creating the sidecar lazily on first use.
    ///
    /// Returns whether the sidecar grew (idempotent appends may not).
    pub fn record_violation(
        &mut self,
        schema: &TableSchema,
        row: ViolationRow,
    ) -> Result<bool, InternalError> {
        if self.table(schema.name()).is_none() {
            return Err(InternalError::not_found(
                ErrorOrigin::Violation,
                format!(
                    "cannot record violation for missing table '{}'",
                    schema.name()
                ),
            ));
        }

        let sidecar = self
            .sidecars
            .entry(schema.name().to_string())
            .or_insert_with(|| Sidecar::for_table(schema));

        Ok(sidecar.record(row))
    }

    /// User-driven sidecar truncation; prunes the entry when drained.
    pub fn delete_sidecar_rows(&mut self, table: &str) -> usize {
        let removed = self
            .sidecars
            .get_mut(table)
            .map_or(0, Sidecar::delete_all);
        self.prune_sidecar(table);
        removed
    }

    /// User-driven delete of one row's violations; prunes when drained.
    pub fn delete_sidecar_rows_for_key(
        &mut self,
        table: &str,
        key: &crate::store::TupleKey,
    ) -> usize {
        let removed = self
            .sidecars
            .get_mut(table)
            .map_or(0, |sidecar| sidecar.delete_for_key(key));
        self.prune_sidecar(table);
        removed
    }

    fn prune_sidecar(&mut self, table: &str) {
        if self.sidecars.get(table).is_some_and(Sidecar::is_empty) {
            self.sidecars.remove(table);
        }
    }

    /// Whether any sidecar currently holds a row (the commit-gate predicate).
    #[must_use]
    pub fn has_violations(&self) -> bool {
        self.sidecars.values().any(|sidecar| !sidecar.is_empty())
    }

    /// Tables with a non-empty sidecar, in name order.
    #[must_use]
    pub fn violation_tables(&self) -> Vec<String> {
        self.sidecars
            .iter()
            .filter(|(_, sidecar)| !sidecar.is_empty())
            .map(|(table, _)| table.clone())
            .collect()
    }

    /// The derived `braid_constraint_violations` summary: one row per
    /// user table with a non-empty sidecar. Never materialized.
    #[must_use]
    pub fn violation_summary(&self) -> Vec<SummaryRow> {
        self.sidecars
            .iter()
            .filter(|(_, sidecar)| !sidecar.is_empty())
            .map(|(table, sidecar)| SummaryRow {
                table: table.clone(),
                num_violations: sidecar.len() as u64,
            })
            .collect()
    }

    // --- conflict ledgers

    #[must_use]
    pub const fn conflicts(&self) -> &BTreeMap<String, ConflictLedger> {
        &self.conflicts
    }

    #[must_use]
    pub fn conflict_ledger(&self, table: &str) -> Option<&ConflictLedger> {
        self.conflicts.get(table)
    }

    pub fn conflict_ledger_mut(&mut self, table: &str) -> &mut ConflictLedger {
        self.conflicts.entry(table.to_string()).or_default()
    }

    /// User-driven conflict resolution; prunes the entry when drained.
    pub fn delete_conflicts(&mut self, table: &str) -> usize {
        let removed = self
            .conflicts
            .get_mut(table)
            .map_or(0, ConflictLedger::delete_all);
        if self
            .conflicts
            .get(table)
            .is_some_and(ConflictLedger::is_empty)
        {
            self.conflicts.remove(table);
        }
        removed
    }

    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.conflicts.values().any(|ledger| !ledger.is_empty())
    }

    /// Drop empty sidecar and ledger entries wholesale.
    pub fn prune_empty(&mut self) {
        self.sidecars.retain(|_, sidecar| !sidecar.is_empty());
        self.conflicts.retain(|_, ledger| !ledger.is_empty());
    }
}
