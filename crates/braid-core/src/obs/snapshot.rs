//! Storage snapshots.
//!
//! Point-in-time per-table footprint of one root: row counts plus the
//! sidecar and ledger populations riding with each table. Derived on
//! read, never cached.

use crate::store::Root;
use serde::{Deserialize, Serialize};

///
/// TableReport
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub rows: u64,
    pub violations: u64,
    pub conflicts: u64,
}

///
/// StorageReport
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StorageReport {
    pub tables: Vec<TableReport>,
    pub total_rows: u64,
    pub total_violations: u64,
    pub total_conflicts: u64,
}

/// Snapshot one root's storage footprint, tables in name order.
#[must_use]
pub fn storage_report(root: &Root) -> StorageReport {
    let mut report = StorageReport::default();

    for (name, table) in root.tables() {
        let rows = table.len() as u64;
        let violations = root.sidecar(name).map_or(0, |sidecar| sidecar.len() as u64);
        let conflicts = root
            .conflict_ledger(name)
            .map_or(0, |ledger| ledger.len() as u64);

        report.total_rows = report.total_rows.saturating_add(rows);
        report.total_violations = report.total_violations.saturating_add(violations);
        report.total_conflicts = report.total_conflicts.saturating_add(conflicts);
        report.tables.push(TableReport {
            table: name.clone(),
            rows,
            violations,
            conflicts,
        });
    }

    report
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_fixtures::{key, pk_v1_schema, uint},
        value::Value,
        violation::{ViolationKind, ViolationRow, not_null_violation_info},
    };

    #[test]
    fn reports_rows_and_sidecar_populations_per_table() {
        let mut root = Root::new();
        let schema = pk_v1_schema("t", false);
        root.create_table(schema.clone()).unwrap();
        root.try_table_mut("t")
            .unwrap()
            .put(vec![uint(1), Value::Null])
            .unwrap();
        root.record_violation(
            &schema,
            ViolationRow {
                from_root_ish: "r".into(),
                kind: ViolationKind::NotNull,
                key: key(1),
                row_values: vec![uint(1), Value::Null],
                info: not_null_violation_info(&["v1".to_string()]),
            },
        )
        .unwrap();

        let report = storage_report(&root);
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].rows, 1);
        assert_eq!(report.tables[0].violations, 1);
        assert_eq!(report.total_violations, 1);
        assert_eq!(report.total_conflicts, 0);
    }
}
