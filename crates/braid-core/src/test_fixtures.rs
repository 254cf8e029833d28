//! Shared fixtures for engine tests: small schemas, value shorthands,
//! and repository builders.

use crate::{
    repo::Repository,
    schema::{
        Column, ColumnType, ForeignKey, IndexSchema, PRIMARY_INDEX, ReferentialAction, TableSchema,
    },
    store::TupleKey,
    value::Value,
};

pub(crate) fn uint(value: u64) -> Value {
    Value::Uint(value)
}

pub(crate) fn int(value: i64) -> Value {
    Value::Int(value)
}

pub(crate) fn key(value: u64) -> TupleKey {
    TupleKey::try_new(vec![uint(value)]).unwrap()
}

/// `name(pk uint PK, v1 int NULL)` with a secondary index on `v1`.
pub(crate) fn pk_v1_schema(name: &str, unique_v1: bool) -> TableSchema {
    TableSchema::try_new(
        name,
        vec![
            Column::new("pk", ColumnType::Uint, false),
            Column::new("v1", ColumnType::Int, true),
        ],
        vec!["pk".to_string()],
        vec![IndexSchema::new("v1", vec!["v1".to_string()], unique_v1)],
        vec![],
    )
    .unwrap()
}

/// Same shape as [`pk_v1_schema`] plus `FK v1 -> <parent>.v1`.
pub(crate) fn child_schema(
    name: &str,
    parent: &str,
    on_delete: ReferentialAction,
    on_update: ReferentialAction,
) -> TableSchema {
    TableSchema::try_new(
        name,
        vec![
            Column::new("pk", ColumnType::Uint, false),
            Column::new("v1", ColumnType::Int, true),
        ],
        vec!["pk".to_string()],
        vec![IndexSchema::new("v1", vec!["v1".to_string()], false)],
        vec![ForeignKey::new(
            format!("fk_{name}_{parent}"),
            name,
            vec!["v1".to_string()],
            "v1",
            parent,
            vec!["v1".to_string()],
            "v1",
            on_delete,
            on_update,
        )],
    )
    .unwrap()
}

/// `name(pk uint PK, v1 int NULL, FK v1 -> name.pk)` self-reference.
pub(crate) fn self_ref_schema(name: &str) -> TableSchema {
    TableSchema::try_new(
        name,
        vec![
            Column::new("pk", ColumnType::Uint, false),
            Column::new("v1", ColumnType::Uint, true),
        ],
        vec!["pk".to_string()],
        vec![IndexSchema::new("v1", vec!["v1".to_string()], false)],
        vec![ForeignKey::new(
            format!("fk_{name}_{name}"),
            name,
            vec!["v1".to_string()],
            "v1",
            name,
            vec!["pk".to_string()],
            PRIMARY_INDEX,
            ReferentialAction::Cascade,
            ReferentialAction::Cascade,
        )],
    )
    .unwrap()
}

/// Repository with the given tables created and committed as the
/// ancestor, `foreign_key_checks` off so sides can author freely.
pub(crate) fn repo_with_tables(tables: Vec<TableSchema>) -> Repository {
    let mut repo = Repository::init().unwrap();
    repo.session_mut().foreign_key_checks = false;
    for schema in tables {
        repo.create_table(schema).unwrap();
    }
    repo.commit("create tables", false).unwrap();
    repo
}

/// Fill `table` with `(pk, v1)` pairs where NULL is modeled as `None`.
pub(crate) fn put_pairs(repo: &mut Repository, table: &str, pairs: &[(u64, Option<i64>)]) {
    for (pk, v1) in pairs {
        let v1_value = v1.map_or(Value::Null, Value::Int);
        repo.put_row(table, vec![uint(*pk), v1_value]).unwrap();
    }
}
