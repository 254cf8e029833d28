use crate::{
    schema::{Column, ColumnType, IndexSchema, TableSchema},
    store::{IndexMap, Root, TableData, TupleKey, index_key_for_columns},
    value::Value,
};

fn keyed_schema() -> TableSchema {
    TableSchema::try_new(
        "t",
        vec![
            Column::new("pk", ColumnType::Uint, false),
            Column::new("v1", ColumnType::Int, true),
        ],
        vec!["pk".to_string()],
        vec![IndexSchema::new("v1", vec!["v1".to_string()], true)],
        vec![],
    )
    .unwrap()
}

fn keyless_schema() -> TableSchema {
    TableSchema::try_new(
        "bag",
        vec![
            Column::new("a", ColumnType::Int, true),
            Column::new("b", ColumnType::Text, true),
        ],
        vec![],
        vec![],
        vec![],
    )
    .unwrap()
}

#[test]
fn tuple_keys_order_rows_by_primary_key() {
    let mut table = TableData::new(keyed_schema());
    for pk in [30u64, 10, 20] {
        table
            .put(vec![Value::Uint(pk), Value::Int(0)])
            .unwrap();
    }

    let keys: Vec<u64> = table
        .rows()
        .keys()
        .map(|key| match key.values() {
            [Value::Uint(pk)] => *pk,
            other => panic!("unexpected key shape: {other:?}"),
        })
        .collect();
    assert_eq!(keys, vec![10, 20, 30]);
}

#[test]
fn tuple_key_rejects_null_components() {
    assert!(TupleKey::try_new(vec![Value::Null]).is_err());
    assert!(TupleKey::try_new(vec![]).is_err());
}

#[test]
fn keyed_put_is_an_upsert() {
    let mut table = TableData::new(keyed_schema());
    table.put(vec![Value::Uint(1), Value::Int(1)]).unwrap();
    table.put(vec![Value::Uint(1), Value::Int(2)]).unwrap();

    assert_eq!(table.len(), 1);
    let row = table.rows().values().next().unwrap();
    assert_eq!(row.value(1), Some(&Value::Int(2)));
}

#[test]
fn keyless_duplicates_fold_into_cardinality() {
    let mut table = TableData::new(keyless_schema());
    let tuple = vec![Value::Int(1), Value::Text("x".into())];
    let key_a = table.put(tuple.clone()).unwrap();
    let key_b = table.put(tuple).unwrap();

    assert_eq!(key_a, key_b);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(&key_a).unwrap().cardinality(), 2);

    // One remove peels one duplicate; the second drops the entry.
    table.remove(&key_a);
    assert_eq!(table.get(&key_a).unwrap().cardinality(), 1);
    table.remove(&key_a);
    assert!(table.get(&key_a).is_none());
}

#[test]
fn keyless_surrogates_are_value_sensitive() {
    let table = TableData::new(keyless_schema());
    let a = table
        .key_of(&[Value::Int(1), Value::Text("x".into())])
        .unwrap();
    let b = table
        .key_of(&[Value::Int(1), Value::Text("y".into())])
        .unwrap();
    let null_variant = table.key_of(&[Value::Int(1), Value::Null]).unwrap();
    assert_ne!(a, b);
    assert_ne!(a, null_variant);
}

#[test]
fn projection_fills_missing_columns_with_null() {
    let mut table = TableData::new(keyed_schema());
    table.put(vec![Value::Uint(1), Value::Int(5)]).unwrap();

    let wider = TableSchema::try_new(
        "t",
        vec![
            Column::new("pk", ColumnType::Uint, false),
            Column::new("v1", ColumnType::Int, true),
            Column::new("v2", ColumnType::Text, true),
        ],
        vec!["pk".to_string()],
        vec![],
        vec![],
    )
    .unwrap();

    let projected = table.project_to(&wider).unwrap();
    let row = projected.rows().values().next().unwrap();
    assert_eq!(row.values(), &[Value::Uint(1), Value::Int(5), Value::Null]);
}

#[test]
fn index_map_excludes_null_keys() {
    let mut table = TableData::new(keyed_schema());
    table.put(vec![Value::Uint(1), Value::Int(7)]).unwrap();
    table.put(vec![Value::Uint(2), Value::Null]).unwrap();
    table.put(vec![Value::Uint(3), Value::Int(7)]).unwrap();

    let index = IndexMap::build(&table, &["v1".to_string()]).unwrap();
    assert_eq!(index.rows_for(&[Value::Int(7)]).unwrap().len(), 2);
    assert_eq!(index.collisions().count(), 1);

    // The NULL row takes no entry at all.
    let schema = keyed_schema();
    assert!(
        index_key_for_columns(&schema, &[Value::Uint(2), Value::Null], &["v1".to_string()])
            .is_none()
    );
}

#[test]
fn root_ish_tracks_content() {
    let mut root = Root::new();
    root.create_table(keyed_schema()).unwrap();
    let before = root.root_ish().unwrap();

    root.try_table_mut("t")
        .unwrap()
        .put(vec![Value::Uint(1), Value::Int(1)])
        .unwrap();
    let after = root.root_ish().unwrap();

    assert_ne!(before, after);
    assert_eq!(root.root_ish().unwrap(), after);
}

#[test]
fn empty_sidecars_are_pruned_to_absence() {
    use crate::violation::{ViolationKind, ViolationRow, not_null_violation_info};

    let mut root = Root::new();
    root.create_table(keyed_schema()).unwrap();
    let key = TupleKey::try_new(vec![Value::Uint(1)]).unwrap();

    let schema = keyed_schema();
    root.record_violation(
        &schema,
        ViolationRow {
            from_root_ish: "r".into(),
            kind: ViolationKind::NotNull,
            key: key.clone(),
            row_values: vec![Value::Uint(1), Value::Null],
            info: not_null_violation_info(&["v1".to_string()]),
        },
    )
    .unwrap();

    assert!(root.has_violations());
    assert_eq!(root.violation_summary().len(), 1);

    root.delete_sidecar_rows_for_key("t", &key);
    assert!(!root.has_violations());
    assert!(root.sidecar("t").is_none());
}
