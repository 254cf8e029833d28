use crate::{
    schema::{Column, ColumnType, ForeignKey, IndexSchema, ReferentialAction},
    test_fixtures::{int, key, pk_v1_schema, uint},
    value::Value,
    violation::{
        ROW_HASH_COLUMN, SIDECAR_PREFIX, SUMMARY_TABLE, Sidecar, ViolationKind, ViolationRow,
        fk_violation_info, unique_violation_info,
    },
};

fn sample_row(pk: u64, from: &str) -> ViolationRow {
    ViolationRow {
        from_root_ish: from.to_string(),
        kind: ViolationKind::ForeignKey,
        key: key(pk),
        row_values: vec![uint(pk), int(7)],
        info: fk_violation_info(&sample_fk()),
    }
}

fn sample_fk() -> ForeignKey {
    ForeignKey::new(
        "fk_child_parent",
        "child",
        vec!["v1".to_string()],
        "v1",
        "parent",
        vec!["v1".to_string()],
        "v1",
        ReferentialAction::SetNull,
        ReferentialAction::Restrict,
    )
}

#[test]
fn relation_names_carry_the_prefix() {
    let sidecar = Sidecar::for_table(&pk_v1_schema("orders", false));
    assert_eq!(sidecar.relation_name(), "braid_constraint_violations_orders");
    assert_eq!(SIDECAR_PREFIX, "braid_constraint_violations_");
    assert_eq!(SUMMARY_TABLE, "braid_constraint_violations");
    assert_eq!(ROW_HASH_COLUMN, "braid_row_hash");
}

#[test]
fn relation_layout_puts_fixed_columns_around_the_user_columns() {
    let sidecar = Sidecar::for_table(&pk_v1_schema("orders", false));
    assert_eq!(
        sidecar.relation_columns(),
        vec![
            "from_root_ish".to_string(),
            "violation_type".to_string(),
            "pk".to_string(),
            "v1".to_string(),
            "violation_info".to_string(),
        ]
    );

    let keyless = crate::schema::TableSchema::try_new(
        "bag",
        vec![Column::new("a", ColumnType::Int, true)],
        vec![],
        vec![],
        vec![],
    )
    .unwrap();
    let sidecar = Sidecar::for_table(&keyless);
    assert_eq!(
        sidecar.relation_columns(),
        vec![
            "from_root_ish".to_string(),
            "violation_type".to_string(),
            "a".to_string(),
            "violation_info".to_string(),
            "braid_row_hash".to_string(),
        ]
    );
}

#[test]
fn appends_are_idempotent_per_kind_key_and_info() {
    let mut sidecar = Sidecar::for_table(&pk_v1_schema("child", false));

    assert!(sidecar.record(sample_row(1, "root-a")));
    // Same kind, key, and info: dropped even when the root id differs.
    assert!(!sidecar.record(sample_row(1, "root-b")));
    assert_eq!(sidecar.len(), 1);
    // The first emission's attribution wins.
    assert_eq!(sidecar.rows()[0].from_root_ish, "root-a");

    // A different kind for the same key is a distinct violation.
    let mut unique = sample_row(1, "root-a");
    unique.kind = ViolationKind::UniqueIndex;
    unique.info = unique_violation_info(&IndexSchema::new("v1", vec!["v1".to_string()], true));
    assert!(sidecar.record(unique));
    assert_eq!(sidecar.len(), 2);
}

#[test]
fn deletes_are_scoped_to_one_key_or_everything() {
    let mut sidecar = Sidecar::for_table(&pk_v1_schema("child", false));
    sidecar.record(sample_row(1, "r"));
    sidecar.record(sample_row(2, "r"));

    assert_eq!(sidecar.delete_for_key(&key(1)), 1);
    assert_eq!(sidecar.len(), 1);
    assert_eq!(sidecar.delete_all(), 1);
    assert!(sidecar.is_empty());
}

#[test]
fn recorded_columns_survive_user_table_schema_changes() {
    // The sidecar schema freezes at creation; a later column drop on
    // the user table leaves recorded evidence intact.
    let sidecar = Sidecar::for_table(&pk_v1_schema("child", false));
    let recorded: Vec<&str> = sidecar
        .columns()
        .iter()
        .map(|column| column.name.as_str())
        .collect();
    assert_eq!(recorded, vec!["pk", "v1"]);

    let mut populated = sidecar;
    populated.record(sample_row(1, "r"));
    // The recorded row still carries both columns regardless of what
    // happens to the live schema afterwards.
    assert_eq!(populated.rows()[0].row_values.len(), 2);
}

#[test]
fn violation_kind_labels_match_the_wire_enum() {
    assert_eq!(ViolationKind::ForeignKey.to_string(), "foreign key");
    assert_eq!(ViolationKind::UniqueIndex.to_string(), "unique index");
    assert_eq!(ViolationKind::CheckConstraint.to_string(), "check constraint");
    assert_eq!(ViolationKind::NotNull.to_string(), "not null");
}

#[test]
fn fk_info_keys_are_alphabetical_and_frozen() {
    let info = fk_violation_info(&sample_fk());
    assert_eq!(
        serde_json::to_string(&info).unwrap(),
        r#"{"Columns":["v1"],"ForeignKey":"fk_child_parent","Index":"v1","OnDelete":"SET NULL","OnUpdate":"RESTRICT","ReferencedColumns":["v1"],"ReferencedIndex":"v1","ReferencedTable":"parent","Table":"child"}"#
    );
}

#[test]
fn unique_info_keys_are_alphabetical() {
    let info = unique_violation_info(&IndexSchema::new(
        "uniq_email",
        vec!["email".to_string(), "tenant".to_string()],
        true,
    ));
    assert_eq!(
        serde_json::to_string(&info).unwrap(),
        r#"{"Columns":["email","tenant"],"Name":"uniq_email"}"#
    );
}

#[test]
fn keyless_sidecars_mark_the_surrogate() {
    let keyless = crate::schema::TableSchema::try_new(
        "bag",
        vec![Column::new("a", ColumnType::Int, true)],
        vec![],
        vec![],
        vec![],
    )
    .unwrap();
    let sidecar = Sidecar::for_table(&keyless);
    assert!(sidecar.is_keyless());

    let hash = crate::hash::RowHash::of(b"tuple");
    let surrogate = crate::store::TupleKey::surrogate(hash);
    match surrogate.values() {
        [Value::Bytes(bytes)] => assert_eq!(bytes.len(), crate::hash::ROW_HASH_LEN),
        other => panic!("unexpected surrogate: {other:?}"),
    }
}
