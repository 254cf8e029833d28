use crate::{
    commit::{ConstraintStatus, TableChange, check_commit, status},
    session::SessionConfig,
    store::Root,
    test_fixtures::{key, pk_v1_schema, uint},
    value::Value,
    violation::{ViolationKind, ViolationRow, not_null_violation_info},
};
use proptest::prelude::*;

fn root_with_violation() -> Root {
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
            from_root_ish: "abc".into(),
            kind: ViolationKind::NotNull,
            key: key(1),
            row_values: vec![uint(1), Value::Null],
            info: not_null_violation_info(&["v1".to_string()]),
        },
    )
    .unwrap();
    root
}

#[test]
fn gate_blocks_commits_while_a_sidecar_has_rows() {
    let root = root_with_violation();
    let session = SessionConfig::default();

    let err = check_commit(&root, &session, false).unwrap_err();
    assert!(err.is_constraint_violation());
    assert!(err.message.contains("t"));
}

#[test]
fn force_alone_does_not_bypass_the_gate() {
    let root = root_with_violation();
    let session = SessionConfig::default();
    assert!(check_commit(&root, &session, true).is_err());
}

#[test]
fn force_with_session_setting_bypasses_and_preserves_the_sidecar() {
    let root = root_with_violation();
    let mut session = SessionConfig::default();
    session.force_transaction_commit = true;

    check_commit(&root, &session, true).unwrap();
    // The bypass never drains the sidecar.
    assert!(root.has_violations());

    // The setting without --force is not enough either.
    assert!(check_commit(&root, &session, false).is_err());
}

#[test]
fn drained_sidecar_reports_violations_fixed() {
    let mut root = root_with_violation();
    let head = Root::new();

    let armed = status(&head, &root, &["t".to_string()]);
    assert_eq!(armed.notes.len(), 1);
    assert_eq!(armed.notes[0].status, ConstraintStatus::FixConstraintViolations);
    assert_eq!(armed.notes[0].status.to_string(), "fix constraint violations");

    root.delete_sidecar_rows("t");
    let fixed = status(&head, &root, &["t".to_string()]);
    assert_eq!(fixed.notes.len(), 1);
    assert_eq!(fixed.notes[0].status, ConstraintStatus::ConstraintViolationsFixed);
    assert_eq!(fixed.notes[0].status.to_string(), "constraint violations fixed");

    // Draining the sidecar did not repair the user data.
    assert!(root.table("t").unwrap().len() == 1);
}

#[test]
fn status_classifies_table_changes() {
    let mut head = Root::new();
    head.create_table(pk_v1_schema("kept", false)).unwrap();
    head.create_table(pk_v1_schema("dropped", false)).unwrap();

    let mut working = head.clone();
    working.drop_table("dropped");
    working.create_table(pk_v1_schema("added", false)).unwrap();
    working
        .try_table_mut("kept")
        .unwrap()
        .put(vec![uint(1), Value::Null])
        .unwrap();

    let report = status(&head, &working, &[]);
    assert!(report.table_changes.contains(&TableChange::Added("added".to_string())));
    assert!(report.table_changes.contains(&TableChange::Dropped("dropped".to_string())));
    assert!(report.table_changes.contains(&TableChange::Modified("kept".to_string())));
    assert!(!report.is_clean());
}

proptest! {
    // Gate correctness: a commit passes the violation gate without
    // bypass iff every sidecar is empty; the bypass needs both the flag
    // and the session setting.
    #[test]
    fn gate_decision_matches_the_predicate(
        violated in any::<bool>(),
        force in any::<bool>(),
        setting in any::<bool>(),
    ) {
        let root = if violated {
            root_with_violation()
        } else {
            Root::new()
        };
        let session = SessionConfig {
            force_transaction_commit: setting,
            ..SessionConfig::default()
        };

        let allowed = check_commit(&root, &session, force).is_ok();
        prop_assert_eq!(allowed, !violated || (force && setting));
    }
}
