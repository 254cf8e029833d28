use crate::value::{Value, encode_canonical_all};
use proptest::prelude::*;
use std::cmp::Ordering;

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        "[a-zA-Z0-9_]{0,8}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

#[test]
fn null_sorts_before_every_other_family() {
    for value in [
        Value::Bool(false),
        Value::Int(i64::MIN),
        Value::Uint(0),
        Value::Text(String::new()),
        Value::Bytes(vec![]),
    ] {
        assert_eq!(Value::Null.cmp(&value), Ordering::Less);
    }
}

#[test]
fn numeric_family_compares_across_signedness() {
    assert_eq!(Value::Int(-1).cmp(&Value::Uint(0)), Ordering::Less);
    assert_eq!(Value::Uint(u64::MAX).cmp(&Value::Int(i64::MAX)), Ordering::Greater);
    assert_eq!(Value::Int(7).cmp(&Value::Int(7)), Ordering::Equal);
    // Equal magnitudes across variants stay non-equal but strictly ordered.
    assert_eq!(Value::Int(7).cmp(&Value::Uint(7)), Ordering::Less);
    assert_eq!(Value::Uint(7).cmp(&Value::Int(7)), Ordering::Greater);
}

#[test]
fn canonical_encoding_is_null_sensitive() {
    let with_null = encode_canonical_all(&[Value::Int(1), Value::Null]);
    let without = encode_canonical_all(&[Value::Int(1)]);
    assert_ne!(with_null, without);
}

#[test]
fn canonical_encoding_respects_tuple_boundaries() {
    let ab = encode_canonical_all(&[Value::Text("ab".into()), Value::Text("c".into())]);
    let a_bc = encode_canonical_all(&[Value::Text("a".into()), Value::Text("bc".into())]);
    assert_ne!(ab, a_bc);
}

proptest! {
    #[test]
    fn ordering_is_antisymmetric(a in arb_value(), b in arb_value()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn ordering_is_consistent_with_equality(a in arb_value(), b in arb_value()) {
        prop_assert_eq!(a == b, a.cmp(&b) == Ordering::Equal);
    }

    #[test]
    fn equal_values_encode_identically(a in arb_value()) {
        let b = a.clone();
        prop_assert_eq!(
            encode_canonical_all(std::slice::from_ref(&a)),
            encode_canonical_all(std::slice::from_ref(&b))
        );
    }
}
