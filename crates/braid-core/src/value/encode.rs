//! Canonical value normalization.
//!
//! Injective byte form for hashing: row hashes, root ids, and schema
//! fingerprints all consume it. Not an ordering surface; tuple and index
//! maps order on `Value`'s semantic `Ord`.

use crate::value::Value;

const NEGATIVE_MARKER: u8 = 0x00;
const POSITIVE_MARKER: u8 = 0x01;

/// Append the canonical byte form of one value.
///
/// Every variant is length-delimited or fixed-width, so concatenated
/// components never collide across tuple boundaries. NULL participates
/// (with its own tag) because row hashes are NULL-sensitive.
pub fn encode_canonical(value: &Value, out: &mut Vec<u8>) {
    out.push(value.tag().rank());

    match value {
        Value::Null => {}
        Value::Bool(v) => out.push(u8::from(*v)),
        Value::Int(v) => {
            if *v < 0 {
                out.push(NEGATIVE_MARKER);
                // Shift into u64 space so the magnitude bytes stay unsigned.
                #[allow(clippy::cast_sign_loss)]
                out.extend_from_slice(&(v.wrapping_sub(i64::MIN) as u64).to_be_bytes());
            } else {
                out.push(POSITIVE_MARKER);
                #[allow(clippy::cast_sign_loss)]
                out.extend_from_slice(&(*v as u64).to_be_bytes());
            }
        }
        Value::Uint(v) => {
            out.push(POSITIVE_MARKER);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Text(v) => {
            out.extend_from_slice(&encode_len(v.len()));
            out.extend_from_slice(v.as_bytes());
        }
        Value::Bytes(v) => {
            out.extend_from_slice(&encode_len(v.len()));
            out.extend_from_slice(v);
        }
    }
}

fn encode_len(len: usize) -> [u8; 8] {
    u64::try_from(len).unwrap_or(u64::MAX).to_be_bytes()
}

/// Canonical byte form of a value sequence.
#[must_use]
pub fn encode_canonical_all(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        encode_canonical(value, &mut out);
    }
    out
}
