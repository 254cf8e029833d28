use crate::value::{Value, encode_canonical_all};
use serde::{Deserialize, Serialize};

///
/// Row
///
/// One stored tuple in schema column order. `cardinality` is 1 for keyed
/// tables; keyless tables fold duplicate tuples into one entry whose
/// cardinality counts them.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Row {
    values: Vec<Value>,
    cardinality: u64,
}

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            cardinality: 1,
        }
    }

    #[must_use]
    pub const fn with_cardinality(values: Vec<Value>, cardinality: u64) -> Self {
        Self {
            values,
            cardinality,
        }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub const fn cardinality(&self) -> u64 {
        self.cardinality
    }

    #[must_use]
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Normalized byte form of the tuple value; the keyless surrogate
    /// hash is computed over exactly these bytes (cardinality excluded,
    /// so the surrogate is stable while the count moves).
    #[must_use]
    pub fn normalized_bytes(&self) -> Vec<u8> {
        encode_canonical_all(&self.values)
    }
}
