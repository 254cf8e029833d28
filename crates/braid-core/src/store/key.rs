use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    hash::RowHash,
    value::{Value, encode_canonical_all},
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// TupleKey
///
/// Primary-key tuple of one row. Orders lexicographically over its
/// component values, which gives tuple maps their primary-key iteration
/// order. NULL never appears in a key: keyed tables forbid it and
/// keyless tables use a surrogate hash component.
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TupleKey(Vec<Value>);

impl TupleKey {
    pub fn try_new(values: Vec<Value>) -> Result<Self, InternalError> {
        if values.is_empty() {
            return Err(InternalError::new(
                ErrorClass::InvariantViolation,
                ErrorOrigin::Store,
                "tuple key must have at least one component",
            ));
        }
        if values.iter().any(Value::is_null) {
            return Err(InternalError::new(
                ErrorClass::InvariantViolation,
                ErrorOrigin::Store,
                "tuple key components must be non-NULL",
            ));
        }

        Ok(Self(values))
    }

    /// Surrogate key for one keyless row: the row-hash as a single
    /// bytes component.
    #[must_use]
    pub fn surrogate(hash: RowHash) -> Self {
        Self(vec![Value::Bytes(hash.as_bytes().to_vec())])
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// Canonical byte form, used when hashing roots.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        encode_canonical_all(&self.0)
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (position, value) in self.0.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}
