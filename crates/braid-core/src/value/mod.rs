mod encode;
mod rank;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

pub use encode::{encode_canonical, encode_canonical_all};
pub(crate) use rank::ValueTag;

///
/// Value
///
/// Typed scalar cell of a relation.
///
/// Null → the cell holds SQL NULL; excluded from index keys and from
///        uniqueness and foreign-key comparisons.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub(crate) const fn tag(&self) -> ValueTag {
        match self {
            Self::Null => ValueTag::Null,
            Self::Bool(_) => ValueTag::Bool,
            Self::Int(_) | Self::Uint(_) => ValueTag::Numeric,
            Self::Text(_) => ValueTag::Text,
            Self::Bytes(_) => ValueTag::Bytes,
        }
    }

    // Numeric comparison across the signed/unsigned split, with a stable
    // variant tie-break so the total order stays consistent with Eq.
    fn cmp_numeric(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Int(a), Self::Uint(b)) => {
                if *a < 0 {
                    Ordering::Less
                } else {
                    #[allow(clippy::cast_sign_loss)]
                    let magnitude = *a as u64;
                    magnitude.cmp(b).then(Ordering::Less)
                }
            }
            (Self::Uint(a), Self::Int(b)) => {
                if *b < 0 {
                    Ordering::Greater
                } else {
                    #[allow(clippy::cast_sign_loss)]
                    let magnitude = *b as u64;
                    a.cmp(&magnitude).then(Ordering::Greater)
                }
            }
            _ => unreachable!("cmp_numeric called on non-numeric values"),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_tag = self.tag().rank().cmp(&other.tag().rank());
        if by_tag != Ordering::Equal {
            return by_tag;
        }

        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            _ => self.cmp_numeric(other),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Bytes(v) => {
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
