use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("deserialize error: {0}")]
    Deserialize(String),
}

impl SerializeError {
    pub(crate) const fn class() -> ErrorClass {
        ErrorClass::Internal
    }
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        Self::new(
            SerializeError::class(),
            ErrorOrigin::Serialize,
            err.to_string(),
        )
    }
}

/// Serialize a value into canonical CBOR bytes.
///
/// All persisted state (roots, repository files) and every hashed payload
/// (root ids, commit ids, row hashes) routes through this one codec so
/// identifiers stay stable across releases.
pub fn serialize<T>(ty: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    serde_cbor::to_vec(ty).map_err(|err| SerializeError::Serialize(err.to_string()))
}

/// Deserialize a value produced by [`serialize`].
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    serde_cbor::from_slice(bytes).map_err(|err| SerializeError::Deserialize(err.to_string()))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_composite_values() {
        let input = vec![(1u64, "one".to_string()), (2, "two".to_string())];
        let bytes = serialize(&input).unwrap();
        let output: Vec<(u64, String)> = deserialize(&bytes).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn rejects_truncated_bytes() {
        let bytes = serialize(&"braid".to_string()).unwrap();
        let err = deserialize::<String>(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, SerializeError::Deserialize(_)));
    }
}
