use sha2::{Digest, Sha256};

///
/// FNV-1a 64-bit hash (compile-time safe).
///
/// Used only for **static, non-cryptographic identifiers** such as schema
/// fingerprints.
///
/// - Deterministic across compilers and platforms
/// - `const fn`-compatible, so fingerprints can be computed at compile time
/// - Not cryptographically secure; never used for root ids or row hashes
///
/// Reference: Fowler–Noll–Vo hash, FNV-1a variant (64-bit, prime = 0x100000001b3)
///
#[must_use]
#[allow(clippy::unreadable_literal)]
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    let mut i = 0;

    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }

    hash
}

/// Length in bytes of a keyless-row surrogate hash.
pub const ROW_HASH_LEN: usize = 16;

///
/// RowHash
///
/// Deterministic 16-byte surrogate key for keyless rows: a truncated
/// SHA-256 over the normalized tuple value (column-order stable,
/// NULL-sensitive). Surfaced to users as the `braid_row_hash` column.
///

#[derive(
    Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct RowHash([u8; ROW_HASH_LEN]);

impl RowHash {
    #[must_use]
    pub fn of(normalized: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"braid:rowhash:v1");
        hasher.update(normalized);
        let digest = hasher.finalize();

        let mut out = [0u8; ROW_HASH_LEN];
        out.copy_from_slice(&digest[..ROW_HASH_LEN]);
        Self(out)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ROW_HASH_LEN] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(ROW_HASH_LEN * 2);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

/// Hex SHA-256 digest of a domain-tagged byte payload.
///
/// Root ids and commit ids both route through here so every externally
/// visible identifier shares one derivation.
#[must_use]
pub fn digest_hex(domain: &'static str, payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update([0u8]);
    hasher.update(payload);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time hash should match the runtime calculation for stability across platforms.
    const HELLO_HASH: u64 = fnv1a_64(b"hello");

    #[test]
    fn fnv_produces_expected_reference_values() {
        assert_eq!(HELLO_HASH, 0xa430d84680aabd0b);
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn row_hash_is_stable_and_input_sensitive() {
        let a = RowHash::of(b"1|alice");
        let b = RowHash::of(b"1|alice");
        let c = RowHash::of(b"1|alicf");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_hex().len(), ROW_HASH_LEN * 2);
    }

    #[test]
    fn digest_hex_separates_domains() {
        assert_ne!(digest_hex("root", b"x"), digest_hex("commit", b"x"));
        assert_eq!(digest_hex("root", b"x").len(), 64);
    }
}
