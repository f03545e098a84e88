//! SHA-256 derived identifiers.

use sha2::{Digest, Sha256};

/// Schema fingerprint: the first eight bytes of the SHA-256 of `canonical`.
#[must_use]
pub fn schema_fingerprint(canonical: &str) -> [u8; 8] {
    let digest = Sha256::digest(canonical.as_bytes());
    let mut fingerprint = [0u8; 8];
    fingerprint.copy_from_slice(&digest[..8]);
    fingerprint
}

/// Hex SHA-256 of encoded envelope bytes.
///
/// Encoding is deterministic, so retries of the same event produce the same
/// key and downstream consumers can drop duplicates on it.
#[must_use]
pub fn dedup_key(envelope_bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(envelope_bytes))
}
