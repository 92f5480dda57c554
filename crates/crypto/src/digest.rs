//! SHA-256 tamper-evidence hashing over stored ciphertext blobs.
//!
//! The digest is not a secret, so the comparison does not need to be
//! constant-time; it is anyway.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Recompute the digest of `data` and compare it with `expected_hex`.
///
/// Comparison ignores ASCII case of the expected digest.
pub fn verify_sha256_hex(data: &[u8], expected_hex: &str) -> bool {
    let computed = sha256_hex(data);
    let expected = expected_hex.trim().to_ascii_lowercase();
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}
