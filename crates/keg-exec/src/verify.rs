//! The checksum gate.

use sha2::{Digest, Sha256};

use crate::error::FailureReason;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compare the digest of `bytes` against `expected` (lowercase hex).
///
/// Returns the computed digest on success.
///
/// # Errors
///
/// Returns [`FailureReason::ChecksumMismatch`] carrying both digests.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<String, FailureReason> {
    let actual = sha256_hex(bytes);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(actual)
    } else {
        Err(FailureReason::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
