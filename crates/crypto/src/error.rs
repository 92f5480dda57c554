//! Codec error types.

use thiserror::Error;

/// Errors raised while sealing or opening a record.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Integrity hash or authentication tag mismatch. Always fatal to the
    /// decrypt attempt.
    #[error("Tampered data: {0}")]
    TamperedData(String),

    /// Plaintext could not be serialized or a decrypted payload could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The cipher refused to encrypt
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Transit key has the wrong length or encoding
    #[error("Invalid transit key: {0}")]
    InvalidKey(String),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
