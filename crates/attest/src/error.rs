//! Attestation error types.

use thiserror::Error;

/// Errors raised while signing or verifying attestations.
#[derive(Debug, Error)]
pub enum AttestError {
    /// Slice arithmetic does not fit the verifiers' key sizes; usually a
    /// mixed-key-size deployment or a truncated signature blob.
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// Signature generation failed
    #[error("Signing failed for identity {identity}: {reason}")]
    Signing {
        /// Signer identity
        identity: String,
        /// Underlying failure
        reason: String,
    },

    /// A single signature did not verify
    #[error("Signature verification failed for identity {identity}: {reason}")]
    VerificationFailed {
        /// Signer identity
        identity: String,
        /// Underlying failure
        reason: String,
    },

    /// Key material could not be generated, parsed or encoded
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Parallel identity and key lists of different lengths
    #[error("Signer count mismatch: {identities} identities, {keys} public keys")]
    SignerCountMismatch {
        /// Number of identities supplied
        identities: usize,
        /// Number of public keys supplied
        keys: usize,
    },

    /// The same identity appears twice in one signer set
    #[error("Duplicate signer identity: {0}")]
    DuplicateIdentity(String),

    /// No signers or verifiers supplied
    #[error("Signer set is empty")]
    EmptySignerSet,
}

/// Result type for attestation operations.
pub type AttestResult<T> = Result<T, AttestError>;
