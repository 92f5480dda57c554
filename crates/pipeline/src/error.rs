//! Pipeline error type.

use crate::access::AccessError;
use crate::storage::StorageError;
use nimbus_attest::AttestError;
use nimbus_consensus::ConsensusError;
use nimbus_crypto::CodecError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by a pipeline run or by the service built on it.
///
/// A run that fails at any stage returns no partial output.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Consensus failed: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Record codec failed: {0}")]
    Codec(#[from] CodecError),

    #[error("Attestation failed: {0}")]
    Attest(#[from] AttestError),

    /// The freshly produced attestation did not verify against its own signer set
    #[error("Self-verification of attestation failed: {0}")]
    SelfCheckFailed(String),

    /// A stored record's attestation did not verify
    #[error("Attestation rejected for record {0}")]
    AttestationRejected(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Access denied: {0}")]
    Access(#[from] AccessError),

    #[error("Configuration error: {0}")]
    Config(#[from] nimbus_core::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
