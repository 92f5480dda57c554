//! Nimbus attestation pipeline.
//!
//! Wires the consensus resolver, the record codec and the multi-signer
//! attestor into one run:
//!
//! ```text
//! samples ─► reconcile ─► seal (AES-GCM + SHA-256) ─► attest ─► self-verify ─► record
//! ```
//!
//! Around the pipeline sit the storage ports ([`RecordStore`] and
//! [`TransitKeyStore`], kept apart so ciphertext and keys never share a
//! store), the [`Authorizer`] seam, and [`AttestationService`], which exposes
//! the setup, attest-and-store, reconcile-only, historical and audit
//! operations.

pub mod access;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod service;
pub mod storage;

pub use access::{AccessError, Authorizer, InMemoryAuthorizer, Permission, Principal};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Pipeline;
pub use record::{AttestationRecord, SealedOutput};
pub use service::{generate_signers, AttestationService, ClientSetup, HistoricalReading, SignerDomain};
pub use storage::{
    InMemoryKeyStore, InMemoryRecordStore, RecordStore, StorageError, StorageResult,
    TransitKeyStore,
};
#[cfg(feature = "sqlite")]
pub use storage::{SqliteKeyStore, SqliteRecordStore};
