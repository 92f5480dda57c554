//! Storage ports for sealed records and their transit keys.
//!
//! Records and keys live in two separate stores keyed by the same record id.
//! Someone who can read only one of them learns nothing about the reading.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::{InMemoryKeyStore, InMemoryRecordStore};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteKeyStore, SqliteRecordStore};

use crate::record::AttestationRecord;
use nimbus_crypto::TransitKey;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Records are append-only; an id can be written once
    #[error("Record {0} already exists")]
    DuplicateRecord(Uuid),

    #[error("Transit key for record {0} already exists")]
    DuplicateKey(Uuid),

    #[error("Record {0} not found")]
    RecordNotFound(Uuid),

    #[error("No transit key stored for record {0}")]
    KeyNotFound(Uuid),

    /// A stored row could not be decoded back into its type
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only store of attestation records.
///
/// Every record belongs to the principal that stored it; reads are scoped
/// to that owner.
pub trait RecordStore: Send + Sync {
    /// Persist a new record for `owner`. Record ids are unique across all
    /// owners; an existing id is [`StorageError::DuplicateRecord`].
    fn insert(&self, owner: &str, record: &AttestationRecord) -> StorageResult<()>;

    /// The record with `record_id`, if `owner` stored it.
    fn get(&self, owner: &str, record_id: &Uuid) -> StorageResult<Option<AttestationRecord>>;

    /// Every record stored by `owner`, oldest first.
    fn list(&self, owner: &str) -> StorageResult<Vec<AttestationRecord>>;

    /// Records across all owners.
    fn count(&self) -> StorageResult<usize>;
}

/// Store of per-record transit keys.
pub trait TransitKeyStore: Send + Sync {
    /// Persist the key for `record_id`; each id takes exactly one key.
    fn put(&self, record_id: Uuid, key: &TransitKey) -> StorageResult<()>;

    fn get(&self, record_id: &Uuid) -> StorageResult<Option<TransitKey>>;
}
