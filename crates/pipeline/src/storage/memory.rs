use super::{RecordStore, StorageError, StorageResult, TransitKeyStore};
use crate::record::AttestationRecord;
use nimbus_crypto::TransitKey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Record store held in process memory, in insertion order.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<(String, AttestationRecord)>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, owner: &str, record: &AttestationRecord) -> StorageResult<()> {
        let mut records = self.records.write();
        if records.iter().any(|(_, r)| r.record_id == record.record_id) {
            return Err(StorageError::DuplicateRecord(record.record_id));
        }
        records.push((owner.to_string(), record.clone()));
        debug!(record_id = %record.record_id, owner, total = records.len(), "Record stored in memory");
        Ok(())
    }

    fn get(&self, owner: &str, record_id: &Uuid) -> StorageResult<Option<AttestationRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|(o, r)| o == owner && r.record_id == *record_id)
            .map(|(_, r)| r.clone()))
    }

    fn list(&self, owner: &str) -> StorageResult<Vec<AttestationRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.records.read().len())
    }
}

/// Transit key store held in process memory. Keys are zeroized when dropped.
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: Mutex<HashMap<Uuid, TransitKey>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransitKeyStore for InMemoryKeyStore {
    fn put(&self, record_id: Uuid, key: &TransitKey) -> StorageResult<()> {
        let mut keys = self.keys.lock();
        if keys.contains_key(&record_id) {
            return Err(StorageError::DuplicateKey(record_id));
        }
        keys.insert(record_id, key.clone());
        Ok(())
    }

    fn get(&self, record_id: &Uuid) -> StorageResult<Option<TransitKey>> {
        Ok(self.keys.lock().get(record_id).cloned())
    }
}
