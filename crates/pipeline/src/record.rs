//! Persisted record types.

use chrono::{DateTime, Utc};
use nimbus_attest::AggregateAttestation;
use nimbus_consensus::Reconciliation;
use nimbus_crypto::{SealedRecord, TransitKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only unit written to the record store.
///
/// Wire form:
///
/// ```json
/// {
///   "recordId": "…",
///   "ciphertext": "<base64>",
///   "integrityHash": "<hex sha-256>",
///   "identities": ["…"],
///   "aggregateSignature": "<hex>",
///   "timestamp": "2024-08-23T12:00:00Z"
/// }
/// ```
///
/// The transit key is never part of a record; it lives in its own store
/// under the same `record_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    pub record_id: Uuid,
    #[serde(flatten)]
    pub sealed: SealedRecord,
    #[serde(flatten)]
    pub attestation: AggregateAttestation,
    /// When the record was produced
    pub timestamp: DateTime<Utc>,
}

impl AttestationRecord {
    pub fn new(sealed: SealedRecord, attestation: AggregateAttestation) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            sealed,
            attestation,
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Everything a successful run hands back to the caller.
///
/// `record` and `transit_key` must be persisted in separate stores.
#[derive(Debug)]
pub struct SealedOutput {
    pub record: AttestationRecord,
    pub transit_key: TransitKey,
    pub reconciliation: Reconciliation,
}

impl SealedOutput {
    pub fn record_id(&self) -> Uuid {
        self.record.record_id
    }
}
