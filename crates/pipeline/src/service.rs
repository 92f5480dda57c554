//! Attestation service.
//!
//! Ties the pipeline, the two stores and the authorizer together behind the
//! caller-facing operations: client setup, attest-and-store, reconcile-only,
//! historical readback and audit. Stored records belong to the caller that
//! stored them and are only read back by that caller.

use crate::access::{Authorizer, Permission, Principal};
use crate::error::PipelineResult;
use crate::orchestrator::Pipeline;
use crate::record::AttestationRecord;
use crate::storage::{RecordStore, StorageError, TransitKeyStore};
use chrono::{DateTime, Utc};
use nimbus_attest::{AttestResult, Attestor, ConcatAttestor, SignerIdentity, SignerSet, Verifier, VerifierSet};
use nimbus_consensus::{ConsensusPolicy, MarginPolicy, Reconciliation};
use nimbus_core::{AttestationConfig, Config, ProviderSample, ReconciledReading};
use nimbus_crypto::{AesGcmCodec, RecordCodec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// One decrypted entry of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReading {
    pub record_id: Uuid,
    /// When the record was attested
    pub attested_at: DateTime<Utc>,
    pub reading: ReconciledReading,
}

/// Public half of one signer domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerDomain {
    pub domain: String,
    /// SPKI PEM
    pub public_key_pem: String,
    pub fingerprint: String,
}

/// What a newly registered client receives: its principal (with the API
/// key) and the signer domains its records will be attested by.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSetup {
    pub principal: Principal,
    /// In signing order
    pub domains: Vec<SignerDomain>,
}

impl ClientSetup {
    pub fn api_key(&self) -> &str {
        &self.principal.api_key
    }

    /// Rebuild the verifier set from the handed-out public keys.
    pub fn verifiers(&self) -> AttestResult<VerifierSet> {
        let verifiers = self
            .domains
            .iter()
            .map(|d| Verifier::from_pem(d.domain.as_str(), &d.public_key_pem))
            .collect::<AttestResult<Vec<_>>>()?;
        VerifierSet::new(verifiers)
    }
}

/// Generate one signer per identity at the configured modulus size.
pub fn generate_signers(identities: &[&str], config: &AttestationConfig) -> PipelineResult<SignerSet> {
    let signers = identities
        .iter()
        .map(|identity| SignerIdentity::generate_with_bits(*identity, config.rsa_key_bits))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SignerSet::new(signers)?)
}

pub struct AttestationService<C, A, P = MarginPolicy> {
    pipeline: Pipeline<C, A, P>,
    signers: SignerSet,
    records: Arc<dyn RecordStore>,
    keys: Arc<dyn TransitKeyStore>,
    authorizer: Arc<dyn Authorizer>,
}

#[cfg(feature = "sqlite")]
impl AttestationService<AesGcmCodec, ConcatAttestor> {
    /// Standard pipeline over the SQLite record and key databases named in
    /// `config`.
    pub fn from_config(
        config: &Config,
        signers: SignerSet,
        authorizer: Arc<dyn Authorizer>,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let records = crate::storage::SqliteRecordStore::open(&config.storage.record_db_path)?;
        let keys = crate::storage::SqliteKeyStore::open(&config.storage.key_db_path)?;
        Ok(Self::new(
            Pipeline::standard(&config.consensus)?,
            signers,
            Arc::new(records),
            Arc::new(keys),
            authorizer,
        ))
    }
}

impl<C: RecordCodec, A: Attestor, P: ConsensusPolicy> AttestationService<C, A, P> {
    pub fn new(
        pipeline: Pipeline<C, A, P>,
        signers: SignerSet,
        records: Arc<dyn RecordStore>,
        keys: Arc<dyn TransitKeyStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        info!(signers = signers.len(), identities = ?signers.identities(), "Attestation service ready");
        Self {
            pipeline,
            signers,
            records,
            keys,
            authorizer,
        }
    }

    pub fn pipeline(&self) -> &Pipeline<C, A, P> {
        &self.pipeline
    }

    /// Public half of the signer set, for downstream verification.
    pub fn verifiers(&self) -> VerifierSet {
        self.signers.verifiers()
    }

    /// Register a new client. Requires [`Permission::Setup`].
    ///
    /// Returns the client's freshly issued API key together with every
    /// signer domain and its public key.
    pub fn setup_client(
        &self,
        admin_key: &str,
        name: &str,
        permissions: &[Permission],
    ) -> PipelineResult<ClientSetup> {
        let admin = self.authorizer.authorize(admin_key, Permission::Setup)?;

        let domains = self
            .signers
            .iter()
            .map(|signer| {
                Ok(SignerDomain {
                    domain: signer.identity().to_string(),
                    public_key_pem: signer.public_key_pem()?,
                    fingerprint: signer.fingerprint().to_string(),
                })
            })
            .collect::<AttestResult<Vec<_>>>()?;

        let principal = Principal::new(name, permissions.iter().copied());
        self.authorizer.register(principal.clone())?;
        info!(admin = %admin.name, client = %principal.name, domains = domains.len(), "Client set up");
        Ok(ClientSetup { principal, domains })
    }

    /// Reconcile, seal and attest `samples`, then persist the record and its
    /// transit key in their separate stores. Requires [`Permission::FetchStore`].
    pub fn attest_and_store(
        &self,
        api_key: &str,
        samples: &[ProviderSample],
    ) -> PipelineResult<AttestationRecord> {
        let caller = self.authorizer.authorize(api_key, Permission::FetchStore)?;

        let output = self.pipeline.run(samples, &self.signers)?;
        let record_id = output.record_id();

        // Key before record, so every stored record has a key.
        self.keys.put(record_id, &output.transit_key)?;
        self.records.insert(&caller.name, &output.record)?;

        info!(caller = %caller.name, record_id = %record_id, "Record attested and stored");
        Ok(output.record)
    }

    /// Reconcile `samples` without sealing, attesting or storing anything.
    /// Requires [`Permission::FetchStore`].
    pub fn reconcile_only(
        &self,
        api_key: &str,
        samples: &[ProviderSample],
    ) -> PipelineResult<Reconciliation> {
        let caller = self.authorizer.authorize(api_key, Permission::FetchStore)?;

        let reconciliation = self.pipeline.resolver().reconcile(samples)?;
        info!(
            caller = %caller.name,
            consistent = reconciliation.fully_consistent(),
            "Samples reconciled without storing"
        );
        Ok(reconciliation)
    }

    /// The caller's stored readings, oldest first. Requires [`Permission::ReadHistory`].
    ///
    /// Each record's integrity hash is checked before decryption; one
    /// tampered or unreadable record fails the whole request.
    pub fn historical(&self, api_key: &str) -> PipelineResult<Vec<HistoricalReading>> {
        let caller = self.authorizer.authorize(api_key, Permission::ReadHistory)?;

        let records = self.records.list(&caller.name)?;
        let mut history = Vec::with_capacity(records.len());
        for record in &records {
            let key = self
                .keys
                .get(&record.record_id)?
                .ok_or(StorageError::KeyNotFound(record.record_id))?;

            let reading = self.pipeline.open(record, &key).map_err(|e| {
                error!(record_id = %record.record_id, error = %e, "History contains an unreadable record");
                e
            })?;
            history.push(HistoricalReading {
                record_id: record.record_id,
                attested_at: record.timestamp,
                reading,
            });
        }

        info!(caller = %caller.name, records = history.len(), "History served");
        Ok(history)
    }

    /// Fetch one of the caller's stored records and check its attestation
    /// against this service's signers. Another caller's record is
    /// [`StorageError::RecordNotFound`].
    pub fn audit(&self, api_key: &str, record_id: &Uuid) -> PipelineResult<bool> {
        let caller = self.authorizer.authorize(api_key, Permission::ReadHistory)?;

        let record = self
            .records
            .get(&caller.name, record_id)?
            .ok_or(StorageError::RecordNotFound(*record_id))?;
        self.pipeline.verify_record(&record, &self.verifiers())
    }
}
