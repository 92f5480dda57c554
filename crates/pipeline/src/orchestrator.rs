//! Reconcile → seal → attest → self-verify.

use crate::error::{PipelineError, PipelineResult};
use crate::record::{AttestationRecord, SealedOutput};
use nimbus_attest::{Attestor, ConcatAttestor, SignerSet, VerifierSet};
use nimbus_consensus::{ConsensusPolicy, MarginPolicy, Resolver};
use nimbus_core::{ConsensusConfig, FieldMargins, ProviderSample, ReconciledReading};
use nimbus_crypto::{AesGcmCodec, RecordCodec, TransitKey};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The attestation pipeline.
///
/// Holds no mutable state; one instance can serve concurrent runs.
pub struct Pipeline<C, A, P = MarginPolicy> {
    codec: C,
    attestor: A,
    resolver: Resolver<P>,
}

impl Pipeline<AesGcmCodec, ConcatAttestor> {
    /// AES-GCM sealing and concatenated RSA attestation with margins and
    /// source minimum taken from `config`.
    pub fn standard(config: &ConsensusConfig) -> PipelineResult<Self> {
        Ok(Self::with_resolver(
            AesGcmCodec::new(),
            ConcatAttestor::new(),
            Resolver::from_config(config)?,
        ))
    }
}

impl<C: RecordCodec, A: Attestor> Pipeline<C, A> {
    pub fn new(codec: C, attestor: A, margins: FieldMargins) -> PipelineResult<Self> {
        Ok(Self::with_resolver(codec, attestor, Resolver::new(margins)?))
    }
}

impl<C: RecordCodec, A: Attestor, P: ConsensusPolicy> Pipeline<C, A, P> {
    pub fn with_resolver(codec: C, attestor: A, resolver: Resolver<P>) -> Self {
        Self {
            codec,
            attestor,
            resolver,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn attestor(&self) -> &A {
        &self.attestor
    }

    pub fn resolver(&self) -> &Resolver<P> {
        &self.resolver
    }

    /// Run every stage over `samples` and attest with `signers`.
    ///
    /// The attestation is checked against `signers` before anything is
    /// returned; a run either yields a complete, verified record or an error.
    pub fn run(&self, samples: &[ProviderSample], signers: &SignerSet) -> PipelineResult<SealedOutput> {
        let start = Instant::now();

        let reconciliation = self.resolver.reconcile(samples)?;
        let (sealed, transit_key) = self.codec.seal_record(&reconciliation.reading)?;
        debug!(
            bytes = sealed.ciphertext.len(),
            hash = %sealed.integrity_hash,
            "Reading sealed"
        );

        let attestation = self.attestor.attest(signers, &sealed.ciphertext)?;
        if !self
            .attestor
            .verify(&signers.verifiers(), &sealed.ciphertext, &attestation)?
        {
            error!(
                scheme = self.attestor.scheme(),
                signers = signers.len(),
                "Fresh attestation failed self-verification"
            );
            return Err(PipelineError::SelfCheckFailed(format!(
                "{} attestation by {} signers did not verify",
                self.attestor.scheme(),
                signers.len()
            )));
        }

        let record = AttestationRecord::new(sealed, attestation);
        info!(
            record_id = %record.record_id,
            sources = samples.len(),
            signers = signers.len(),
            consistent = reconciliation.fully_consistent(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );

        Ok(SealedOutput {
            record,
            transit_key,
            reconciliation,
        })
    }

    /// Check the integrity hash, then decrypt the reading.
    pub fn open(&self, record: &AttestationRecord, key: &TransitKey) -> PipelineResult<ReconciledReading> {
        match self.codec.open::<ReconciledReading>(&record.sealed, key) {
            Ok(reading) => Ok(reading),
            Err(e) => {
                warn!(record_id = %record.record_id, error = %e, "Failed to open record");
                Err(e.into())
            }
        }
    }

    /// Check integrity and attestation of a stored record without decrypting it.
    pub fn verify_record(&self, record: &AttestationRecord, verifiers: &VerifierSet) -> PipelineResult<bool> {
        if !self
            .codec
            .verify_hash(&record.sealed.ciphertext, &record.sealed.integrity_hash)
        {
            warn!(record_id = %record.record_id, "Integrity hash mismatch");
            return Ok(false);
        }
        Ok(self
            .attestor
            .verify(verifiers, &record.sealed.ciphertext, &record.attestation)?)
    }

    /// [`Pipeline::open`] preceded by an attestation check against `verifiers`.
    pub fn open_verified(
        &self,
        record: &AttestationRecord,
        key: &TransitKey,
        verifiers: &VerifierSet,
    ) -> PipelineResult<ReconciledReading> {
        if !self
            .attestor
            .verify(verifiers, &record.sealed.ciphertext, &record.attestation)?
        {
            warn!(record_id = %record.record_id, "Stored attestation rejected");
            return Err(PipelineError::AttestationRejected(record.record_id));
        }
        self.open(record, key)
    }
}
