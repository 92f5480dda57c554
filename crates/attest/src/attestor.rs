//! Attestation scheme seam.
//!
//! Callers depend on [`Attestor`] rather than on the concatenation scheme so a
//! compact aggregate or threshold scheme can be slotted in later.

use crate::aggregate::{aggregate, verify_aggregate, AggregateAttestation};
use crate::error::AttestResult;
use crate::signer::{SignerSet, VerifierSet};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Produces and checks multi-signer attestations over opaque bytes.
pub trait Attestor: Send + Sync {
    /// Short scheme label recorded in logs.
    fn scheme(&self) -> &'static str;

    /// Have every signer in `signers` sign `data`, in set order.
    fn attest(&self, signers: &SignerSet, data: &[u8]) -> AttestResult<AggregateAttestation>;

    /// Check `attestation` over `data` against `verifiers`.
    fn verify(
        &self,
        verifiers: &VerifierSet,
        data: &[u8],
        attestation: &AggregateAttestation,
    ) -> AttestResult<bool>;
}

/// Point-in-time copy of an attestor's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttestorMetrics {
    pub attestations: u64,
    pub signatures: u64,
    pub verifications: u64,
    pub rejected: u64,
    pub sign_time_us: u64,
}

#[derive(Default)]
struct Counters {
    attestations: AtomicU64,
    signatures: AtomicU64,
    verifications: AtomicU64,
    rejected: AtomicU64,
    sign_time_us: AtomicU64,
}

/// RSA signatures concatenated in signer order.
///
/// Signers work in parallel on the rayon pool; the result order always
/// follows the signer set.
#[derive(Default)]
pub struct ConcatAttestor {
    counters: Counters,
}

impl ConcatAttestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> AttestorMetrics {
        AttestorMetrics {
            attestations: self.counters.attestations.load(Ordering::Relaxed),
            signatures: self.counters.signatures.load(Ordering::Relaxed),
            verifications: self.counters.verifications.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            sign_time_us: self.counters.sign_time_us.load(Ordering::Relaxed),
        }
    }
}

impl Attestor for ConcatAttestor {
    fn scheme(&self) -> &'static str {
        "rsa-pkcs1v15-sha256-concat"
    }

    fn attest(&self, signers: &SignerSet, data: &[u8]) -> AttestResult<AggregateAttestation> {
        let start = Instant::now();

        let signatures = signers
            .as_slice()
            .par_iter()
            .map(|signer| signer.sign(data))
            .collect::<AttestResult<Vec<_>>>()?;
        let attestation = aggregate(&signatures);

        let elapsed = start.elapsed().as_micros() as u64;
        self.counters.attestations.fetch_add(1, Ordering::Relaxed);
        self.counters
            .signatures
            .fetch_add(signatures.len() as u64, Ordering::Relaxed);
        self.counters.sign_time_us.fetch_add(elapsed, Ordering::Relaxed);

        info!(
            scheme = self.scheme(),
            signers = signatures.len(),
            bytes = attestation.len(),
            elapsed_us = elapsed,
            "Attestation produced"
        );
        Ok(attestation)
    }

    fn verify(
        &self,
        verifiers: &VerifierSet,
        data: &[u8],
        attestation: &AggregateAttestation,
    ) -> AttestResult<bool> {
        self.counters.verifications.fetch_add(1, Ordering::Relaxed);
        let valid = verify_aggregate(verifiers, data, attestation)?;
        if !valid {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        }
        debug!(scheme = self.scheme(), valid, "Attestation checked");
        Ok(valid)
    }
}
