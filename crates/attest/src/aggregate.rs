//! Per-identity signing, concatenation, and slice-wise verification.

use crate::error::{AttestError, AttestResult};
use crate::signer::{identity_digest, VerifierSet};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

/// One identity's signature over the attested payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySignature {
    pub identity: String,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

/// Concatenated signatures of several identities over the same payload.
///
/// `identities[i]` produced bytes `[i * len / N, (i + 1) * len / N)` of
/// `signature`; there is no embedded indexing beyond this ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateAttestation {
    pub identities: Vec<String>,
    #[serde(rename = "aggregateSignature", with = "hex::serde")]
    pub signature: Vec<u8>,
}

impl AggregateAttestation {
    pub fn signer_count(&self) -> usize {
        self.identities.len()
    }

    /// Total size in bytes; grows linearly with the number of signers.
    pub fn len(&self) -> usize {
        self.signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }
}

/// RSA PKCS#1 v1.5 signature over `SHA-256(identity || data)`.
pub fn sign(identity: &str, key: &RsaPrivateKey, data: &[u8]) -> AttestResult<Vec<u8>> {
    let digest = identity_digest(identity, data);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| AttestError::Signing {
            identity: identity.to_string(),
            reason: e.to_string(),
        })
}

/// Concatenate signatures in the given order.
pub fn aggregate(signatures: &[IdentitySignature]) -> AggregateAttestation {
    let total: usize = signatures.iter().map(|s| s.signature.len()).sum();
    let mut signature = Vec::with_capacity(total);
    for entry in signatures {
        signature.extend_from_slice(&entry.signature);
    }

    AggregateAttestation {
        identities: signatures.iter().map(|s| s.identity.clone()).collect(),
        signature,
    }
}

/// Verify every slice of `attestation` against the matching verifier.
///
/// Returns `Ok(true)` only if all slices verify and the attestation names
/// exactly the verifiers' identities in the same order. A slice length that
/// cannot be reconciled with the verifiers' key sizes is a
/// [`AttestError::KeyMismatch`].
pub fn verify_aggregate(
    verifiers: &VerifierSet,
    data: &[u8],
    attestation: &AggregateAttestation,
) -> AttestResult<bool> {
    let count = verifiers.len();
    if count == 0 {
        return Err(AttestError::EmptySignerSet);
    }

    let total = attestation.signature.len();
    if total % count != 0 {
        return Err(AttestError::KeyMismatch(format!(
            "aggregate of {} bytes cannot split into {} equal signatures",
            total, count
        )));
    }

    let slice_len = total / count;
    if let Some(v) = verifiers.iter().find(|v| v.key_size() != slice_len) {
        return Err(AttestError::KeyMismatch(format!(
            "slice length {} does not match {}-byte key of {}",
            slice_len,
            v.key_size(),
            v.identity()
        )));
    }

    if attestation.identities != verifiers.identities() {
        warn!(
            attested = ?attestation.identities,
            expected = ?verifiers.identities(),
            "Attestation identities do not match verifier order"
        );
        return Ok(false);
    }

    for (index, (verifier, slice)) in verifiers
        .iter()
        .zip(attestation.signature.chunks_exact(slice_len))
        .enumerate()
    {
        if let Err(e) = verifier.verify(data, slice) {
            warn!(
                index,
                identity = %verifier.identity(),
                key_id = %verifier.fingerprint(),
                error = %e,
                "Aggregate signature slice failed verification"
            );
            return Ok(false);
        }
    }

    debug!(signers = count, "Aggregate attestation verified");
    Ok(true)
}
