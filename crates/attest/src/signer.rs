//! Signer identities and their ordered signing / verifying sets.
//!
//! A [`SignerIdentity`] is created once per organizational domain. Key
//! custody belongs to the caller: this module accepts loaded keys or PEM
//! text, never file paths.

use crate::aggregate::{sign, IdentitySignature};
use crate::error::{AttestError, AttestResult};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use zeroize::Zeroizing;

/// Modulus size for newly generated signer keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Stable short identifier of a public key, safe to log: the first 16 bytes
/// of BLAKE3 over the big-endian modulus followed by the big-endian public
/// exponent, hex-encoded.
fn key_fingerprint(public_key: &RsaPublicKey) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&public_key.n().to_bytes_be());
    hasher.update(&public_key.e().to_bytes_be());
    let hash = hasher.finalize();
    hex::encode(&hash.as_bytes()[..16])
}

/// Digest signed on behalf of `identity`: `SHA-256(identity || data)`.
pub(crate) fn identity_digest(identity: &str, data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// An organizational identity holding an RSA keypair.
#[derive(Clone)]
pub struct SignerIdentity {
    identity: String,
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    fingerprint: String,
}

impl SignerIdentity {
    /// Generate a new identity with a 2048-bit key.
    pub fn generate(identity: impl Into<String>) -> AttestResult<Self> {
        Self::generate_with_bits(identity, DEFAULT_KEY_BITS)
    }

    /// Generate a new identity with a key of `bits` bits.
    pub fn generate_with_bits(identity: impl Into<String>, bits: usize) -> AttestResult<Self> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| AttestError::InvalidKey(e.to_string()))?;
        let signer = Self::from_private_key(identity, private_key);

        tracing::info!(
            identity = %signer.identity,
            key_id = %signer.fingerprint,
            bits,
            "Generated signer identity"
        );

        Ok(signer)
    }

    /// Wrap an already loaded private key.
    pub fn from_private_key(identity: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        let fingerprint = key_fingerprint(&public_key);
        Self {
            identity: identity.into(),
            private_key,
            public_key,
            fingerprint,
        }
    }

    /// Load from a PEM private key, PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8.
    pub fn from_pem(identity: impl Into<String>, pem: &str) -> AttestResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| AttestError::InvalidKey(format!("unreadable private key PEM: {}", e)))?;
        Ok(Self::from_private_key(identity, private_key))
    }

    /// PKCS#1 PEM of the private key. The buffer is zeroized on drop.
    pub fn private_key_pem(&self) -> AttestResult<Zeroizing<String>> {
        self.private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AttestError::InvalidKey(e.to_string()))
    }

    /// SubjectPublicKeyInfo PEM of the public key.
    pub fn public_key_pem(&self) -> AttestResult<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AttestError::InvalidKey(e.to_string()))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Length in bytes of every signature this identity produces.
    pub fn signature_len(&self) -> usize {
        self.public_key.size()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Sign `data` as this identity.
    pub fn sign(&self, data: &[u8]) -> AttestResult<IdentitySignature> {
        let signature = sign(&self.identity, &self.private_key, data)?;
        Ok(IdentitySignature {
            identity: self.identity.clone(),
            signature,
        })
    }

    /// The public half, paired with the identity.
    pub fn verifier(&self) -> Verifier {
        Verifier {
            identity: self.identity.clone(),
            public_key: self.public_key.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

impl fmt::Debug for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerIdentity")
            .field("identity", &self.identity)
            .field("key_id", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// An identity paired with the public key its signatures verify under.
#[derive(Debug, Clone, PartialEq)]
pub struct Verifier {
    identity: String,
    public_key: RsaPublicKey,
    fingerprint: String,
}

impl Verifier {
    pub fn new(identity: impl Into<String>, public_key: RsaPublicKey) -> Self {
        let fingerprint = key_fingerprint(&public_key);
        Self {
            identity: identity.into(),
            public_key,
            fingerprint,
        }
    }

    /// Load from a PEM public key, SPKI (`PUBLIC KEY`) or PKCS#1.
    pub fn from_pem(identity: impl Into<String>, pem: &str) -> AttestResult<Self> {
        let public_key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| AttestError::InvalidKey(format!("unreadable public key PEM: {}", e)))?;
        Ok(Self::new(identity, public_key))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Modulus size in bytes, which is also the signature length.
    pub fn key_size(&self) -> usize {
        self.public_key.size()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Check one signature made by this identity over `data`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> AttestResult<()> {
        let digest = identity_digest(&self.identity, data);
        self.public_key
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
            .map_err(|e| AttestError::VerificationFailed {
                identity: self.identity.clone(),
                reason: e.to_string(),
            })
    }
}

fn ensure_unique<'a>(identities: impl Iterator<Item = &'a str>) -> AttestResult<()> {
    let mut seen = HashSet::new();
    for identity in identities {
        if !seen.insert(identity) {
            return Err(AttestError::DuplicateIdentity(identity.to_string()));
        }
    }
    Ok(())
}

/// Ordered, non-empty list of signers. Order is the slice order of the
/// resulting attestation.
#[derive(Debug, Clone)]
pub struct SignerSet {
    signers: Vec<SignerIdentity>,
}

impl SignerSet {
    pub fn new(signers: Vec<SignerIdentity>) -> AttestResult<Self> {
        if signers.is_empty() {
            return Err(AttestError::EmptySignerSet);
        }
        ensure_unique(signers.iter().map(|s| s.identity()))?;
        Ok(Self { signers })
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SignerIdentity> {
        self.signers.iter()
    }

    pub fn as_slice(&self) -> &[SignerIdentity] {
        &self.signers
    }

    pub fn identities(&self) -> Vec<String> {
        self.signers.iter().map(|s| s.identity.clone()).collect()
    }

    /// Verifiers in the same order as the signers.
    pub fn verifiers(&self) -> VerifierSet {
        VerifierSet {
            verifiers: self.signers.iter().map(SignerIdentity::verifier).collect(),
        }
    }
}

/// Ordered, non-empty list of verifiers matching a [`SignerSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierSet {
    verifiers: Vec<Verifier>,
}

impl VerifierSet {
    pub fn new(verifiers: Vec<Verifier>) -> AttestResult<Self> {
        if verifiers.is_empty() {
            return Err(AttestError::EmptySignerSet);
        }
        ensure_unique(verifiers.iter().map(|v| v.identity()))?;
        Ok(Self { verifiers })
    }

    /// Build from the legacy parallel-array form, pairing entry `i` of each.
    pub fn from_parts(identities: &[String], public_keys: &[RsaPublicKey]) -> AttestResult<Self> {
        if identities.len() != public_keys.len() {
            return Err(AttestError::SignerCountMismatch {
                identities: identities.len(),
                keys: public_keys.len(),
            });
        }
        Self::new(
            identities
                .iter()
                .zip(public_keys)
                .map(|(identity, key)| Verifier::new(identity.clone(), key.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Verifier> {
        self.verifiers.iter()
    }

    pub fn identities(&self) -> Vec<String> {
        self.verifiers.iter().map(|v| v.identity.clone()).collect()
    }
}
