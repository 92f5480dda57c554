//! Secure record codec: AES-128-GCM sealing plus SHA-256 tamper evidence.
//!
//! # Security Model
//!
//! - `seal` draws a fresh transit key and a fresh 96-bit nonce per call
//! - The stored blob is `nonce || tag || payload`, self-describing
//! - `unseal` fails closed on any tag mismatch
//! - Callers must pass [`RecordCodec::verify_hash`] before calling `unseal`;
//!   [`RecordCodec::open`] enforces that order

use crate::canonical::to_canonical_json;
use crate::digest::{sha256_hex, verify_sha256_hex};
use crate::encoding::base64_bytes;
use crate::error::{CodecError, CodecResult};
use crate::key::TransitKey;
use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes128Gcm, Nonce, Tag,
};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

/// Nonce size for AES-GCM (96 bits / 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits / 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Bytes preceding the encrypted payload in a sealed blob.
pub const HEADER_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// Ciphertext plus its tamper-evidence hash, as handed to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedRecord {
    /// `nonce || tag || payload`
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Hex SHA-256 of `ciphertext`
    pub integrity_hash: String,
}

impl SealedRecord {
    /// Recompute the hash of the stored ciphertext and compare.
    pub fn verify_integrity(&self) -> bool {
        verify_sha256_hex(&self.ciphertext, &self.integrity_hash)
    }
}

/// Sealing interface consumed by the pipeline.
///
/// Byte-level methods are the required surface; typed helpers are provided
/// on top of them.
pub trait RecordCodec: Send + Sync {
    /// Encrypt `plaintext` under a freshly generated transit key.
    fn seal_bytes(&self, plaintext: &[u8]) -> CodecResult<(Vec<u8>, TransitKey)>;

    /// Decrypt a blob produced by [`RecordCodec::seal_bytes`].
    ///
    /// Precondition: `verify_hash` passed for this blob.
    fn unseal_bytes(&self, ciphertext: &[u8], key: &TransitKey) -> CodecResult<Vec<u8>>;

    /// Tamper-evidence digest of a stored blob.
    fn hash(&self, ciphertext: &[u8]) -> String {
        sha256_hex(ciphertext)
    }

    /// Compare a stored blob with its recorded digest.
    fn verify_hash(&self, ciphertext: &[u8], expected_hash: &str) -> bool {
        verify_sha256_hex(ciphertext, expected_hash)
    }

    /// Serialize `value` canonically and seal it.
    fn seal<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<(Vec<u8>, TransitKey)>
    where
        Self: Sized,
    {
        let plaintext = to_canonical_json(value)?;
        self.seal_bytes(&plaintext)
    }

    /// Unseal and parse a value sealed with [`RecordCodec::seal`].
    fn unseal<T: DeserializeOwned>(&self, ciphertext: &[u8], key: &TransitKey) -> CodecResult<T>
    where
        Self: Sized,
    {
        let plaintext = self.unseal_bytes(ciphertext, key)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Seal `value` and attach its integrity hash.
    fn seal_record<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<(SealedRecord, TransitKey)>
    where
        Self: Sized,
    {
        let (ciphertext, key) = self.seal(value)?;
        let integrity_hash = self.hash(&ciphertext);
        Ok((
            SealedRecord {
                ciphertext,
                integrity_hash,
            },
            key,
        ))
    }

    /// Verify the integrity hash, then unseal. A hash mismatch stops before
    /// any decryption is attempted.
    fn open<T: DeserializeOwned>(&self, record: &SealedRecord, key: &TransitKey) -> CodecResult<T>
    where
        Self: Sized,
    {
        if !self.verify_hash(&record.ciphertext, &record.integrity_hash) {
            warn!(
                expected = %record.integrity_hash,
                "Integrity hash mismatch, refusing to decrypt"
            );
            return Err(CodecError::TamperedData(
                "integrity hash does not match stored ciphertext".to_string(),
            ));
        }
        self.unseal(&record.ciphertext, key)
    }
}

/// AES-128-GCM implementation of [`RecordCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCodec;

impl AesGcmCodec {
    pub fn new() -> Self {
        Self
    }

    fn cipher(key: &TransitKey) -> CodecResult<Aes128Gcm> {
        Aes128Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CodecError::InvalidKey(e.to_string()))
    }
}

impl RecordCodec for AesGcmCodec {
    fn seal_bytes(&self, plaintext: &[u8]) -> CodecResult<(Vec<u8>, TransitKey)> {
        let key = TransitKey::generate();
        let cipher = Self::cipher(&key)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let mut payload = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce_bytes), b"", &mut payload)
            .map_err(|e| CodecError::Encryption(e.to_string()))?;

        let mut blob = Vec::with_capacity(HEADER_SIZE + payload.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(tag.as_slice());
        blob.extend_from_slice(&payload);

        debug!(
            plaintext_len = plaintext.len(),
            ciphertext_len = blob.len(),
            "Sealed record payload"
        );

        Ok((blob, key))
    }

    fn unseal_bytes(&self, ciphertext: &[u8], key: &TransitKey) -> CodecResult<Vec<u8>> {
        if ciphertext.len() < HEADER_SIZE {
            return Err(CodecError::TamperedData(format!(
                "sealed blob too short: {} bytes (header is {})",
                ciphertext.len(),
                HEADER_SIZE
            )));
        }

        let (nonce, rest) = ciphertext.split_at(NONCE_SIZE);
        let (tag, payload) = rest.split_at(TAG_SIZE);

        let cipher = Self::cipher(key)?;
        let mut buffer = payload.to_vec();

        // The tag is checked before any keystream is applied, so a failure
        // leaves `buffer` holding ciphertext only.
        if cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .is_err()
        {
            warn!(
                ciphertext_len = ciphertext.len(),
                "Authentication tag mismatch on unseal"
            );
            return Err(CodecError::TamperedData(
                "authentication tag mismatch".to_string(),
            ));
        }

        Ok(buffer)
    }
}
