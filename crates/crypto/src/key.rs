//! Per-record transit keys.

use crate::error::{CodecError, CodecResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Transit key size (128 bits).
pub const KEY_SIZE: usize = 16;

/// Symmetric key protecting exactly one sealed record.
///
/// The key is zeroized when dropped and its `Debug` output is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TransitKey([u8; KEY_SIZE]);

impl TransitKey {
    /// Generate a fresh key from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything but exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CodecError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Text form used by the key store (24 characters).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Parse the key store text form.
    pub fn from_base64(encoded: &str) -> CodecResult<Self> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CodecError::InvalidKey(e.to_string()))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }
}

impl PartialEq for TransitKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for TransitKey {}

impl fmt::Debug for TransitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransitKey(<redacted>)")
    }
}
