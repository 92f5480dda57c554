//! Record sealing primitives for the Nimbus attestation pipeline.
//!
//! This crate turns a reconciled reading into a sealed record that can be
//! stored by an untrusted document store and later proven untouched.
//!
//! # Core Capabilities
//!
//! - **Authenticated Encryption**: AES-128-GCM with a fresh key per record
//! - **Tamper Evidence**: SHA-256 over the stored ciphertext blob
//! - **Canonical Serialization**: JSON with sorted object keys so that the
//!   same logical value always produces the same plaintext bytes
//!
//! # Blob Layout
//!
//! ```text
//! nonce (12 bytes) || tag (16 bytes) || payload
//! ```
//!
//! # Security Principles
//!
//! - A transit key seals exactly one record and is stored apart from it
//! - The integrity hash is checked before any decryption is attempted
//! - Decryption fails closed; no partial plaintext is ever returned
//! - Key material is zeroized on drop and never logged

pub mod canonical;
pub mod codec;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod key;


pub use canonical::to_canonical_json;
pub use codec::{AesGcmCodec, RecordCodec, SealedRecord, HEADER_SIZE, NONCE_SIZE, TAG_SIZE};
pub use digest::{sha256_hex, verify_sha256_hex};
pub use error::{CodecError, CodecResult};
pub use key::{TransitKey, KEY_SIZE};
