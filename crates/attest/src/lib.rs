//! Multi-signer attestation for sealed Nimbus records.
//!
//! Several organizational identities each sign the same sealed payload and
//! the individual signatures are combined into one attestation.
//!
//! # Scheme
//!
//! - Per identity: RSA PKCS#1 v1.5 over `SHA-256(identity || data)`. Binding
//!   the identity into the digest stops a signature made for one identity
//!   from being replayed as another identity's attestation.
//! - "Aggregation" is plain concatenation of the fixed-length signatures in
//!   signer order. It is O(N) in size and verification cost; it is not a
//!   compressible aggregate signature such as BLS.
//! - Verification slices the blob into N equal parts and checks part `i`
//!   against verifier `i`. Every part must verify.
//!
//! Signers and verifiers are carried as single ordered lists of tagged
//! entries ([`SignerSet`], [`VerifierSet`]) so identity, key and slice can
//! never drift apart. The scheme sits behind the [`Attestor`] trait so a real
//! aggregate or threshold scheme can replace it without touching callers.

pub mod aggregate;
pub mod attestor;
pub mod error;
pub mod signer;

pub use aggregate::{aggregate, sign, verify_aggregate, AggregateAttestation, IdentitySignature};
pub use attestor::{Attestor, AttestorMetrics, ConcatAttestor};
pub use error::{AttestError, AttestResult};
pub use signer::{SignerIdentity, SignerSet, Verifier, VerifierSet, DEFAULT_KEY_BITS};
