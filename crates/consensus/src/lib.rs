//! Cross-source consensus for Nimbus provider samples.
//!
//! Several providers report the same seven weather quantities for one
//! location and time. Each field is reconciled independently:
//!
//! 1. Compare every pair of values with the relative difference
//!    `|a - b| / max(|a|, |b|)`.
//! 2. If every pair is within the field's margin, average all values.
//! 3. Otherwise drop the single source whose summed absolute deviation from
//!    the others is largest (earliest source on ties) and average the rest.
//! 4. Round to two decimals.
//!
//! The resolver never rejects a reading on disagreement. Callers that need to
//! reject inspect the per-field [`FieldResolution`]s of the returned
//! [`Reconciliation`].

pub mod error;
pub mod policy;
pub mod resolver;

pub use error::{ConsensusError, ConsensusResult};
pub use policy::{relative_difference, round2, ConsensusPolicy, FieldOutcome, FieldResolution, MarginPolicy};
pub use resolver::{reconcile, Reconciliation, Resolver, MIN_SOURCES};
