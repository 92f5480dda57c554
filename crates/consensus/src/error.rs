//! Consensus error types.

use nimbus_core::WeatherField;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    /// A sample is missing a field or carries a non-finite value for it
    #[error("Malformed sample from {source_name}: field {field} is missing or not finite")]
    MalformedSample {
        /// Provider that produced the sample
        source_name: String,
        field: WeatherField,
    },

    /// The policy produced a value that cannot be sealed
    #[error("Field {field} resolved to non-finite value {value}")]
    NonFiniteResult { field: WeatherField, value: f64 },

    #[error("Insufficient sources: got {got}, need at least {min}")]
    InsufficientSources { got: usize, min: usize },

    /// Margins or thresholds rejected by validation
    #[error("Invalid consensus configuration: {0}")]
    Config(#[from] nimbus_core::Error),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
