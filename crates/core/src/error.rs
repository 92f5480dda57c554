//! Core error types

use thiserror::Error;

/// Core error type for Nimbus
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A field margin outside of (0, 1]
    #[error("Invalid margin for {field}: {value} (must be in (0, 1])")]
    InvalidMargin {
        /// Wire name of the field
        field: String,
        /// Offending margin
        value: f64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
