//! Core functionality for the Nimbus weather attestation pipeline.
//!
//! This crate provides the shared data model, configuration and logging
//! used across the Nimbus workspace:
//!
//! - [`types`]: provider samples, field margins and reconciled readings
//! - [`config`]: TOML-backed configuration with validation
//! - [`logging`]: `tracing` subscriber initialization
//! - [`error`]: core error type

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{AttestationConfig, Config, ConsensusConfig, LoggingConfig, StorageConfig};
pub use error::{Error, Result};
pub use types::{FieldMargins, ProviderSample, ReconciledReading, WeatherField};
