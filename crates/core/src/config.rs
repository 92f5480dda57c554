//! Configuration management for Nimbus.

use crate::error::{Error, Result};
use crate::types::FieldMargins;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub consensus: ConsensusConfig,
    pub attestation: AttestationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub margins: FieldMargins,
    /// Fewest provider samples a run accepts (never below 2)
    pub min_sources: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            margins: FieldMargins::default(),
            min_sources: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    /// Modulus size for newly generated signer keys
    pub rsa_key_bits: usize,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self { rsa_key_bits: 2048 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding sealed attestation records
    pub record_db_path: PathBuf,
    /// SQLite database holding transit keys
    pub key_db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            record_db_path: PathBuf::from("data/records.db"),
            key_db_path: PathBuf::from("keys/transit_keys.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    #[cfg(feature = "config-file")]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    #[cfg(feature = "config-file")]
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.consensus.margins.validate()?;

        if self.consensus.min_sources < 2 {
            return Err(Error::Config(format!(
                "consensus.min_sources must be at least 2, got {}",
                self.consensus.min_sources
            )));
        }

        if self.attestation.rsa_key_bits < 2048 {
            return Err(Error::Config(format!(
                "attestation.rsa_key_bits must be at least 2048, got {}",
                self.attestation.rsa_key_bits
            )));
        }

        // Records and their keys must never share a store.
        if self.storage.record_db_path == self.storage.key_db_path {
            return Err(Error::Config(
                "storage.record_db_path and storage.key_db_path must differ".to_string(),
            ));
        }

        Ok(())
    }
}
