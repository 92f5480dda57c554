//! Shared fixtures for the end-to-end tests

use chrono::{DateTime, TimeZone, Utc};
use nimbus_attest::{SignerIdentity, SignerSet};
use nimbus_core::{ProviderSample, WeatherField};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Organizational identities used across the suite.
pub const IDENTITIES: [&str; 3] = [
    "WeatherNodeInitiative",
    "MeteoAuditCollective",
    "OpenClimateRegistry",
];

/// Initialize tracing once for the whole test binary.
pub fn init_tracing() {
    nimbus_core::logging::init();
}

pub fn observed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 23, 12, 0, 0).unwrap()
}

/// Sample from `source` with every field set to a plausible value and
/// temperature set to `temperature`.
pub fn sample(source: &str, temperature: f64) -> ProviderSample {
    ProviderSample::new(source, observed_at())
        .with(WeatherField::Temperature, temperature)
        .with(WeatherField::TemperatureApparent, temperature - 0.5)
        .with(WeatherField::Humidity, 62.0)
        .with(WeatherField::Pressure, 1013.2)
        .with(WeatherField::WindSpeed, 3.4)
        .with(WeatherField::CloudCover, 40.0)
        .with(WeatherField::Precipitation, 0.2)
}

/// Three providers in agreement.
pub fn consistent_samples() -> Vec<ProviderSample> {
    vec![
        sample("tomorrow-io", 20.0),
        sample("openweather", 20.5),
        sample("weatherapi", 21.0),
    ]
}

/// Three providers, the last reporting an outlying temperature.
pub fn outlier_samples() -> Vec<ProviderSample> {
    vec![
        sample("tomorrow-io", 20.0),
        sample("openweather", 20.5),
        sample("weatherapi", 40.0),
    ]
}

/// One 2048-bit signer per identity, generated once per test binary.
pub fn signers() -> &'static SignerSet {
    static SIGNERS: OnceLock<SignerSet> = OnceLock::new();
    SIGNERS.get_or_init(|| {
        let identities = IDENTITIES
            .iter()
            .map(|id| SignerIdentity::generate(*id).expect("key generation"))
            .collect();
        SignerSet::new(identities).expect("signer set")
    })
}

/// Fresh database path under the system temp directory.
pub fn temp_db(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}.db", prefix, uuid::Uuid::new_v4()))
}
