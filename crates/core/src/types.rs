//! Core types shared by the consensus, sealing and attestation stages.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven measured weather quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeatherField {
    Temperature,
    TemperatureApparent,
    Humidity,
    Pressure,
    WindSpeed,
    CloudCover,
    Precipitation,
}

impl WeatherField {
    /// Every field, in reporting order.
    pub const ALL: [WeatherField; 7] = [
        WeatherField::Temperature,
        WeatherField::TemperatureApparent,
        WeatherField::Humidity,
        WeatherField::Pressure,
        WeatherField::WindSpeed,
        WeatherField::CloudCover,
        WeatherField::Precipitation,
    ];

    /// Wire name of the field as used by provider records.
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherField::Temperature => "temperature",
            WeatherField::TemperatureApparent => "temperatureApparent",
            WeatherField::Humidity => "humidity",
            WeatherField::Pressure => "pressure",
            WeatherField::WindSpeed => "windSpeed",
            WeatherField::CloudCover => "cloudCover",
            WeatherField::Precipitation => "precipitation",
        }
    }
}

impl fmt::Display for WeatherField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider's normalized measurement for a single location and time.
///
/// Fields are optional on the wire so a provider that omits one can be
/// reported precisely instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSample {
    /// Provider name (e.g. "tomorrow-io")
    pub source: String,
    /// When the provider observed the measurement
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub temperature_apparent: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
}

impl ProviderSample {
    /// Create an empty sample for `source`; populate it with [`ProviderSample::with`].
    pub fn new(source: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            observed_at,
            temperature: None,
            temperature_apparent: None,
            humidity: None,
            pressure: None,
            wind_speed: None,
            cloud_cover: None,
            precipitation: None,
        }
    }

    /// Builder-style setter for a single field.
    pub fn with(mut self, field: WeatherField, value: f64) -> Self {
        *self.slot_mut(field) = Some(value);
        self
    }

    /// Value reported for `field`, if any.
    pub fn value(&self, field: WeatherField) -> Option<f64> {
        match field {
            WeatherField::Temperature => self.temperature,
            WeatherField::TemperatureApparent => self.temperature_apparent,
            WeatherField::Humidity => self.humidity,
            WeatherField::Pressure => self.pressure,
            WeatherField::WindSpeed => self.wind_speed,
            WeatherField::CloudCover => self.cloud_cover,
            WeatherField::Precipitation => self.precipitation,
        }
    }

    fn slot_mut(&mut self, field: WeatherField) -> &mut Option<f64> {
        match field {
            WeatherField::Temperature => &mut self.temperature,
            WeatherField::TemperatureApparent => &mut self.temperature_apparent,
            WeatherField::Humidity => &mut self.humidity,
            WeatherField::Pressure => &mut self.pressure,
            WeatherField::WindSpeed => &mut self.wind_speed,
            WeatherField::CloudCover => &mut self.cloud_cover,
            WeatherField::Precipitation => &mut self.precipitation,
        }
    }
}

/// Allowed relative difference per field before two sources disagree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMargins {
    pub temperature: f64,
    pub temperature_apparent: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    pub precipitation: f64,
}

impl Default for FieldMargins {
    fn default() -> Self {
        Self {
            temperature: 0.10,
            temperature_apparent: 0.15,
            humidity: 0.15,
            pressure: 0.02,
            wind_speed: 0.25,
            cloud_cover: 0.30,
            precipitation: 0.50,
        }
    }
}

impl FieldMargins {
    /// The same margin for every field.
    pub fn uniform(margin: f64) -> Self {
        Self {
            temperature: margin,
            temperature_apparent: margin,
            humidity: margin,
            pressure: margin,
            wind_speed: margin,
            cloud_cover: margin,
            precipitation: margin,
        }
    }

    /// Margin configured for `field`.
    pub fn get(&self, field: WeatherField) -> f64 {
        match field {
            WeatherField::Temperature => self.temperature,
            WeatherField::TemperatureApparent => self.temperature_apparent,
            WeatherField::Humidity => self.humidity,
            WeatherField::Pressure => self.pressure,
            WeatherField::WindSpeed => self.wind_speed,
            WeatherField::CloudCover => self.cloud_cover,
            WeatherField::Precipitation => self.precipitation,
        }
    }

    /// Every margin must lie in (0, 1].
    pub fn validate(&self) -> Result<()> {
        for field in WeatherField::ALL {
            let value = self.get(field);
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::InvalidMargin {
                    field: field.as_str().to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// The per-field consensus of several provider samples.
///
/// Values are rounded to two decimals for reporting. Once produced the
/// reading is only ever serialized, sealed and read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledReading {
    pub temperature: f64,
    pub temperature_apparent: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,
    pub precipitation: f64,
    /// Acquisition time: the latest observation among the reconciled samples
    pub timestamp: DateTime<Utc>,
}

impl ReconciledReading {
    /// Build a reading by evaluating `value_of` once per field.
    pub fn from_fn(timestamp: DateTime<Utc>, mut value_of: impl FnMut(WeatherField) -> f64) -> Self {
        Self {
            temperature: value_of(WeatherField::Temperature),
            temperature_apparent: value_of(WeatherField::TemperatureApparent),
            humidity: value_of(WeatherField::Humidity),
            pressure: value_of(WeatherField::Pressure),
            wind_speed: value_of(WeatherField::WindSpeed),
            cloud_cover: value_of(WeatherField::CloudCover),
            precipitation: value_of(WeatherField::Precipitation),
            timestamp,
        }
    }

    /// Reconciled value for `field`.
    pub fn value(&self, field: WeatherField) -> f64 {
        match field {
            WeatherField::Temperature => self.temperature,
            WeatherField::TemperatureApparent => self.temperature_apparent,
            WeatherField::Humidity => self.humidity,
            WeatherField::Pressure => self.pressure,
            WeatherField::WindSpeed => self.wind_speed,
            WeatherField::CloudCover => self.cloud_cover,
            WeatherField::Precipitation => self.precipitation,
        }
    }
}
