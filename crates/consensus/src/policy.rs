//! Per-field resolution policies.

use nimbus_core::{FieldMargins, WeatherField};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Relative difference between two readings: `|a - b| / max(|a|, |b|)`.
///
/// Two zeros are identical, so a zero denominator yields `0.0`.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let denominator = a.abs().max(b.abs());
    if denominator == 0.0 {
        return 0.0;
    }
    (a - b).abs() / denominator
}

/// Magnitude above which `f64` has no fractional digits left to round.
const ROUNDING_LIMIT: f64 = 1e15;

/// Round to two decimal places.
///
/// Values of magnitude `1e15` and above are returned unchanged; scaling them
/// by 100 could overflow.
pub fn round2(value: f64) -> f64 {
    if value.abs() >= ROUNDING_LIMIT {
        return value;
    }
    (value * 100.0).round() / 100.0
}

/// Running mean. Each step divides before subtracting, so finite inputs
/// anywhere up to `f64::MAX` never overflow.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    values.enumerate().fold(0.0, |mean, (i, v)| {
        let k = (i + 1) as f64;
        mean + (v / k - mean / k)
    })
}

fn within_margin(values: &[f64], margin: f64) -> bool {
    values.iter().enumerate().all(|(i, a)| {
        values[i + 1..]
            .iter()
            .all(|b| relative_difference(*a, *b) <= margin)
    })
}

/// How a single field's value was arrived at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum FieldOutcome {
    /// Every pair of sources agreed within margin
    Consistent,
    /// One source disagreed most and was dropped
    OutlierExcluded { source: String },
    /// Two disagreeing sources; no outlier can be singled out
    Unresolved,
}

/// Result of resolving one field across all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResolution {
    pub field: WeatherField,
    /// Reconciled value, rounded to two decimals
    pub value: f64,
    pub outcome: FieldOutcome,
    /// Whether the values that were averaged agree pairwise within margin
    pub remaining_consistent: bool,
    /// Number of sources averaged into `value`
    pub contributors: usize,
}

/// Strategy for collapsing one field's per-source values into one value.
///
/// `values` holds `(source, value)` in input order; every value is finite
/// and there are at least two.
pub trait ConsensusPolicy: Send + Sync {
    fn resolve(&self, field: WeatherField, values: &[(&str, f64)]) -> FieldResolution;
}

/// Margin-based policy: average when all pairs agree, otherwise exclude the
/// single source with the greatest total absolute deviation.
#[derive(Debug, Clone, Default)]
pub struct MarginPolicy {
    margins: FieldMargins,
}

impl MarginPolicy {
    pub fn new(margins: FieldMargins) -> Self {
        Self { margins }
    }

    pub fn margins(&self) -> &FieldMargins {
        &self.margins
    }
}

impl ConsensusPolicy for MarginPolicy {
    fn resolve(&self, field: WeatherField, values: &[(&str, f64)]) -> FieldResolution {
        let margin = self.margins.get(field);
        let raw: Vec<f64> = values.iter().map(|(_, v)| *v).collect();

        if within_margin(&raw, margin) {
            return FieldResolution {
                field,
                value: round2(mean(raw.iter().copied())),
                outcome: FieldOutcome::Consistent,
                remaining_consistent: true,
                contributors: raw.len(),
            };
        }

        if raw.len() == 2 {
            warn!(
                %field,
                a = raw[0],
                b = raw[1],
                margin,
                "Two sources disagree; averaging without exclusion"
            );
            return FieldResolution {
                field,
                value: round2(mean(raw.iter().copied())),
                outcome: FieldOutcome::Unresolved,
                remaining_consistent: false,
                contributors: 2,
            };
        }

        // Strict comparison keeps the earliest source on ties.
        let mut outlier = 0;
        let mut worst = f64::NEG_INFINITY;
        for (i, a) in raw.iter().enumerate() {
            let deviation: f64 = raw.iter().map(|b| (a - b).abs()).sum();
            if deviation > worst {
                worst = deviation;
                outlier = i;
            }
        }

        let remaining: Vec<f64> = raw
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != outlier)
            .map(|(_, v)| *v)
            .collect();
        let remaining_consistent = within_margin(&remaining, margin);
        let source = values[outlier].0.to_string();

        if !remaining_consistent {
            warn!(
                %field,
                excluded = %source,
                margin,
                "Sources still disagree after excluding the worst outlier"
            );
        }

        FieldResolution {
            field,
            value: round2(mean(remaining.iter().copied())),
            outcome: FieldOutcome::OutlierExcluded { source },
            remaining_consistent,
            contributors: remaining.len(),
        }
    }
}
