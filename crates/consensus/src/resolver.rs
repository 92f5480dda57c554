//! Cross-source reconciliation of provider samples.

use crate::error::{ConsensusError, ConsensusResult};
use crate::policy::{ConsensusPolicy, FieldOutcome, FieldResolution, MarginPolicy};
use nimbus_core::{ConsensusConfig, FieldMargins, ProviderSample, ReconciledReading, WeatherField};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Fewest samples any reconciliation can work with.
pub const MIN_SOURCES: usize = 2;

/// A reconciled reading together with how each field was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub reading: ReconciledReading,
    /// One entry per field, in [`WeatherField::ALL`] order
    pub fields: Vec<FieldResolution>,
}

impl Reconciliation {
    pub fn resolution(&self, field: WeatherField) -> Option<&FieldResolution> {
        self.fields.iter().find(|r| r.field == field)
    }

    /// True when every field's averaged values agree within margin.
    pub fn fully_consistent(&self) -> bool {
        self.fields.iter().all(|r| r.remaining_consistent)
    }

    /// `(field, source)` for every field where an outlier was dropped.
    pub fn excluded_sources(&self) -> Vec<(WeatherField, &str)> {
        self.fields
            .iter()
            .filter_map(|r| match &r.outcome {
                FieldOutcome::OutlierExcluded { source } => Some((r.field, source.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Reconcile `samples` with the margin policy.
///
/// Accepts any `N >= 2`. Each field is resolved independently, so different
/// fields may exclude different sources.
pub fn reconcile(samples: &[ProviderSample], margins: &FieldMargins) -> ConsensusResult<Reconciliation> {
    reconcile_with(samples, &MarginPolicy::new(*margins), MIN_SOURCES)
}

fn reconcile_with<P: ConsensusPolicy + ?Sized>(
    samples: &[ProviderSample],
    policy: &P,
    min_sources: usize,
) -> ConsensusResult<Reconciliation> {
    let min = min_sources.max(MIN_SOURCES);
    if samples.len() < min {
        return Err(ConsensusError::InsufficientSources {
            got: samples.len(),
            min,
        });
    }

    let mut fields = Vec::with_capacity(WeatherField::ALL.len());
    for field in WeatherField::ALL {
        let values = field_values(samples, field)?;
        let resolution = policy.resolve(field, &values);
        if !resolution.value.is_finite() {
            warn!(%field, value = resolution.value, "Field resolved to a non-finite value");
            return Err(ConsensusError::NonFiniteResult {
                field,
                value: resolution.value,
            });
        }
        debug!(
            %field,
            value = resolution.value,
            outcome = ?resolution.outcome,
            contributors = resolution.contributors,
            "Field resolved"
        );
        fields.push(resolution);
    }

    // Latest observation keeps the result a pure function of its inputs.
    let timestamp = samples
        .iter()
        .map(|s| s.observed_at)
        .max()
        .ok_or(ConsensusError::InsufficientSources { got: 0, min })?;

    let reading = ReconciledReading::from_fn(timestamp, |field| {
        fields
            .iter()
            .find(|r| r.field == field)
            .map_or(f64::NAN, |r| r.value)
    });

    let reconciliation = Reconciliation { reading, fields };
    info!(
        sources = samples.len(),
        excluded = reconciliation.excluded_sources().len(),
        consistent = reconciliation.fully_consistent(),
        "Samples reconciled"
    );
    Ok(reconciliation)
}

fn field_values(samples: &[ProviderSample], field: WeatherField) -> ConsensusResult<Vec<(&str, f64)>> {
    samples
        .iter()
        .map(|sample| match sample.value(field) {
            Some(v) if v.is_finite() => Ok((sample.source.as_str(), v)),
            _ => Err(ConsensusError::MalformedSample {
                source_name: sample.source.clone(),
                field,
            }),
        })
        .collect()
}

/// Reconciler configured once and shared across runs.
#[derive(Debug, Clone)]
pub struct Resolver<P = MarginPolicy> {
    policy: P,
    min_sources: usize,
}

impl Resolver<MarginPolicy> {
    /// Margin policy with validated `margins`, accepting two or more sources.
    pub fn new(margins: FieldMargins) -> ConsensusResult<Self> {
        margins.validate()?;
        Ok(Self {
            policy: MarginPolicy::new(margins),
            min_sources: MIN_SOURCES,
        })
    }

    pub fn from_config(config: &ConsensusConfig) -> ConsensusResult<Self> {
        Ok(Self::new(config.margins)?.with_min_sources(config.min_sources))
    }
}

impl<P: ConsensusPolicy> Resolver<P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            policy,
            min_sources: MIN_SOURCES,
        }
    }

    /// Require at least `min_sources` samples (never fewer than two).
    pub fn with_min_sources(mut self, min_sources: usize) -> Self {
        self.min_sources = min_sources.max(MIN_SOURCES);
        self
    }

    pub fn min_sources(&self) -> usize {
        self.min_sources
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn reconcile(&self, samples: &[ProviderSample]) -> ConsensusResult<Reconciliation> {
        reconcile_with(samples, &self.policy, self.min_sources)
    }
}
