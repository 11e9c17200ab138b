// ⚙️ Validator Configuration
// Layer weights, Layer 1 allow-list, and the collaborator call policy.
// Loaded from JSON; every field has a default.

use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// LAYER WEIGHTS
// ============================================================================

/// Weights applied to the three layer scores in the composite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerWeights {
    pub internal: f64,
    pub external: f64,
    pub reproducibility: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        LayerWeights {
            internal: 0.33,
            external: 0.33,
            reproducibility: 0.34,
        }
    }
}

impl LayerWeights {
    pub fn sum(&self) -> f64 {
        self.internal + self.external + self.reproducibility
    }

    /// Weighted composite of the three layer scores
    pub fn composite(&self, layer1: f64, layer2: f64, layer3: f64) -> f64 {
        layer1 * self.internal + layer2 * self.external + layer3 * self.reproducibility
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (layer, value) in [
            (1, self.internal),
            (2, self.external),
            (3, self.reproducibility),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidWeight { layer, value });
            }
        }

        // Sums below 1.0 are allowed; the composite re-check handles them
        let sum = self.sum();
        if sum > 1.0 + 1e-9 {
            return Err(ConfigError::WeightsExceedOne(sum));
        }

        Ok(())
    }
}

// ============================================================================
// CALL POLICY
// ============================================================================

/// Upper bound on `max_retries`
pub const MAX_RETRIES: u32 = 5;

/// Timeout and retry budget for every collaborator call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallPolicy {
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Backoff grows linearly: attempt n waits n * retry_backoff_ms
    pub retry_backoff_ms: u64,
}

impl Default for CallPolicy {
    fn default() -> Self {
        CallPolicy {
            timeout_ms: 5_000,
            max_retries: 2,
            retry_backoff_ms: 100,
        }
    }
}

impl CallPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }

    /// Total attempts including the first call
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

// ============================================================================
// VALIDATOR CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub weights: LayerWeights,

    /// Source names accepted as authoritative (substring match)
    pub authoritative_sources: Vec<String>,

    pub call_policy: CallPolicy,

    /// Expected panel sizes; smaller panels are accepted with a warning
    pub min_external_sources: usize,
    pub min_reproducibility_indices: usize,

    /// Records validated at once by `validate_batch`
    pub batch_concurrency: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            weights: LayerWeights::default(),
            authoritative_sources: default_authoritative_sources(),
            call_policy: CallPolicy::default(),
            min_external_sources: 5,
            min_reproducibility_indices: 7,
            batch_concurrency: 16,
        }
    }
}

pub fn default_authoritative_sources() -> Vec<String> {
    [
        "HUD",
        "County Clerk",
        "County Assessor",
        "County Tax",
        "USPS",
        "Google Maps",
        "Census Bureau",
        "Zillow",
        "Redfin",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl ValidatorConfig {
    /// Load configuration from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: ValidatorConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;

        if self.authoritative_sources.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }

        if self.call_policy.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.call_policy.max_retries > MAX_RETRIES {
            return Err(ConfigError::TooManyRetries {
                value: self.call_policy.max_retries,
                max: MAX_RETRIES,
            });
        }

        if self.batch_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
