//! Engine configuration.
//!
//! Every config struct validates itself eagerly. The engine setters call
//! `validate()` before swapping a config in, so a bad value never reaches the
//! numerical pipeline.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid confidence level {0}: must lie strictly between 0 and 1")]
    ConfidenceLevel(f64),
    #[error("'{field}' must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("'{field}' must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("'{field}' must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("Smoothing alpha {0} must lie in (0, 1]")]
    Alpha(f64),
    #[error("Smoothing window {window} is smaller than the minimum window {min_window}")]
    Window { window: usize, min_window: usize },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn ensure_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}

/// L1/L2 regularization parameters.
///
/// Only `l1_lambda` is used by the discovery path (soft-thresholding). The
/// remaining fields are carried for iterative solvers and validated all the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizationConfig {
    pub l1_lambda: f64,
    pub l2_lambda: f64,
    pub max_iterations: usize,
    pub convergence_threshold: f64,
    pub learning_rate: f64,
}

impl Default for RegularizationConfig {
    fn default() -> Self {
        Self {
            l1_lambda: 0.01,
            l2_lambda: 0.001,
            max_iterations: 1000,
            convergence_threshold: 1e-6,
            learning_rate: 0.01,
        }
    }
}

impl RegularizationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_non_negative("l1_lambda", self.l1_lambda)?;
        ensure_non_negative("l2_lambda", self.l2_lambda)?;
        ensure_positive("max_iterations", self.max_iterations as f64)?;
        ensure_positive("convergence_threshold", self.convergence_threshold)?;
        ensure_positive("learning_rate", self.learning_rate)?;
        Ok(())
    }
}

/// Resampling parameters for confidence intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Size of each resample. Variables with fewer values get no interval.
    pub sample_size: usize,
    pub num_samples: usize,
    pub confidence_level: f64,
    /// `None` seeds from OS entropy, so runs are not reproducible.
    pub random_seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            sample_size: 100,
            num_samples: 1000,
            confidence_level: 0.95,
            random_seed: Some(42),
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("sample_size", self.sample_size as f64)?;
        ensure_positive("num_samples", self.num_samples as f64)?;
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::ConfidenceLevel(self.confidence_level));
        }
        Ok(())
    }
}

/// EWMA and trailing-window outlier parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub alpha: f64,
    /// Maximum number of prior points in the Z-score window.
    pub window: usize,
    /// Below this many prior points a value is never flagged.
    pub min_window: usize,
    pub z_threshold: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            window: 20,
            min_window: 5,
            z_threshold: 3.0,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_alpha(self.alpha)?;
        ensure_positive("min_window", self.min_window as f64)?;
        if self.window < self.min_window {
            return Err(ConfigError::Window { window: self.window, min_window: self.min_window });
        }
        ensure_positive("z_threshold", self.z_threshold)?;
        Ok(())
    }
}

pub(crate) fn validate_alpha(alpha: f64) -> Result<(), ConfigError> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Alpha(alpha))
    }
}

/// Thresholds applied while scoring and gating edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    /// Edges at or below this strength never enter the raw edge list.
    pub discovery_min_strength: f64,
    pub min_strength: f64,
    pub min_confidence: f64,
    pub max_p_value: f64,
    /// Confidence floor of the diagnostic (loose) gate.
    pub loose_min_confidence: f64,
    pub permutations: usize,
    /// Confidence assigned when either endpoint has no bootstrap interval.
    pub missing_interval_confidence: f64,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            discovery_min_strength: 0.1,
            min_strength: 0.05,
            min_confidence: 0.5,
            max_p_value: 0.05,
            loose_min_confidence: 0.7,
            permutations: 100,
            missing_interval_confidence: 0.5,
        }
    }
}

impl SignificanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_unit("discovery_min_strength", self.discovery_min_strength)?;
        ensure_unit("min_strength", self.min_strength)?;
        ensure_unit("min_confidence", self.min_confidence)?;
        ensure_unit("max_p_value", self.max_p_value)?;
        ensure_unit("loose_min_confidence", self.loose_min_confidence)?;
        ensure_unit("missing_interval_confidence", self.missing_interval_confidence)?;
        ensure_positive("permutations", self.permutations as f64)?;
        Ok(())
    }
}

/// The full set of knobs held by one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub regularization: RegularizationConfig,
    pub bootstrap: BootstrapConfig,
    pub smoothing: SmoothingConfig,
    pub significance: SignificanceConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.regularization.validate()?;
        self.bootstrap.validate()?;
        self.smoothing.validate()?;
        self.significance.validate()?;
        Ok(())
    }

    /// Parses a JSON document. Missing sections and fields fall back to defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
