//! Percentile bootstrap intervals for the per-variable mean.
use super::{sampling, stats};
use crate::config::BootstrapConfig;
use crate::store::{ConfidenceInterval, SeriesFrame};
use rand::Rng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BootstrapError {
    #[error("invalid bootstrap config: {0}")]
    Config(String),
    #[error("resampled mean of '{variable}' is not finite")]
    NonFiniteStatistic { variable: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapResult {
    pub confidence_intervals: BTreeMap<String, ConfidenceInterval>,
    /// Variables with fewer than `sample_size` values.
    pub skipped: Vec<String>,
}

pub struct BootstrapEstimator<'a> {
    config: &'a BootstrapConfig,
}

impl<'a> BootstrapEstimator<'a> {
    pub fn new(config: &'a BootstrapConfig) -> Self {
        Self { config }
    }

    /// Builds an interval for every variable with enough data.
    ///
    /// Variables are resampled in parallel. Each one draws from its own
    /// generator derived from `random_seed` and the variable name, so the
    /// result is identical however the work is scheduled.
    pub fn estimate(&self, frame: &SeriesFrame, variables: &[String]) -> Result<BootstrapResult, BootstrapError> {
        self.config.validate().map_err(|e| BootstrapError::Config(e.to_string()))?;

        let per_variable = variables
            .par_iter()
            .map(|name| {
                let values = frame.values(name);
                self.interval_for(name, &values).map(|ci| (name, ci))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = BootstrapResult::default();
        for (name, ci) in per_variable {
            match ci {
                Some(ci) => { result.confidence_intervals.insert(name.clone(), ci); }
                None => result.skipped.push(name.clone()),
            }
        }
        Ok(result)
    }

    /// Interval for one series, or `None` when it is shorter than `sample_size`.
    pub fn interval_for(&self, name: &str, values: &[f64]) -> Result<Option<ConfidenceInterval>, BootstrapError> {
        let BootstrapConfig { sample_size, num_samples, confidence_level, random_seed } = *self.config;
        if values.len() < sample_size {
            debug!(variable = name, available = values.len(), required = sample_size, "skipping bootstrap: insufficient data");
            return Ok(None);
        }

        let mut rng = sampling::rng_for(random_seed, ("bootstrap", name));
        let mut statistics = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            let sum: f64 = (0..sample_size).map(|_| values[rng.gen_range(0..values.len())]).sum();
            statistics.push(sum / sample_size as f64);
        }
        if statistics.iter().any(|s| !s.is_finite()) {
            return Err(BootstrapError::NonFiniteStatistic { variable: name.to_string() });
        }

        statistics.sort_by(f64::total_cmp);
        let lower = stats::percentile_sorted(&statistics, (1.0 - confidence_level) / 2.0);
        let upper = stats::percentile_sorted(&statistics, (1.0 + confidence_level) / 2.0);
        Ok(Some(ConfidenceInterval::new(lower, upper)))
    }
}
