//! EWMA smoothing with trailing-window Z-score outlier rejection.
use super::stats;
use crate::config::{validate_alpha, SmoothingConfig};
use crate::store::{EwmaFilterState, NoiseFilteringResult, Observation, SmoothingMetrics};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("alpha {alpha} for '{variable}' must lie in (0, 1]")]
    InvalidAlpha { variable: String, alpha: f64 },
}

/// Smoothed output of one variable, both as a report and as a row-aligned column.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub result: NoiseFilteringResult,
    /// One cell per observation; `None` for missing values and outliers.
    pub column: Vec<Option<f64>>,
}

pub struct OutlierFilter<'a> {
    config: &'a SmoothingConfig,
}

impl<'a> OutlierFilter<'a> {
    pub fn new(config: &'a SmoothingConfig) -> Self {
        Self { config }
    }

    /// Filters `variable` forward through `observations`.
    ///
    /// `state` is the variable's registry slot. An empty slot is seeded with the
    /// first value; an occupied one continues from its stored average. The
    /// average advances on every raw value, outliers included, but outliers are
    /// left out of the output.
    pub fn run(
        &self,
        variable: &str,
        observations: &[Observation],
        alpha: f64,
        state: &mut Option<EwmaFilterState>,
        now: DateTime<Utc>,
    ) -> Result<FilterOutcome, FilterError> {
        validate_alpha(alpha).map_err(|_| FilterError::InvalidAlpha { variable: variable.to_string(), alpha })?;

        let mut column = vec![None; observations.len()];
        let mut raw = Vec::with_capacity(observations.len());
        let mut filtered_data = Vec::with_capacity(observations.len());
        let mut removed_outliers = Vec::new();

        for (index, obs) in observations.iter().enumerate() {
            // JSON has no NaN or infinity, so a number here is always finite.
            let Some(x) = obs.numeric(variable) else { continue };
            let at = obs.timestamp().unwrap_or(now);

            // 1. Outlier test against prior raw points only
            let is_outlier = self.is_outlier(x, &raw);

            // 2. Advance the average regardless
            let smoothed = match state.as_mut() {
                Some(s) => {
                    s.alpha = alpha;
                    s.advance(x, at)
                }
                None => {
                    *state = Some(EwmaFilterState::seeded(alpha, x, at));
                    x
                }
            };
            raw.push(x);

            // 3. Emit
            if is_outlier {
                removed_outliers.push(index);
            } else {
                filtered_data.push(smoothed);
                column[index] = Some(smoothed);
            }
        }

        let original_variance = stats::variance(&raw);
        let filtered_variance = stats::variance(&filtered_data);
        let noise_reduction = if original_variance == 0.0 {
            0.0
        } else {
            (original_variance - filtered_variance) / original_variance
        };

        Ok(FilterOutcome {
            result: NoiseFilteringResult {
                variable: variable.to_string(),
                filtered_data,
                removed_outliers,
                smoothing_metrics: SmoothingMetrics { original_variance, filtered_variance, noise_reduction },
            },
            column,
        })
    }

    fn is_outlier(&self, x: f64, prior: &[f64]) -> bool {
        let start = prior.len().saturating_sub(self.config.window);
        let window = &prior[start..];
        if window.len() < self.config.min_window {
            return false;
        }
        stats::z_score(x, window).abs() > self.config.z_threshold
    }
}
