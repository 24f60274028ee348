//! L1 shrinkage of small deviations before relationship estimation.
use super::stats;
use crate::config::RegularizationConfig;
use crate::store::SeriesFrame;

/// The soft-thresholding operator `sign(x)·max(|x| − λ, 0)`.
#[inline(always)]
pub fn soft_threshold(x: f64, lambda: f64) -> f64 {
    x.signum() * (x.abs() - lambda).max(0.0)
}

pub struct Regularizer<'a> {
    config: &'a RegularizationConfig,
}

impl<'a> Regularizer<'a> {
    pub fn new(config: &'a RegularizationConfig) -> Self {
        Self { config }
    }

    /// Centres each column on its mean, soft-thresholds the deviations and
    /// restores the mean. Absent cells stay absent; columns without any
    /// numeric value are left untouched.
    pub fn regularize(&self, frame: &mut SeriesFrame, variables: &[String]) {
        let lambda = self.config.l1_lambda;
        for name in variables {
            let values = frame.values(name);
            if values.is_empty() {
                continue;
            }
            let centre = stats::mean(&values);
            if let Some(column) = frame.column_mut(name) {
                for cell in column.iter_mut().flatten() {
                    *cell = centre + soft_threshold(*cell - centre, lambda);
                }
            }
        }
    }
}
