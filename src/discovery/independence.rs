//! Pluggable conditional-independence scoring.
//!
//! Strength is `|r| × (1 − independence)`. The default proxy derives
//! independence from the same correlation (`1 − |r|`); a real partial
//! correlation or conditioning-set test can be dropped in behind the trait
//! without touching the rest of the pipeline.
use crate::store::SeriesFrame;

pub trait ConditionalIndependence: Send + Sync {
    /// Degree in [0, 1] to which `from` and `to` look independent.
    ///
    /// `correlation` is the Pearson coefficient already computed for the pair.
    fn independence(&self, frame: &SeriesFrame, from: &str, to: &str, correlation: f64) -> f64;

    fn name(&self) -> &'static str;
}

/// `1 − |r|`: the placeholder proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationProxy;

impl ConditionalIndependence for CorrelationProxy {
    fn independence(&self, _frame: &SeriesFrame, _from: &str, _to: &str, correlation: f64) -> f64 {
        (1.0 - correlation.abs()).clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str { "correlation-proxy" }
}
