//! Per-variable numerical stages: smoothing, shrinkage and resampling.
pub mod bootstrap;
pub mod regularize;
pub mod sampling;
pub mod smoothing;
pub mod stats;

pub use bootstrap::{BootstrapError, BootstrapEstimator, BootstrapResult};
pub use regularize::{soft_threshold, Regularizer};
pub use smoothing::{FilterError, FilterOutcome, OutlierFilter};
pub use stats::pearson;
