//! Robust causal discovery over multivariate time-ordered observations.
//!
//! A run smooths each variable with an EWMA filter (dropping Z-score
//! outliers), shrinks small deviations with an L1 soft-threshold, bootstraps
//! an interval for every variable mean, and scores every ordered pair of
//! variables. Edges are then passed through a loose diagnostic gate and a
//! strict gate.
//!
//! ```no_run
//! use robust_causal_core::{CausalDiscoveryEngine, Observation};
//!
//! let observations: Vec<Observation> = (0..200)
//!     .map(|i| Observation::new().with("load", i as f64).with("latency", 2.0 * i as f64))
//!     .collect();
//! let mut engine = CausalDiscoveryEngine::new();
//! let result = engine
//!     .discover_causal_relationships(&observations, &["load".into(), "latency".into()])
//!     .unwrap();
//! println!("{}", robust_causal_core::display::format_report(&result));
//! ```

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod display;
pub mod engine;
pub mod store;

pub use config::{BootstrapConfig, ConfigError, EngineConfig, RegularizationConfig, SignificanceConfig, SmoothingConfig};
pub use discovery::{CausalGraph, ConditionalIndependence, CorrelationProxy, DiscoveryError, DiscoveryResult, GateTelemetry};
pub use engine::{CancellationToken, CausalDiscoveryEngine, DiscoveryEvent, EventBus};
pub use store::{
    CausalDiscoveryResult, CausalEdge, ConfidenceInterval, DiscoveryMetrics, EdgeType, EwmaFilterState,
    NoiseFilteringResult, Observation, SmoothingMetrics,
};
