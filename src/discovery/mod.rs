//! Pairwise edge scoring, gating and the views built on the result.
pub mod edges;
pub mod error;
pub mod graph;
pub mod independence;
pub mod significance;
pub mod telemetry;

pub use edges::{DiscoveredEdges, EdgeDiscoverer, EdgeError};
pub use error::{DiscoveryError, DiscoveryResult};
pub use graph::{CausalGraph, GraphError};
pub use independence::{ConditionalIndependence, CorrelationProxy};
pub use significance::SignificanceFilter;
pub use telemetry::GateTelemetry;
