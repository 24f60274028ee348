//! The orchestrating engine and its run-scoped plumbing.
pub mod cancel;
pub mod events;
pub mod orchestrator;

pub use cancel::CancellationToken;
pub use events::{DiscoveryEvent, EventBus, DEFAULT_EVENT_CAPACITY};
pub use orchestrator::CausalDiscoveryEngine;
