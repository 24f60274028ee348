//! Fire-and-forget progress events.
//!
//! Delivery is at-most-once: nobody listening is fine, a receiver that falls
//! more than `capacity` events behind loses the oldest ones, and there is no
//! replay for late subscribers.
use crate::store::{CausalDiscoveryResult, NoiseFilteringResult};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    FilterApplied(Arc<NoiseFilteringResult>),
    DiscoveryCompleted(Arc<CausalDiscoveryResult>),
}

impl DiscoveryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DiscoveryEvent::FilterApplied(_) => "ewma-filter-applied",
            DiscoveryEvent::DiscoveryCompleted(_) => "causal-discovery-completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DiscoveryEvent>,
}

impl Default for EventBus {
    fn default() -> Self { Self::new(DEFAULT_EVENT_CAPACITY) }
}

impl EventBus {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.tx.subscribe()
    }

    /// Returns how many subscribers the event reached; 0 with no subscribers.
    pub fn publish(&self, event: DiscoveryEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
