//! Edge gates.
//!
//! Two gates run after scoring:
//! - the loose gate (`p < 1 − confidence_level`, `confidence > loose_min_confidence`)
//!   produces the diagnostic `significant_edges` set;
//! - the strict gate below is the authoritative one for `filtered_edges`.
use crate::config::SignificanceConfig;
use crate::store::CausalEdge;

pub struct SignificanceFilter<'a> {
    config: &'a SignificanceConfig,
}

impl<'a> SignificanceFilter<'a> {
    pub fn new(config: &'a SignificanceConfig) -> Self {
        Self { config }
    }

    /// True when an edge is worth surfacing: no self-loop, and strength,
    /// confidence and p-value all clear their thresholds.
    pub fn passes(&self, edge: &CausalEdge) -> bool {
        !edge.is_self_loop()
            && edge.strength >= self.config.min_strength
            && edge.confidence >= self.config.min_confidence
            && edge.p_value <= self.config.max_p_value
    }

    pub fn filter_significant(&self, edges: &[CausalEdge]) -> Vec<CausalEdge> {
        edges.iter().filter(|e| self.passes(e)).cloned().collect()
    }

    pub fn passes_loose(&self, edge: &CausalEdge, confidence_level: f64) -> bool {
        !edge.is_self_loop()
            && edge.p_value < 1.0 - confidence_level
            && edge.confidence > self.config.loose_min_confidence
    }

    pub fn loose_gate(&self, edges: &[CausalEdge], confidence_level: f64) -> Vec<CausalEdge> {
        edges.iter().filter(|e| self.passes_loose(e, confidence_level)).cloned().collect()
    }
}
