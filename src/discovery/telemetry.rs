use crate::store::CausalDiscoveryResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrengthBins {
    /// (0.1, 0.3]: barely above the discovery floor.
    pub weak: usize,
    /// (0.3, 0.5]
    pub moderate: usize,
    /// (0.5, 0.8]
    pub strong: usize,
    /// Above 0.8.
    pub very_strong: usize,
}

/// How the candidate pairs of one run were thinned out gate by gate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateTelemetry {
    pub candidate_pairs: usize,
    pub pruned_by_strength: usize,
    pub pruned_by_loose_gate: usize,
    pub pruned_by_strict_gate: usize,
    /// Histogram over the raw edge list.
    pub strength_bins: StrengthBins,
    /// Mean p-value over the raw edge list; 0 when it is empty.
    pub mean_p_value: f64,
}

impl GateTelemetry {
    pub fn analyze(result: &CausalDiscoveryResult) -> Self {
        let raw = result.edges.len();
        let loose = result.significant_edges.len();
        let strict = result.filtered_edges.len();

        let mut bins = StrengthBins::default();
        for edge in &result.edges {
            match edge.strength {
                s if s > 0.8 => bins.very_strong += 1,
                s if s > 0.5 => bins.strong += 1,
                s if s > 0.3 => bins.moderate += 1,
                _ => bins.weak += 1,
            }
        }

        let mean_p_value = if raw > 0 {
            result.edges.iter().map(|e| e.p_value).sum::<f64>() / raw as f64
        } else {
            0.0
        };

        Self {
            candidate_pairs: result.discovery_metrics.candidate_pairs,
            pruned_by_strength: result.discovery_metrics.candidate_pairs.saturating_sub(raw),
            pruned_by_loose_gate: raw.saturating_sub(loose),
            pruned_by_strict_gate: loose.saturating_sub(strict),
            strength_bins: bins,
            mean_p_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CausalEdge, DiscoveryMetrics, EdgeType};
    use chrono::Utc;

    fn edge(strength: f64, p_value: f64) -> CausalEdge {
        CausalEdge {
            from: "a".into(),
            to: "b".into(),
            edge_type: EdgeType::Direct,
            strength,
            confidence: 0.9,
            p_value,
            bootstrap_samples: 10,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_counts_per_gate() {
        let edges = vec![edge(0.95, 0.0), edge(0.6, 0.02), edge(0.4, 0.1), edge(0.2, 0.5)];
        let result = CausalDiscoveryResult {
            significant_edges: edges[..2].to_vec(),
            filtered_edges: edges[..1].to_vec(),
            edges,
            discovery_metrics: DiscoveryMetrics { candidate_pairs: 12, ..Default::default() },
            ..Default::default()
        };

        let t = GateTelemetry::analyze(&result);
        assert_eq!(t.candidate_pairs, 12);
        assert_eq!(t.pruned_by_strength, 8);
        assert_eq!(t.pruned_by_loose_gate, 2);
        assert_eq!(t.pruned_by_strict_gate, 1);
        assert_eq!(t.strength_bins, StrengthBins { weak: 1, moderate: 1, strong: 1, very_strong: 1 });
        assert!((t.mean_p_value - 0.155).abs() < 1e-12);
    }

    #[test]
    fn test_empty_result() {
        let t = GateTelemetry::analyze(&CausalDiscoveryResult::default());
        assert_eq!(t, GateTelemetry::default());
    }
}
