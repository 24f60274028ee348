use crate::discovery::{CausalGraph, GateTelemetry};
use crate::store::{CausalDiscoveryResult, CausalEdge};
use std::fmt::Write;

/// Plain-text summary of one discovery run: surviving edges, intervals and
/// how the candidate pairs were pruned along the way.
pub fn format_report(result: &CausalDiscoveryResult) -> String {
    let mut out = String::new();
    let metrics = &result.discovery_metrics;

    let _ = writeln!(out, "CAUSAL DISCOVERY REPORT");
    let _ = writeln!(out, "--------------------------------------------------");
    let _ = writeln!(
        out,
        "Edges: {} raw, {} significant, {} filtered ({} ms)",
        metrics.total_edges,
        metrics.significant_edges,
        result.filtered_edges.len(),
        metrics.discovery_time_ms
    );
    let _ = writeln!(out, "Average confidence: {:.3}", metrics.average_confidence);

    let _ = writeln!(out, "\nFiltered edges:");
    if result.filtered_edges.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    let mut ranked: Vec<&CausalEdge> = result.filtered_edges.iter().collect();
    ranked.sort_by(|a, b| b.strength.total_cmp(&a.strength).then_with(|| (&a.from, &a.to).cmp(&(&b.from, &b.to))));
    for edge in ranked {
        let _ = writeln!(
            out,
            "  {} -> {}  strength={:.3} confidence={:.3} p={:.3}",
            edge.from, edge.to, edge.strength, edge.confidence, edge.p_value
        );
    }

    let graph = CausalGraph::from_edges(&result.filtered_edges);
    let mutual = graph.bidirectional_pairs();
    if !mutual.is_empty() {
        let _ = writeln!(out, "  Direction unresolved for:");
        for (a, b) in mutual {
            let _ = writeln!(out, "    {} <-> {}", a, b);
        }
    }

    let _ = writeln!(out, "\nConfidence intervals:");
    if result.confidence_intervals.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (name, ci) in &result.confidence_intervals {
        let _ = writeln!(out, "  {}: [{:.4}, {:.4}]", name, ci.lower, ci.upper);
    }

    let t = GateTelemetry::analyze(result);
    let _ = writeln!(out, "\nPruning:");
    let _ = writeln!(out, "  candidate pairs      {}", t.candidate_pairs);
    let _ = writeln!(out, "  below strength floor {}", t.pruned_by_strength);
    let _ = writeln!(out, "  loose gate           {}", t.pruned_by_loose_gate);
    let _ = writeln!(out, "  strict gate          {}", t.pruned_by_strict_gate);
    let _ = writeln!(
        out,
        "  strength bins        weak={} moderate={} strong={} very_strong={}",
        t.strength_bins.weak, t.strength_bins.moderate, t.strength_bins.strong, t.strength_bins.very_strong
    );
    out
}
