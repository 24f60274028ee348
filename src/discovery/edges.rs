//! Pairwise edge scoring.
//!
//! Every ordered pair `(from, to)` with `from != to` is scored independently:
//! - strength: `|r| × (1 − independence)`, clamped to [0, 1]
//! - confidence: `1 − overlap` of the two bootstrap intervals
//! - p-value: share of shuffles of `to` whose `|r|` reaches the observed one
//!
//! Pairs run on the rayon pool; the output keeps pair order.
use super::independence::ConditionalIndependence;
use crate::analysis::{sampling, stats};
use crate::config::{BootstrapConfig, SignificanceConfig};
use crate::engine::cancel::CancellationToken;
use crate::store::{CausalEdge, ConfidenceInterval, EdgeType, SeriesFrame};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EdgeError {
    #[error("cancelled before all pairs were scored")]
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredEdges {
    /// Edges above the minimum strength, in pair order.
    pub edges: Vec<CausalEdge>,
    pub candidate_pairs: usize,
}

pub struct EdgeDiscoverer<'a> {
    significance: &'a SignificanceConfig,
    bootstrap: &'a BootstrapConfig,
    independence: &'a dyn ConditionalIndependence,
}

impl<'a> EdgeDiscoverer<'a> {
    pub fn new(
        significance: &'a SignificanceConfig,
        bootstrap: &'a BootstrapConfig,
        independence: &'a dyn ConditionalIndependence,
    ) -> Self {
        Self { significance, bootstrap, independence }
    }

    pub fn discover(
        &self,
        frame: &SeriesFrame,
        variables: &[String],
        intervals: &BTreeMap<String, ConfidenceInterval>,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredEdges, EdgeError> {
        let pairs: Vec<(&String, &String)> = variables.iter()
            .flat_map(|from| variables.iter().map(move |to| (from, to)))
            .filter(|(from, to)| from != to)
            .collect();
        let now = Utc::now();

        let scored = pairs
            .par_iter()
            .map(|&(from, to)| {
                if cancel.is_cancelled() {
                    return Err(EdgeError::Cancelled);
                }
                Ok(self.score_pair(frame, from, to, intervals, now))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DiscoveredEdges {
            edges: scored.into_iter().flatten().collect(),
            candidate_pairs: pairs.len(),
        })
    }

    /// Scores one pair, or `None` if it falls at or below the strength floor.
    /// The permutation test only runs for pairs that survive the floor.
    fn score_pair(
        &self,
        frame: &SeriesFrame,
        from: &str,
        to: &str,
        intervals: &BTreeMap<String, ConfidenceInterval>,
        now: DateTime<Utc>,
    ) -> Option<CausalEdge> {
        let (xs, ys) = frame.paired(from, to);
        let r = stats::pearson(&xs, &ys);
        let independence = self.independence.independence(frame, from, to, r).clamp(0.0, 1.0);
        let strength = (r.abs() * (1.0 - independence)).clamp(0.0, 1.0);
        if strength <= self.significance.discovery_min_strength {
            return None;
        }

        let confidence = interval_confidence(
            intervals.get(from),
            intervals.get(to),
            self.significance.missing_interval_confidence,
        );

        let mut rng = sampling::rng_for(self.bootstrap.random_seed, ("permutation", from, to));
        let p_value = permutation_p_value(&xs, &ys, self.significance.permutations, &mut rng);

        Some(CausalEdge {
            from: from.to_string(),
            to: to.to_string(),
            edge_type: EdgeType::Direct,
            strength,
            confidence,
            p_value,
            bootstrap_samples: self.bootstrap.num_samples,
            timestamp: now,
        })
    }
}

/// `1 − overlap(a, b)`, or `missing` when either interval is unknown.
pub fn interval_confidence(
    a: Option<&ConfidenceInterval>,
    b: Option<&ConfidenceInterval>,
    missing: f64,
) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => (1.0 - a.overlap(b)).clamp(0.0, 1.0),
        _ => missing,
    }
}

/// Share of `permutations` shuffles of `y` whose `|r|` with `x` is at least
/// the observed `|r|`.
pub fn permutation_p_value<R: Rng + ?Sized>(x: &[f64], y: &[f64], permutations: usize, rng: &mut R) -> f64 {
    if permutations == 0 {
        return 1.0;
    }
    let observed = stats::pearson(x, y).abs();
    let mut shuffled = y.to_vec();
    let mut at_least_as_strong = 0usize;
    for _ in 0..permutations {
        shuffled.shuffle(rng);
        if stats::pearson(x, &shuffled).abs() >= observed {
            at_least_as_strong += 1;
        }
    }
    at_least_as_strong as f64 / permutations as f64
}
