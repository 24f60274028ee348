//! The discovery pipeline and the state it owns.
//!
//! `CausalDiscoveryEngine` holds everything a run needs: configs, the
//! per-variable EWMA registry, the event bus and the independence test. Two
//! engines never share state, so one can be kept per tenant.
use super::cancel::CancellationToken;
use super::events::{DiscoveryEvent, EventBus};
use crate::analysis::{BootstrapEstimator, FilterError, FilterOutcome, OutlierFilter, Regularizer};
use crate::config::{BootstrapConfig, ConfigError, EngineConfig, RegularizationConfig, SignificanceConfig, SmoothingConfig};
use crate::discovery::{
    ConditionalIndependence, CorrelationProxy, DiscoveryError, DiscoveryResult, EdgeDiscoverer, SignificanceFilter,
};
use crate::store::{
    CausalDiscoveryResult, DiscoveryMetrics, EwmaFilterState, FilterRegistry, NoiseFilteringResult, Observation,
    SeriesFrame,
};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct CausalDiscoveryEngine {
    config: EngineConfig,
    filters: FilterRegistry,
    events: EventBus,
    independence: Box<dyn ConditionalIndependence>,
}

impl Default for CausalDiscoveryEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            filters: FilterRegistry::new(),
            events: EventBus::default(),
            independence: Box::new(CorrelationProxy),
        }
    }
}

impl CausalDiscoveryEngine {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, ..Self::default() })
    }

    /// Replaces the `1 − |r|` proxy with another independence test.
    pub fn with_independence_test(mut self, test: impl ConditionalIndependence + 'static) -> Self {
        self.independence = Box::new(test);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    // --- Configuration ---

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn set_regularization_config(&mut self, config: RegularizationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.regularization = config;
        Ok(())
    }

    pub fn set_bootstrap_config(&mut self, config: BootstrapConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.bootstrap = config;
        Ok(())
    }

    pub fn set_smoothing_config(&mut self, config: SmoothingConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.smoothing = config;
        Ok(())
    }

    pub fn set_significance_config(&mut self, config: SignificanceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.significance = config;
        Ok(())
    }

    // --- Filter state & events ---

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    pub fn filter_state(&self, variable: &str) -> Option<&EwmaFilterState> {
        self.filters.get(variable)
    }

    /// Forgets a variable's EWMA state; the next filter run reseeds it.
    pub fn reset_filter(&mut self, variable: &str) -> Option<EwmaFilterState> {
        self.filters.remove(variable)
    }

    /// Smooths one variable, updates its registry state and publishes the result.
    pub fn apply_filter(
        &mut self,
        observations: &[Observation],
        variable: &str,
        alpha: f64,
    ) -> Result<NoiseFilteringResult, FilterError> {
        let filter = OutlierFilter::new(&self.config.smoothing);
        let slot = self.filters.slot_mut(variable);
        let outcome = filter.run(variable, observations, alpha, slot, Utc::now())?;

        let result = outcome.result;
        debug!(
            variable,
            outliers = result.removed_outliers.len(),
            noise_reduction = result.smoothing_metrics.noise_reduction,
            "ewma filter applied"
        );
        self.events.publish(DiscoveryEvent::FilterApplied(Arc::new(result.clone())));
        Ok(result)
    }

    // --- Pipeline ---

    pub fn discover_causal_relationships(
        &mut self,
        observations: &[Observation],
        variables: &[String],
    ) -> DiscoveryResult<CausalDiscoveryResult> {
        self.discover_causal_relationships_with_cancel(observations, variables, &CancellationToken::new())
    }

    /// Runs the full pipeline:
    /// 1. smooth every variable and drop outliers
    /// 2. shrink the smoothed columns
    /// 3. bootstrap per-variable intervals
    /// 4. score every ordered pair
    /// 5. apply the loose gate, then the strict gate on what it kept
    ///
    /// The run is atomic. Registry updates and events are committed only once
    /// every stage has succeeded; on error the engine is left as it was.
    pub fn discover_causal_relationships_with_cancel(
        &mut self,
        observations: &[Observation],
        variables: &[String],
        cancel: &CancellationToken,
    ) -> DiscoveryResult<CausalDiscoveryResult> {
        let started = Instant::now();
        let variables = dedupe(variables)?;
        info!(variables = variables.len(), observations = observations.len(), "starting causal discovery");

        // 1. Smoothing on staged copies of the registry slots
        let (outcomes, staged) = self.filter_all(observations, &variables)?;
        let mut frame = SeriesFrame::new(observations.len());
        for (name, outcome) in variables.iter().zip(&outcomes) {
            if outcome.result.filtered_data.is_empty() {
                warn!(variable = name.as_str(), "no numeric values to analyse");
            }
            frame.insert(name, outcome.column.clone());
        }
        debug!(outliers = outcomes.iter().map(|o| o.result.removed_outliers.len()).sum::<usize>(), "smoothing done");

        // 2. Regularization
        Regularizer::new(&self.config.regularization).regularize(&mut frame, &variables);

        // 3. Bootstrap
        let bootstrap = BootstrapEstimator::new(&self.config.bootstrap).estimate(&frame, &variables)?;
        debug!(intervals = bootstrap.confidence_intervals.len(), skipped = bootstrap.skipped.len(), "bootstrap done");

        // 4. Pairwise edges
        let discovered = EdgeDiscoverer::new(&self.config.significance, &self.config.bootstrap, self.independence.as_ref())
            .discover(&frame, &variables, &bootstrap.confidence_intervals, cancel)?;

        // 5. Gates
        let gate = SignificanceFilter::new(&self.config.significance);
        let significant_edges = gate.loose_gate(&discovered.edges, self.config.bootstrap.confidence_level);
        let filtered_edges = gate.filter_significant(&significant_edges);

        let average_confidence = if significant_edges.is_empty() {
            0.0
        } else {
            significant_edges.iter().map(|e| e.confidence).sum::<f64>() / significant_edges.len() as f64
        };

        let result = CausalDiscoveryResult {
            discovery_metrics: DiscoveryMetrics {
                total_edges: discovered.edges.len(),
                significant_edges: significant_edges.len(),
                average_confidence,
                discovery_time_ms: started.elapsed().as_millis() as u64,
                candidate_pairs: discovered.candidate_pairs,
            },
            edges: discovered.edges,
            confidence_intervals: bootstrap.confidence_intervals,
            significant_edges,
            filtered_edges,
        };

        // Commit. Variables that never produced a value get no slot.
        let (live, states): (Vec<String>, Vec<EwmaFilterState>) = variables
            .iter()
            .zip(staged)
            .filter_map(|(name, state)| Some((name.clone(), state?)))
            .unzip();
        for (slot, state) in self.filters.slots_mut(&live).into_iter().zip(states) {
            *slot = Some(state);
        }
        debug!(tracked = self.filters.count(), "filter states committed");
        for outcome in outcomes {
            self.events.publish(DiscoveryEvent::FilterApplied(Arc::new(outcome.result)));
        }
        self.events.publish(DiscoveryEvent::DiscoveryCompleted(Arc::new(result.clone())));

        info!(
            total_edges = result.discovery_metrics.total_edges,
            significant_edges = result.discovery_metrics.significant_edges,
            filtered_edges = result.filtered_edges.len(),
            elapsed_ms = result.discovery_metrics.discovery_time_ms,
            "causal discovery completed"
        );
        Ok(result)
    }

    /// Filters every variable in parallel. Each worker owns a copy of its
    /// variable's state, so no two workers touch the same state.
    fn filter_all(
        &self,
        observations: &[Observation],
        variables: &[String],
    ) -> Result<(Vec<FilterOutcome>, Vec<Option<EwmaFilterState>>), FilterError> {
        let filter = OutlierFilter::new(&self.config.smoothing);
        let alpha = self.config.smoothing.alpha;
        let now = Utc::now();

        let mut staged: Vec<Option<EwmaFilterState>> =
            variables.iter().map(|v| self.filters.get(v).cloned()).collect();
        let outcomes = variables
            .par_iter()
            .zip(staged.par_iter_mut())
            .map(|(name, slot)| filter.run(name, observations, alpha, slot, now))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((outcomes, staged))
    }
}

/// Drops repeated names, keeping the first occurrence.
fn dedupe(variables: &[String]) -> DiscoveryResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(variables.len());
    for name in variables {
        if name.trim().is_empty() {
            return Err(DiscoveryError::Discovery("variable names must not be empty".into()));
        }
        if seen.insert(name.as_str()) {
            unique.push(name.clone());
        }
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::CausalGraph;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use tokio::sync::broadcast::error::TryRecvError;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// `b = 2a + noise`, `c` independent, each on its own level.
    fn scenario(n: usize, seed: u64) -> Vec<Observation> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let a = 10.0 + rng.gen_range(-3.0..3.0);
                let b = 2.0 * a + rng.gen_range(-0.5..0.5);
                let c = 50.0 + rng.gen_range(-3.0..3.0);
                Observation::new()
                    .with("A", a)
                    .with("B", b)
                    .with("C", c)
                    .with("source", format!("sensor-{}", i % 3))
            })
            .collect()
    }

    fn key(e: &crate::store::CausalEdge) -> (String, String) {
        (e.from.clone(), e.to.clone())
    }

    #[test]
    fn test_linked_pair_survives_and_noise_does_not() {
        let mut engine = CausalDiscoveryEngine::new();
        let result = engine.discover_causal_relationships(&scenario(200, 42), &names(&["A", "B", "C"])).unwrap();

        let ab = result.filtered_edges.iter()
            .find(|e| (e.from == "A" && e.to == "B") || (e.from == "B" && e.to == "A"))
            .expect("A-B edge must survive the strict gate");
        assert!(ab.strength > 0.5);
        assert!(ab.p_value < 0.05);

        assert!(!result.filtered_edges.iter()
            .any(|e| (e.from == "C" || e.to == "C") && e.p_value < 0.05));
        assert_eq!(result.confidence_intervals.len(), 3);
        assert_eq!(result.discovery_metrics.candidate_pairs, 6);
    }

    #[test]
    fn test_edge_sets_are_nested_and_loop_free() {
        let mut engine = CausalDiscoveryEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let observations: Vec<Observation> = (0..150)
            .map(|_| {
                let x = rng.gen_range(0.0..5.0);
                Observation::new()
                    .with("x", x)
                    .with("y", 3.0 * x + 20.0 + rng.gen_range(-1.0..1.0))
                    .with("z", -x + 40.0 + rng.gen_range(-2.0..2.0))
                    .with("w", rng.gen_range(0.0..1.0))
            })
            .collect();
        let result = engine.discover_causal_relationships(&observations, &names(&["x", "y", "z", "w"])).unwrap();

        let all: HashSet<_> = result.edges.iter().map(key).collect();
        let significant: HashSet<_> = result.significant_edges.iter().map(key).collect();
        let filtered: HashSet<_> = result.filtered_edges.iter().map(key).collect();
        assert!(filtered.is_subset(&significant));
        assert!(significant.is_subset(&all));

        for edge in result.edges.iter().chain(&result.significant_edges).chain(&result.filtered_edges) {
            assert!(!edge.is_self_loop());
            assert!((0.0..=1.0).contains(&edge.strength));
            assert!((0.0..=1.0).contains(&edge.confidence));
            assert!((0.0..=1.0).contains(&edge.p_value));
        }
        assert_eq!(result.discovery_metrics.total_edges, result.edges.len());
        assert_eq!(result.discovery_metrics.significant_edges, result.significant_edges.len());
    }

    #[test]
    fn test_empty_variable_list() {
        let mut engine = CausalDiscoveryEngine::new();
        let result = engine.discover_causal_relationships(&scenario(20, 1), &[]).unwrap();
        assert!(result.edges.is_empty());
        assert!(result.filtered_edges.is_empty());
        assert_eq!(result.discovery_metrics.average_confidence, 0.0);
        assert_eq!(result.discovery_metrics.candidate_pairs, 0);
    }

    #[test]
    fn test_average_confidence_over_significant_edges() {
        let mut engine = CausalDiscoveryEngine::new();
        let result = engine.discover_causal_relationships(&scenario(200, 8), &names(&["A", "B", "C"])).unwrap();
        let expected = result.significant_edges.iter().map(|e| e.confidence).sum::<f64>()
            / result.significant_edges.len() as f64;
        assert!((result.discovery_metrics.average_confidence - expected).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_same_edges() {
        let observations = scenario(150, 3);
        let vars = names(&["A", "B", "C"]);
        let scores = |r: CausalDiscoveryResult| -> Vec<(String, String, f64, f64, f64)> {
            r.edges.into_iter().map(|e| (e.from, e.to, e.strength, e.confidence, e.p_value)).collect()
        };

        let a = CausalDiscoveryEngine::new().discover_causal_relationships(&observations, &vars).unwrap();
        let b = CausalDiscoveryEngine::new().discover_causal_relationships(&observations, &vars).unwrap();
        assert_eq!(a.confidence_intervals, b.confidence_intervals);
        assert_eq!(scores(a), scores(b));
    }

    #[test]
    fn test_events_published_after_success() {
        let mut engine = CausalDiscoveryEngine::new();
        let mut rx = engine.subscribe();
        engine.discover_causal_relationships(&scenario(120, 2), &names(&["A", "B"])).unwrap();

        let received: Vec<&'static str> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.name()).collect();
        assert_eq!(received, vec!["ewma-filter-applied", "ewma-filter-applied", "causal-discovery-completed"]);
    }

    #[test]
    fn test_failed_run_publishes_nothing_and_keeps_state() {
        let mut engine = CausalDiscoveryEngine::new();
        let mut rx = engine.subscribe();
        // Sums overflow, so the resampled means are not finite.
        let observations: Vec<Observation> = (0..150).map(|_| Observation::new().with("huge", 1e308).with("other", 1.0)).collect();

        let err = engine
            .discover_causal_relationships(&observations, &names(&["huge", "other"]))
            .unwrap_err();
        assert!(err.to_string().starts_with("Bootstrap analysis failed"), "{err}");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(engine.filter_state("huge").is_none());
        assert!(engine.filter_state("other").is_none());
    }

    #[test]
    fn test_cancelled_run() {
        let mut engine = CausalDiscoveryEngine::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine
            .discover_causal_relationships_with_cancel(&scenario(120, 4), &names(&["A", "B"]), &cancel)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Cancelled));
        assert!(engine.filter_state("A").is_none());
    }

    #[test]
    fn test_state_committed_and_resettable() {
        let mut engine = CausalDiscoveryEngine::new();
        engine.discover_causal_relationships(&scenario(120, 6), &names(&["A", "B"])).unwrap();
        assert!(engine.filter_state("A").is_some());
        assert!(engine.filter_state("C").is_none());

        let removed = engine.reset_filter("A");
        assert!(removed.is_some());
        assert!(engine.filter_state("A").is_none());
    }

    #[test]
    fn test_registry_does_not_grow_across_resets() {
        let mut engine = CausalDiscoveryEngine::new();
        let observations = scenario(120, 11);
        for _ in 0..3 {
            engine.discover_causal_relationships(&observations, &names(&["A", "B", "missing"])).unwrap();
            engine.reset_filter("A");
        }
        assert_eq!(engine.filters.names, names(&["A", "B"]));
        assert!(engine.filter_state("A").is_none());
        assert!(engine.filter_state("B").is_some());
    }

    #[test]
    fn test_result_json_round_trip() {
        let mut engine = CausalDiscoveryEngine::new();
        let result = engine.discover_causal_relationships(&scenario(150, 12), &names(&["A", "B", "C"])).unwrap();
        assert!(!result.edges.is_empty());

        let json = result.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["edges"][0]["type"], "direct");
        assert!(value["confidence_intervals"]["A"]["lower"].is_number());

        let restored: CausalDiscoveryResult = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.edges.len(), result.edges.len());
        assert_eq!(restored.filtered_edges.len(), result.filtered_edges.len());
        assert_eq!(restored.discovery_metrics.candidate_pairs, result.discovery_metrics.candidate_pairs);
        for (name, ci) in &result.confidence_intervals {
            let back = restored.confidence_intervals[name];
            assert!((back.lower - ci.lower).abs() < 1e-9 && (back.upper - ci.upper).abs() < 1e-9);
        }
        for (a, b) in restored.edges.iter().zip(&result.edges) {
            assert_eq!((&a.from, &a.to, a.timestamp), (&b.from, &b.to, b.timestamp));
            assert!((a.strength - b.strength).abs() < 1e-12);
            assert!((a.p_value - b.p_value).abs() < 1e-12);
        }
    }

    #[test]
    fn test_engines_can_share_one_bus() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut first = CausalDiscoveryEngine::new().with_event_bus(bus.clone());
        let mut second = CausalDiscoveryEngine::new().with_event_bus(bus);

        let observations: Vec<Observation> = (0..10).map(|i| Observation::new().with("x", i as f64)).collect();
        first.apply_filter(&observations, "x", 0.5).unwrap();
        second.apply_filter(&observations, "x", 0.5).unwrap();

        let received: Vec<&'static str> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.name()).collect();
        assert_eq!(received, vec!["ewma-filter-applied", "ewma-filter-applied"]);
        // Shared bus, separate filter state.
        assert_eq!(
            first.filter_state("x").unwrap().current_value,
            second.filter_state("x").unwrap().current_value
        );
        first.reset_filter("x");
        assert!(second.filter_state("x").is_some());
    }

    #[test]
    fn test_duplicate_and_unknown_variables() {
        let mut engine = CausalDiscoveryEngine::new();
        let result = engine
            .discover_causal_relationships(&scenario(150, 7), &names(&["A", "B", "A", "source", "missing"]))
            .unwrap();

        // A, B, source, missing -> 12 ordered pairs; only A/B carry numbers.
        assert_eq!(result.discovery_metrics.candidate_pairs, 12);
        assert!(!result.confidence_intervals.contains_key("source"));
        assert!(!result.confidence_intervals.contains_key("missing"));
        assert!(result.edges.iter().all(|e| ["A", "B"].contains(&e.from.as_str())));
    }

    #[test]
    fn test_empty_variable_name_is_rejected() {
        let mut engine = CausalDiscoveryEngine::new();
        let err = engine.discover_causal_relationships(&scenario(10, 1), &names(&["A", " "])).unwrap_err();
        assert!(err.to_string().starts_with("Causal discovery failed"));
    }

    #[test]
    fn test_apply_filter_updates_state_and_notifies() {
        let mut engine = CausalDiscoveryEngine::new();
        let mut rx = engine.subscribe();
        let observations: Vec<Observation> = (0..30).map(|i| Observation::new().with("A", i as f64)).collect();

        let result = engine.apply_filter(&observations, "A", 0.4).unwrap();
        assert_eq!(result.variable, "A");
        assert_eq!(engine.filter_state("A").unwrap().alpha, 0.4);
        assert_eq!(
            engine.filter_state("A").unwrap().current_value,
            *result.filtered_data.last().unwrap()
        );
        match rx.try_recv().unwrap() {
            DiscoveryEvent::FilterApplied(r) => assert_eq!(*r, result),
            other => panic!("unexpected event {}", other.name()),
        }

        assert!(engine.apply_filter(&observations, "A", 1.5).is_err());
    }

    #[test]
    fn test_apply_filter_treats_nan_as_missing() {
        let mut engine = CausalDiscoveryEngine::new();
        let observations: Vec<Observation> = (0..10)
            .map(|i| Observation::new().with("x", if i == 5 { f64::NAN } else { i as f64 }))
            .collect();

        let result = engine.apply_filter(&observations, "x", 0.5).unwrap();
        assert_eq!(result.filtered_data.len(), 9);
        assert!(!result.removed_outliers.contains(&5));
        assert!(result.filtered_data.iter().all(|v| v.is_finite()));
        assert!(engine.filter_state("x").unwrap().current_value.is_finite());
    }

    #[test]
    fn test_config_setters_reject_eagerly() {
        let mut engine = CausalDiscoveryEngine::new();
        let bad = BootstrapConfig { confidence_level: 1.2, ..Default::default() };
        assert!(engine.set_bootstrap_config(bad).is_err());
        assert_eq!(engine.config().bootstrap, BootstrapConfig::default());

        let good = BootstrapConfig { num_samples: 200, ..Default::default() };
        engine.set_bootstrap_config(good.clone()).unwrap();
        assert_eq!(engine.config().bootstrap, good);

        assert!(engine.set_regularization_config(RegularizationConfig { learning_rate: 0.0, ..Default::default() }).is_err());
        assert!(engine.set_smoothing_config(SmoothingConfig { z_threshold: -1.0, ..Default::default() }).is_err());
        assert!(engine.set_significance_config(SignificanceConfig { max_p_value: 2.0, ..Default::default() }).is_err());
        assert!(CausalDiscoveryEngine::with_config(EngineConfig { bootstrap: BootstrapConfig { sample_size: 0, ..Default::default() }, ..Default::default() }).is_err());
    }

    #[test]
    fn test_independent_engines_do_not_share_state() {
        let mut first = CausalDiscoveryEngine::new();
        let second = CausalDiscoveryEngine::new();
        first.apply_filter(&scenario(10, 1), "A", 0.5).unwrap();
        assert!(first.filter_state("A").is_some());
        assert!(second.filter_state("A").is_none());
    }

    #[test]
    fn test_filtered_edges_feed_graph_view() {
        let mut engine = CausalDiscoveryEngine::new();
        let result = engine.discover_causal_relationships(&scenario(200, 42), &names(&["A", "B", "C"])).unwrap();
        let graph = CausalGraph::from_edges(&result.filtered_edges);
        assert!(graph.edge("A", "B").is_some() || graph.edge("B", "A").is_some());
        assert!(graph.parents("C").is_empty());
    }
}
