use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Dense handle into the [`FilterRegistry`](super::FilterRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl VariableId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }

    /// # Panics
    /// When `idx` does not fit in a `u32`.
    pub fn new(idx: usize) -> Self {
        Self(u32::try_from(idx).expect("variable index exceeds u32::MAX"))
    }
}

/// A single time-ordered record. Only JSON numbers take part in discovery;
/// strings, booleans and nested values are carried but ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation {
    pub fields: Map<String, Value>,
}

impl Observation {
    pub const TIMESTAMP_FIELD: &'static str = "timestamp";

    pub fn new() -> Self { Self::default() }

    /// Sets a field. NaN and ±∞ have no JSON form and are stored as `null`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The numeric value of `name`, if present and a JSON number.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Observation time from an RFC 3339 string or epoch milliseconds.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self.fields.get(Self::TIMESTAMP_FIELD)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Observation {
    fn from(fields: Map<String, Value>) -> Self { Self { fields } }
}

/// Running EWMA state for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EwmaFilterState {
    pub alpha: f64,
    pub current_value: f64,
    pub last_updated: DateTime<Utc>,
}

impl EwmaFilterState {
    /// Seeds the average with the first observed value.
    pub fn seeded(alpha: f64, first_value: f64, at: DateTime<Utc>) -> Self {
        Self { alpha, current_value: first_value, last_updated: at }
    }

    #[inline]
    pub fn advance(&mut self, value: f64, at: DateTime<Utc>) -> f64 {
        self.current_value = self.alpha * value + (1.0 - self.alpha) * self.current_value;
        self.last_updated = at;
        self.current_value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothingMetrics {
    pub original_variance: f64,
    pub filtered_variance: f64,
    /// `(original - filtered) / original`, or 0 when the input has no variance.
    pub noise_reduction: f64,
}

/// Output of the smoothing stage for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseFilteringResult {
    pub variable: String,
    /// Smoothed values of the accepted points, in input order.
    pub filtered_data: Vec<f64>,
    /// Positions in the observation slice rejected as outliers.
    pub removed_outliers: Vec<usize>,
    pub smoothing_metrics: SmoothingMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Direct,
}

/// A scored, directed candidate relationship. Never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub strength: f64,
    pub confidence: f64,
    pub p_value: f64,
    pub bootstrap_samples: usize,
    pub timestamp: DateTime<Utc>,
}

impl CausalEdge {
    pub fn is_self_loop(&self) -> bool { self.from == self.to }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64) -> Self { Self { lower, upper } }

    pub fn width(&self) -> f64 { (self.upper - self.lower).max(0.0) }

    pub fn contains(&self, x: f64) -> bool { self.lower <= x && x <= self.upper }

    /// Share of the narrower interval covered by the intersection, in [0, 1].
    ///
    /// Containment counts as full overlap. A zero-width interval overlaps fully
    /// when its point lies inside the other interval and not at all otherwise.
    pub fn overlap(&self, other: &Self) -> f64 {
        let narrow = self.width().min(other.width());
        if narrow == 0.0 {
            let (point, wide) = if self.width() == 0.0 { (self, other) } else { (other, self) };
            return if wide.contains(point.lower) { 1.0 } else { 0.0 };
        }
        let intersection = (self.upper.min(other.upper) - self.lower.max(other.lower)).max(0.0);
        (intersection / narrow).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMetrics {
    pub total_edges: usize,
    pub significant_edges: usize,
    /// Mean confidence over the significant edges; 0 when there are none.
    pub average_confidence: f64,
    pub discovery_time_ms: u64,
    /// Ordered pairs scored before the strength gate.
    pub candidate_pairs: usize,
}

/// The complete output of one discovery run. Superseded, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalDiscoveryResult {
    pub edges: Vec<CausalEdge>,
    pub confidence_intervals: BTreeMap<String, ConfidenceInterval>,
    pub significant_edges: Vec<CausalEdge>,
    pub filtered_edges: Vec<CausalEdge>,
    pub discovery_metrics: DiscoveryMetrics,
}

impl CausalDiscoveryResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
