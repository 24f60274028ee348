//! graph.rs
//! Directed graph view over an edge set, for consumers that walk the result.
//!
//! Correlation is symmetric, so pairwise discovery usually reports both
//! `a -> b` and `b -> a`. The view keeps both and exposes them through
//! `bidirectional_pairs`; a topological order exists only once such pairs
//! have been resolved by the caller.

use crate::store::CausalEdge;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Cycle detected involving '{0}'")]
    Cycle(String),
}

#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    graph: DiGraph<String, CausalEdge>,
    index: HashMap<String, NodeIndex>,
}

impl CausalGraph {
    pub fn from_edges(edges: &[CausalEdge]) -> Self {
        let mut g = Self::default();
        for edge in edges {
            let from = g.node(&edge.from);
            let to = g.node(&edge.to);
            g.graph.add_edge(from, to, edge.clone());
        }
        g
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    pub fn edge(&self, from: &str, to: &str) -> Option<&CausalEdge> {
        let (a, b) = (*self.index.get(from)?, *self.index.get(to)?);
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// Variables with an edge into `name`, strongest first.
    pub fn parents(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Incoming)
    }

    /// Variables `name` has an edge into, strongest first.
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Outgoing)
    }

    fn neighbours(&self, name: &str, dir: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else { return Vec::new() };
        let mut found: Vec<(&str, f64)> = self.graph.edges_directed(idx, dir)
            .map(|e| {
                let other = if dir == Direction::Incoming { e.source() } else { e.target() };
                (self.graph[other].as_str(), e.weight().strength)
            })
            .collect();
        found.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        found.into_iter().map(|(n, _)| n).collect()
    }

    /// Unordered pairs reported in both directions, each listed once.
    pub fn bidirectional_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self.graph.edge_references()
            .filter(|e| e.source() < e.target() && self.graph.find_edge(e.target(), e.source()).is_some())
            .map(|e| (self.graph[e.source()].as_str(), self.graph[e.target()].as_str()))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Causes before effects. Fails on the first cycle found.
    pub fn topological_order(&self) -> Result<Vec<&str>, GraphError> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|i| self.graph[i].as_str()).collect())
            .map_err(|cycle| GraphError::Cycle(self.graph[cycle.node_id()].clone()))
    }
}
