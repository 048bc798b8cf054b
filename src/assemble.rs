//! Joins per-edge scores back onto the network edges.

use crate::aggregate::EdgeUsageAccumulator;
use crate::graph::{EdgeKey, NetworkGraph};
use geo::geometry::LineString;
use petgraph::prelude::*;
use std::collections::HashMap;

/// One network edge with its centrality score.
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityRow {
    pub edge_key: EdgeKey,
    pub osmid: String,
    pub geom: LineString<f64>,
    pub centrality: f64,
}

/// Centrality for every edge of a network, in graph edge order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentralityTable {
    rows: Vec<CentralityRow>,
    lookup: HashMap<EdgeKey, usize>,
}

impl CentralityTable {
    fn join(graph: &NetworkGraph, score: impl Fn(&EdgeKey) -> f64) -> Self {
        let mut rows = Vec::with_capacity(graph.edge_count());
        let mut lookup = HashMap::with_capacity(graph.edge_count());
        for edge_ref in graph.graph.edge_references() {
            let edge_payload = edge_ref.weight();
            let edge_key = edge_payload.edge_key();
            lookup.insert(edge_key, rows.len());
            rows.push(CentralityRow {
                edge_key,
                osmid: edge_payload.osmid.clone(),
                geom: edge_payload.geom.clone(),
                centrality: score(&edge_key),
            });
        }
        Self { rows, lookup }
    }

    /// Sampled centrality: the number of routes using each edge.
    pub fn from_usage(usage: &EdgeUsageAccumulator, graph: &NetworkGraph) -> Self {
        Self::join(graph, |edge_key| usage.get(edge_key) as f64)
    }

    /// Exact centrality from precomputed per-edge betweenness.
    pub fn from_betweenness(scores: &HashMap<EdgeKey, f64>, graph: &NetworkGraph) -> Self {
        Self::join(graph, |edge_key| scores.get(edge_key).copied().unwrap_or(0.0))
    }

    pub fn rows(&self) -> &[CentralityRow] {
        &self.rows
    }

    pub fn get(&self, edge_key: &EdgeKey) -> Option<&CentralityRow> {
        self.lookup.get(edge_key).map(|row_idx| &self.rows[*row_idx])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|row| row.centrality).sum()
    }

    /// Rows with a score above zero.
    pub fn nonzero(&self) -> impl Iterator<Item = &CentralityRow> {
        self.rows.iter().filter(|row| row.centrality > 0.0)
    }

    pub fn centralities(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.centrality).collect()
    }
}
