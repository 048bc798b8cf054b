//! Exact shortest-path edge betweenness over the street network.

use crate::config::RouteMetric;
use crate::graph::{EdgeKey, NetworkGraph};
use atomic_float::AtomicF64;
use petgraph::graph::NodeIndex;
use petgraph::prelude::*;
use petgraph::Direction;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::Ordering as AtomicOrdering;

/// Directed node pair with the minimum usable weight over its parallel edges.
struct NodePair {
    target: usize,
    weight: f64,
}

struct NodeDistance {
    node_idx: usize,
    metric: f64,
}

impl PartialOrd for NodeDistance {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.metric.partial_cmp(&self.metric)
    }
}

impl Ord for NodeDistance {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

impl PartialEq for NodeDistance {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.node_idx == other.node_idx && (self.metric - other.metric).abs() < f64::EPSILON
    }
}

impl Eq for NodeDistance {}

/// Outgoing node pairs per node, self-loops and unusable edges excluded.
/// Each pair gets a slot index into the shared accumulator.
fn collapse_pairs(graph: &NetworkGraph, metric: RouteMetric) -> (Vec<Vec<(usize, NodePair)>>, usize) {
    let mut adjacency = Vec::with_capacity(graph.node_count());
    let mut slot = 0;
    for node_idx in graph.graph.node_indices() {
        let mut pairs: Vec<(usize, NodePair)> = Vec::new();
        for nb_idx in graph.graph.neighbors_directed(node_idx, Direction::Outgoing) {
            if nb_idx == node_idx || pairs.iter().any(|(_, p)| p.target == nb_idx.index()) {
                continue;
            }
            if let Some(edge_ref) = graph.min_weight_edge(node_idx, nb_idx, metric) {
                if let Some(weight) = edge_ref.weight().weight(metric) {
                    pairs.push((
                        slot,
                        NodePair {
                            target: nb_idx.index(),
                            weight,
                        },
                    ));
                    slot += 1;
                }
            }
        }
        adjacency.push(pairs);
    }
    (adjacency, slot)
}

/// Accumulates the pair dependencies of all shortest paths leaving `src_idx`.
fn accumulate_source(src_idx: usize, adjacency: &[Vec<(usize, NodePair)>], pair_scores: &[AtomicF64]) {
    let node_count = adjacency.len();
    let mut dist = vec![f64::INFINITY; node_count];
    let mut sigma = vec![0.0_f64; node_count];
    let mut settled = vec![false; node_count];
    // predecessor node and pair slot
    let mut preds: Vec<Vec<(usize, usize)>> = vec![Vec::new(); node_count];
    let mut order: Vec<usize> = Vec::new();
    dist[src_idx] = 0.0;
    sigma[src_idx] = 1.0;
    let mut active = BinaryHeap::new();
    active.push(NodeDistance {
        node_idx: src_idx,
        metric: 0.0,
    });
    while let Some(NodeDistance { node_idx, .. }) = active.pop() {
        if settled[node_idx] {
            continue;
        }
        settled[node_idx] = true;
        order.push(node_idx);
        for (slot, pair) in adjacency[node_idx].iter() {
            if settled[pair.target] {
                continue;
            }
            let candidate = dist[node_idx] + pair.weight;
            if candidate < dist[pair.target] {
                dist[pair.target] = candidate;
                sigma[pair.target] = sigma[node_idx];
                preds[pair.target].clear();
                preds[pair.target].push((node_idx, *slot));
                active.push(NodeDistance {
                    node_idx: pair.target,
                    metric: candidate,
                });
            } else if candidate == dist[pair.target] {
                sigma[pair.target] += sigma[node_idx];
                preds[pair.target].push((node_idx, *slot));
            }
        }
    }
    let mut delta = vec![0.0_f64; node_count];
    while let Some(to_idx) = order.pop() {
        let coeff = (1.0 + delta[to_idx]) / sigma[to_idx];
        for (from_idx, slot) in preds[to_idx].iter() {
            let contribution = sigma[*from_idx] * coeff;
            pair_scores[*slot].fetch_add(contribution, AtomicOrdering::Relaxed);
            delta[*from_idx] += contribution;
        }
    }
}

/// Betweenness of every edge: the share of all shortest node-to-node paths running along it.
///
/// Scores are normalized by `1 / (n (n - 1))`. The share of a node pair is divided equally
/// among its parallel edges of minimum weight. Self-loops and edges without a usable weight
/// under the metric score 0.
pub fn edge_betweenness(graph: &NetworkGraph, metric: RouteMetric) -> HashMap<EdgeKey, f64> {
    graph.progress_init();
    let (adjacency, pair_count) = collapse_pairs(graph, metric);
    let pair_scores: Vec<AtomicF64> = (0..pair_count).map(|_| AtomicF64::new(0.0)).collect();
    let node_indices: Vec<usize> = (0..graph.node_count()).collect();
    node_indices.par_iter().for_each(|src_idx| {
        graph.progress.fetch_add(1, AtomicOrdering::Relaxed);
        accumulate_source(*src_idx, &adjacency, &pair_scores);
    });

    let n = graph.node_count() as f64;
    let scale = if graph.node_count() > 1 { 1.0 / (n * (n - 1.0)) } else { 1.0 };
    let mut scores: HashMap<EdgeKey, f64> = graph.edge_keys().into_iter().map(|k| (k, 0.0)).collect();
    for (node_idx, pairs) in adjacency.iter().enumerate() {
        for (slot, pair) in pairs {
            let score = pair_scores[*slot].load(AtomicOrdering::Relaxed) * scale;
            let tied: Vec<EdgeKey> = graph
                .graph
                .edges_connecting(NodeIndex::new(node_idx), NodeIndex::new(pair.target))
                .filter(|edge_ref| edge_ref.weight().weight(metric) == Some(pair.weight))
                .map(|edge_ref| edge_ref.weight().edge_key())
                .collect();
            let share = score / tied.len() as f64;
            for edge_key in tied {
                scores.insert(edge_key, share);
            }
        }
    }
    log::info!(
        "Computed exact betweenness for {} edges over {} nodes.",
        scores.len(),
        graph.node_count()
    );
    scores
}
