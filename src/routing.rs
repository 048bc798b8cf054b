//! Point-to-point shortest paths between sampled origins and destinations.

use crate::config::RouteMetric;
use crate::error::CentralityError;
use crate::graph::{NetworkGraph, NodeKey};
use petgraph::graph::NodeIndex;
use petgraph::prelude::*;
use petgraph::Direction;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Outcome of a failed route query. `NoPath` and `Degenerate` skip the pair, `Fatal` aborts.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("No path between nodes {origin} and {destination}.")]
    NoPath {
        origin: NodeKey,
        destination: NodeKey,
    },
    #[error("Degenerate route: {reason}")]
    Degenerate { reason: String },
    #[error(transparent)]
    Fatal(#[from] CentralityError),
}

/// Computes the minimum-weight node sequence between two nodes.
pub trait RoutingOracle {
    fn shortest_path(
        &self,
        graph: &NetworkGraph,
        origin: NodeKey,
        destination: NodeKey,
        metric: RouteMetric,
    ) -> Result<Vec<NodeKey>, RouteError>;
}

#[derive(Clone, Copy)]
struct NodeDistance {
    node_idx: usize,
    metric: f64,
}

// Reversed on the metric so that BinaryHeap pops the closest node first.
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

/// Dijkstra over outgoing edges, stopping once the destination is settled.
///
/// Edges without a finite, non-negative weight under the metric are not traversed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraRouter;

impl DijkstraRouter {
    pub fn new() -> Self {
        Self
    }
}

impl RoutingOracle for DijkstraRouter {
    fn shortest_path(
        &self,
        graph: &NetworkGraph,
        origin: NodeKey,
        destination: NodeKey,
        metric: RouteMetric,
    ) -> Result<Vec<NodeKey>, RouteError> {
        let src_idx = graph.node_index(origin)?.index();
        let dst_idx = graph.node_index(destination)?.index();
        if src_idx == dst_idx {
            return Ok(vec![origin]);
        }

        let node_count = graph.node_count();
        let mut dist = vec![f64::INFINITY; node_count];
        let mut pred: Vec<Option<usize>> = vec![None; node_count];
        let mut visited = vec![false; node_count];
        dist[src_idx] = 0.0;
        let mut active = BinaryHeap::new();
        active.push(NodeDistance {
            node_idx: src_idx,
            metric: 0.0,
        });
        while let Some(NodeDistance { node_idx, metric: node_dist }) = active.pop() {
            if visited[node_idx] {
                continue;
            }
            visited[node_idx] = true;
            if node_idx == dst_idx {
                break;
            }
            for edge_ref in graph
                .graph
                .edges_directed(NodeIndex::new(node_idx), Direction::Outgoing)
            {
                let Some(weight) = edge_ref.weight().weight(metric) else {
                    continue;
                };
                let nb_idx = edge_ref.target().index();
                if visited[nb_idx] {
                    continue;
                }
                let candidate = node_dist + weight;
                if candidate < dist[nb_idx] {
                    dist[nb_idx] = candidate;
                    pred[nb_idx] = Some(node_idx);
                    active.push(NodeDistance {
                        node_idx: nb_idx,
                        metric: candidate,
                    });
                }
            }
        }

        if !visited[dst_idx] {
            let any_usable = graph
                .graph
                .edge_references()
                .any(|edge_ref| edge_ref.weight().weight(metric).is_some());
            if !any_usable {
                return Err(RouteError::Degenerate {
                    reason: format!("no edge of the network carries a usable {} weight", metric),
                });
            }
            return Err(RouteError::NoPath {
                origin,
                destination,
            });
        }

        let mut route = vec![destination];
        let mut current = dst_idx;
        while let Some(prev) = pred[current] {
            route.push(graph.graph[NodeIndex::new(prev)].node_key);
            current = prev;
        }
        route.reverse();
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 -> 2 -> 3 -> 4 plus a long shortcut 1 -> 4 and a cheap detour 2 -> 5 -> 3.
    fn test_graph() -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        for (key, x) in [(1, 8.0), (2, 8.001), (3, 8.002), (4, 8.003), (5, 8.0015)] {
            graph.add_node(key, x, 49.0).unwrap();
        }
        for (start, end, length) in [(1, 2, 10.0), (2, 3, 50.0), (3, 4, 10.0), (1, 4, 100.0), (2, 5, 5.0), (5, 3, 5.0)] {
            graph
                .add_edge(start, end, 0, format!("{}{}", start, end), Some(length), None, None)
                .unwrap();
        }
        graph
    }

    #[test]
    fn finds_minimum_length_route() {
        let route = DijkstraRouter
            .shortest_path(&test_graph(), 1, 4, RouteMetric::Length)
            .unwrap();
        assert_eq!(route, vec![1, 2, 5, 3, 4]);
    }

    #[test]
    fn follows_edge_direction() {
        match DijkstraRouter.shortest_path(&test_graph(), 4, 1, RouteMetric::Length) {
            Err(RouteError::NoPath {
                origin,
                destination,
            }) => {
                assert_eq!((origin, destination), (4, 1));
            }
            other => panic!("expected no path, got {:?}", other),
        }
    }

    #[test]
    fn same_node_route_has_one_node() {
        let route = DijkstraRouter
            .shortest_path(&test_graph(), 3, 3, RouteMetric::Length)
            .unwrap();
        assert_eq!(route, vec![3]);
    }

    #[test]
    fn unweighted_network_is_degenerate() {
        // No travel times have been added.
        assert!(matches!(
            DijkstraRouter.shortest_path(&test_graph(), 1, 4, RouteMetric::TravelTime),
            Err(RouteError::Degenerate { .. })
        ));
    }

    #[test]
    fn unknown_nodes_are_fatal() {
        assert!(matches!(
            DijkstraRouter.shortest_path(&test_graph(), 1, 99, RouteMetric::Length),
            Err(RouteError::Fatal(CentralityError::UnknownNode(99)))
        ));
    }
}
