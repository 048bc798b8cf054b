//! Street network graph, node and edge payloads, and graph providers.

use crate::config::{NetworkMode, RouteMetric};
use crate::error::{CentralityError, Result};
use geo::geometry::{Coord, LineString};
use geo::{Haversine, Length};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wkt::TryFromWkt;

/// Stable node identifier, e.g. an OSM node id.
pub type NodeKey = i64;

/// Identifies one physical segment: source node, target node and parallel-edge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: NodeKey,
    pub target: NodeKey,
    pub key: usize,
}

impl EdgeKey {
    pub fn new(source: NodeKey, target: NodeKey, key: usize) -> Self {
        Self {
            source,
            target,
            key,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.source, self.target, self.key)
    }
}

/// Payload for a network node.
#[derive(Debug, Clone)]
pub struct NodePayload {
    pub node_key: NodeKey,
    /// x is longitude, y is latitude.
    pub coord: Coord<f64>,
}

impl NodePayload {
    #[inline]
    pub fn lat(&self) -> f64 {
        self.coord.y
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.coord.x
    }

    #[inline]
    pub fn validate(&self) -> bool {
        self.coord.x.is_finite() && self.coord.y.is_finite()
    }
}

/// Payload for a network edge.
#[derive(Debug, Clone)]
pub struct EdgePayload {
    pub start_nd_key: NodeKey,
    pub end_nd_key: NodeKey,
    /// Parallel-edge index between the same ordered node pair.
    pub edge_idx: usize,
    /// Public edge identifier, e.g. the OSM way id.
    pub osmid: String,
    /// Length in metres.
    pub length: f64,
    /// Road class tag, e.g. "residential".
    pub highway: Option<String>,
    pub speed_kph: Option<f64>,
    /// Travel time in seconds.
    pub travel_time: Option<f64>,
    pub geom: LineString<f64>,
}

impl EdgePayload {
    #[inline]
    pub fn edge_key(&self) -> EdgeKey {
        EdgeKey::new(self.start_nd_key, self.end_nd_key, self.edge_idx)
    }

    /// Routing cost under the metric, `None` if the edge cannot be used for it.
    #[inline]
    pub fn weight(&self, metric: RouteMetric) -> Option<f64> {
        let weight = match metric {
            RouteMetric::Length => Some(self.length),
            RouteMetric::TravelTime => self.travel_time,
        };
        weight.filter(|w| w.is_finite() && *w >= 0.0)
    }

    #[inline]
    pub fn validate(&self) -> bool {
        self.length.is_finite()
            && self.length >= 0.0
            && self.travel_time.map_or(true, |t| t.is_finite())
            && self.geom.0.len() >= 2
    }
}

/// Street network: a directed multigraph with geographic node coordinates.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    pub graph: DiGraph<NodePayload, EdgePayload>,
    pub progress: Arc<AtomicUsize>,
    node_lookup: HashMap<NodeKey, NodeIndex>,
}

impl Default for NetworkGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::<NodePayload, EdgePayload>::default(),
            progress: Arc::new(AtomicUsize::new(0)),
            node_lookup: HashMap::new(),
        }
    }

    #[inline]
    pub fn progress_init(&self) {
        self.progress.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn add_node(&mut self, node_key: NodeKey, x: f64, y: f64) -> Result<usize> {
        if self.node_lookup.contains_key(&node_key) {
            return Err(CentralityError::InvalidInput(format!(
                "Node {} has already been added.",
                node_key
            )));
        }
        let new_node_idx = self.graph.add_node(NodePayload {
            node_key,
            coord: Coord { x, y },
        });
        self.node_lookup.insert(node_key, new_node_idx);
        Ok(new_node_idx.index())
    }

    pub fn node_index(&self, node_key: NodeKey) -> Result<NodeIndex> {
        self.node_lookup
            .get(&node_key)
            .copied()
            .ok_or(CentralityError::UnknownNode(node_key))
    }

    pub fn contains_node(&self, node_key: NodeKey) -> bool {
        self.node_lookup.contains_key(&node_key)
    }

    pub fn get_node_payload(&self, node_key: NodeKey) -> Result<&NodePayload> {
        let node_idx = self.node_index(node_key)?;
        Ok(&self.graph[node_idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node keys in insertion order.
    pub fn node_keys(&self) -> Vec<NodeKey> {
        self.graph
            .node_indices()
            .map(|node| self.graph[node].node_key)
            .collect()
    }

    /// Edge keys in insertion order.
    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.graph
            .edge_references()
            .map(|edge_ref| edge_ref.weight().edge_key())
            .collect()
    }

    /// Adds an edge. A missing geometry becomes a straight segment between the two nodes,
    /// a missing length becomes the haversine length of the geometry.
    pub fn add_edge(
        &mut self,
        start_nd_key: NodeKey,
        end_nd_key: NodeKey,
        edge_idx: usize,
        osmid: String,
        length: Option<f64>,
        highway: Option<String>,
        geom: Option<LineString<f64>>,
    ) -> Result<usize> {
        let node_idx_a = self.node_index(start_nd_key)?;
        let node_idx_b = self.node_index(end_nd_key)?;

        if self
            .graph
            .edges_connecting(node_idx_a, node_idx_b)
            .any(|edge_ref| edge_ref.weight().edge_idx == edge_idx)
        {
            return Err(CentralityError::InvalidInput(format!(
                "Edge {} has already been added.",
                EdgeKey::new(start_nd_key, end_nd_key, edge_idx)
            )));
        }

        let geom = geom.unwrap_or_else(|| {
            LineString::new(vec![self.graph[node_idx_a].coord, self.graph[node_idx_b].coord])
        });
        if geom.0.len() < 2 {
            return Err(CentralityError::InvalidGeometry {
                start: start_nd_key,
                end: end_nd_key,
                key: edge_idx,
                reason: format!(
                    "Edge geometry must have at least 2 coordinates. Found {}.",
                    geom.0.len()
                ),
            });
        }
        let length = length.unwrap_or_else(|| Haversine.length(&geom));

        let new_edge_idx = self.graph.add_edge(
            node_idx_a,
            node_idx_b,
            EdgePayload {
                start_nd_key,
                end_nd_key,
                edge_idx,
                osmid,
                length,
                highway,
                speed_kph: None,
                travel_time: None,
                geom,
            },
        );
        Ok(new_edge_idx.index())
    }

    /// Same as [`NetworkGraph::add_edge`] with the geometry given as WKT.
    pub fn add_edge_wkt(
        &mut self,
        start_nd_key: NodeKey,
        end_nd_key: NodeKey,
        edge_idx: usize,
        osmid: String,
        length: Option<f64>,
        highway: Option<String>,
        geom_wkt: Option<&str>,
    ) -> Result<usize> {
        let geom = match geom_wkt {
            Some(geom_wkt) => match LineString::try_from_wkt_str(geom_wkt) {
                Ok(geom) => Some(geom),
                Err(e) => {
                    return Err(CentralityError::InvalidGeometry {
                        start: start_nd_key,
                        end: end_nd_key,
                        key: edge_idx,
                        reason: format!("Failed to parse WKT: {}", e),
                    });
                }
            },
            None => None,
        };
        self.add_edge(start_nd_key, end_nd_key, edge_idx, osmid, length, highway, geom)
    }

    pub fn get_edge_payload(&self, edge_key: EdgeKey) -> Result<&EdgePayload> {
        let start_node_index = self.node_index(edge_key.source)?;
        let end_node_index = self.node_index(edge_key.target)?;
        self.graph
            .edges_connecting(start_node_index, end_node_index)
            .find(|edge_ref| edge_ref.weight().edge_idx == edge_key.key)
            .map(|edge_ref| edge_ref.weight())
            .ok_or_else(|| CentralityError::InvalidInput(format!("Edge {} not found.", edge_key)))
    }

    /// Cheapest usable parallel edge from `node_a` to `node_b` under the metric.
    pub fn min_weight_edge(
        &self,
        node_a: NodeIndex,
        node_b: NodeIndex,
        metric: RouteMetric,
    ) -> Option<EdgeReference<'_, EdgePayload>> {
        self.graph
            .edges_connecting(node_a, node_b)
            .filter_map(|edge_ref| edge_ref.weight().weight(metric).map(|w| (w, edge_ref)))
            .min_by(|(w_a, _), (w_b, _)| w_a.total_cmp(w_b))
            .map(|(_, edge_ref)| edge_ref)
    }

    /// Decomposes a node route into its edges, taking the cheapest usable parallel edge
    /// between consecutive nodes. `None` if some hop has no usable edge.
    pub fn route_edges(&self, route: &[NodeKey], metric: RouteMetric) -> Result<Option<Vec<EdgeKey>>> {
        let mut edges = Vec::with_capacity(route.len().saturating_sub(1));
        for hop in route.windows(2) {
            let node_a = self.node_index(hop[0])?;
            let node_b = self.node_index(hop[1])?;
            match self.min_weight_edge(node_a, node_b, metric) {
                Some(edge_ref) => edges.push(edge_ref.weight().edge_key()),
                None => return Ok(None),
            }
        }
        Ok(Some(edges))
    }

    /// Builds the node coordinate index used for raster sampling.
    pub fn node_coordinates(&self) -> NodeCoordinateIndex {
        NodeCoordinateIndex::from_graph(self)
    }

    pub fn validate(&self) -> Result<bool> {
        if self.node_count() == 0 {
            return Err(CentralityError::InvalidInput(
                "NetworkGraph contains no nodes.".to_string(),
            ));
        }
        if self.edge_count() == 0 {
            return Err(CentralityError::InvalidInput(
                "NetworkGraph contains no edges.".to_string(),
            ));
        }
        for node_idx in self.graph.node_indices() {
            let node_payload = &self.graph[node_idx];
            if !node_payload.validate() {
                return Err(CentralityError::InvalidInput(format!(
                    "Invalid node payload for node {}.",
                    node_payload.node_key
                )));
            }
        }
        for edge_ref in self.graph.edge_references() {
            let edge_payload = edge_ref.weight();
            if !edge_payload.validate() {
                return Err(CentralityError::InvalidInput(format!(
                    "Invalid edge payload for edge {}.",
                    edge_payload.edge_key()
                )));
            }
        }
        Ok(true)
    }
}

/// Node coordinates as (latitude, longitude), in graph node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeCoordinateIndex {
    entries: Vec<(NodeKey, f64, f64)>,
}

impl NodeCoordinateIndex {
    pub fn from_graph(graph: &NetworkGraph) -> Self {
        let entries = graph
            .graph
            .node_indices()
            .map(|node| {
                let payload = &graph.graph[node];
                (payload.node_key, payload.lat(), payload.lon())
            })
            .collect();
        Self { entries }
    }

    /// Builds an index from `(node, lat, lon)` triples, keeping their order.
    pub fn from_entries(entries: impl IntoIterator<Item = (NodeKey, f64, f64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, node_key: NodeKey) -> Option<(f64, f64)> {
        self.entries
            .iter()
            .find(|(key, _, _)| *key == node_key)
            .map(|(_, lat, lon)| (*lat, *lon))
    }

    pub fn keys(&self) -> Vec<NodeKey> {
        self.entries.iter().map(|(key, _, _)| *key).collect()
    }

    /// Iterates `(node, lat, lon)`.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, f64, f64)> + '_ {
        self.entries.iter().copied()
    }
}

/// Source of street networks, e.g. an OpenStreetMap downloader.
pub trait GraphProvider {
    /// Fails with [`CentralityError::PlaceNotFound`] when the place cannot be resolved.
    fn graph_for(&self, location: &str, network_mode: NetworkMode) -> Result<NetworkGraph>;
}

/// Graph provider backed by graphs registered up front.
#[derive(Debug, Clone, Default)]
pub struct StaticGraphProvider {
    graphs: HashMap<(String, NetworkMode), NetworkGraph>,
}

impl StaticGraphProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, network_mode: NetworkMode, graph: NetworkGraph) {
        self.graphs.insert((location.into(), network_mode), graph);
    }
}

impl GraphProvider for StaticGraphProvider {
    fn graph_for(&self, location: &str, network_mode: NetworkMode) -> Result<NetworkGraph> {
        self.graphs
            .get(&(location.to_string(), network_mode))
            .cloned()
            .ok_or_else(|| {
                log::error!(
                    "Place not found: '{}'. Please check the spelling and try again.",
                    location
                );
                CentralityError::PlaceNotFound(location.to_string())
            })
    }
}
