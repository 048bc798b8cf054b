//! Population values at network nodes.

use crate::error::{CentralityError, Result};
use crate::graph::{NetworkGraph, NodeCoordinateIndex, NodeKey};
use crate::raster::RasterPopulationGrid;
use crate::selection::{select_weighted_pairs, SampledPairs};
use rand::Rng;
use std::path::Path;

/// Population per node, in the order of the coordinate index it was sampled from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePopulation {
    entries: Vec<(NodeKey, f64)>,
}

impl NodePopulation {
    pub fn from_entries(entries: impl IntoIterator<Item = (NodeKey, f64)>) -> Self {
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

    pub fn keys(&self) -> Vec<NodeKey> {
        self.entries.iter().map(|(key, _)| *key).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, value)| *value).collect()
    }

    pub fn get(&self, node_key: NodeKey) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| *key == node_key)
            .map(|(_, value)| *value)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, value)| value).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, f64)> + '_ {
        self.entries.iter().copied()
    }
}

/// Reads the population of the raster cell containing each node.
///
/// Fails with [`CentralityError::OutOfBounds`] for the first node outside the raster.
/// Missing (`NaN`) and negative cells count as zero population.
pub fn sample_population(
    grid: &RasterPopulationGrid,
    coordinates: &NodeCoordinateIndex,
) -> Result<NodePopulation> {
    if !grid.crs().is_wgs84() {
        return Err(CentralityError::InvalidInput(format!(
            "Raster {} is in {}; it must be re-projected to EPSG:4326 before sampling.",
            grid.source(),
            grid.crs()
        )));
    }
    let mut entries = Vec::with_capacity(coordinates.len());
    let mut clamped = 0;
    for (node_key, lat, lon) in coordinates.iter() {
        let (col, row) = grid.cell_index(lon, lat).ok_or(CentralityError::OutOfBounds {
            node: node_key,
            lat,
            lon,
        })?;
        let value = grid.value_at(col, row).unwrap_or(f64::NAN);
        let population = if value.is_finite() && value >= 0.0 {
            value
        } else {
            clamped += 1;
            0.0
        };
        entries.push((node_key, population));
    }
    if clamped > 0 {
        log::debug!(
            "{} of {} nodes fall on missing or negative raster cells and count as zero population.",
            clamped,
            coordinates.len()
        );
    }
    Ok(NodePopulation { entries })
}

/// Loads the raster, samples every graph node and draws `count` population-weighted pairs.
pub fn population_weighted_pairs<R: Rng>(
    graph: &NetworkGraph,
    raster_path: impl AsRef<Path>,
    count: usize,
    rng: &mut R,
) -> Result<SampledPairs> {
    let grid = RasterPopulationGrid::load(raster_path.as_ref()).map_err(|e| {
        log::error!("Error in population_weighted_pairs: {}", e);
        e
    })?;
    let coordinates = graph.node_coordinates();
    let population = sample_population(&grid, &coordinates)?;
    select_weighted_pairs(&population, count, rng)
}
