//! Python bindings, built with the `python` feature.

use crate::aggregate::SamplingReport;
use crate::analysis::{exact_centrality, sampled_centrality};
use crate::assemble::CentralityTable;
use crate::config::{AnalysisConfig, CentralityMethod, NetworkMode, RouteMetric, WeightingMode};
use crate::error::CentralityError;
use crate::graph::{NetworkGraph, NodeCoordinateIndex, NodeKey};
use crate::population::sample_population;
use crate::raster::RasterPopulationGrid;
use crate::routing::DijkstraRouter;
use crate::travel_time::{add_travel_times, SpeedLimits};
use numpy::{IntoPyArray, PyArray1};
use pyo3::exceptions;
use pyo3::prelude::*;
use std::path::PathBuf;
use wkt::ToWkt;

impl From<CentralityError> for PyErr {
    fn from(err: CentralityError) -> PyErr {
        let message = err.to_string();
        match err {
            CentralityError::DataAccess { .. } => exceptions::PyIOError::new_err(message),
            CentralityError::OutOfBounds { .. } => exceptions::PyIndexError::new_err(message),
            CentralityError::UnknownNode(_) => exceptions::PyKeyError::new_err(message),
            CentralityError::AllSamplesFailed { .. } => exceptions::PyRuntimeError::new_err(message),
            CentralityError::PlaceNotFound(_)
            | CentralityError::UnsupportedMode { .. }
            | CentralityError::InvalidGeometry { .. }
            | CentralityError::InvalidConfig(_)
            | CentralityError::InvalidInput(_) => exceptions::PyValueError::new_err(message),
        }
    }
}

/// Street network built from Python, one node and edge at a time.
#[pyclass(name = "NetworkGraph")]
pub struct PyNetworkGraph {
    inner: NetworkGraph,
}

#[pymethods]
impl PyNetworkGraph {
    #[new]
    pub fn new() -> Self {
        Self {
            inner: NetworkGraph::new(),
        }
    }

    pub fn add_node(&mut self, node_key: NodeKey, x: f64, y: f64) -> PyResult<usize> {
        Ok(self.inner.add_node(node_key, x, y)?)
    }

    #[pyo3(signature = (start_nd_key, end_nd_key, edge_idx, osmid, length=None, highway=None, geom_wkt=None))]
    pub fn add_edge(
        &mut self,
        start_nd_key: NodeKey,
        end_nd_key: NodeKey,
        edge_idx: usize,
        osmid: String,
        length: Option<f64>,
        highway: Option<String>,
        geom_wkt: Option<String>,
    ) -> PyResult<usize> {
        Ok(self.inner.add_edge_wkt(
            start_nd_key,
            end_nd_key,
            edge_idx,
            osmid,
            length,
            highway,
            geom_wkt.as_deref(),
        )?)
    }

    /// Adds travel times from the built-in speed tables. Returns the number of annotated edges.
    pub fn add_travel_times(&mut self, network_mode: &str) -> PyResult<usize> {
        let network_mode: NetworkMode = network_mode.parse()?;
        Ok(add_travel_times(&mut self.inner, network_mode, &SpeedLimits::default())?)
    }

    #[getter]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    #[getter]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    #[getter]
    pub fn node_keys(&self) -> Vec<NodeKey> {
        self.inner.node_keys()
    }

    pub fn progress(&self) -> usize {
        self.inner.progress()
    }

    pub fn validate(&self) -> PyResult<bool> {
        Ok(self.inner.validate()?)
    }
}

/// Centrality per edge, in graph edge order.
#[pyclass(name = "CentralityTable")]
pub struct PyCentralityTable {
    inner: CentralityTable,
    report: Option<SamplingReport>,
}

#[pymethods]
impl PyCentralityTable {
    #[getter]
    pub fn edge_keys(&self) -> Vec<(NodeKey, NodeKey, usize)> {
        self.inner
            .rows()
            .iter()
            .map(|row| (row.edge_key.source, row.edge_key.target, row.edge_key.key))
            .collect()
    }

    #[getter]
    pub fn osmids(&self) -> Vec<String> {
        self.inner.rows().iter().map(|row| row.osmid.clone()).collect()
    }

    /// Edge geometries as WKT, EPSG:4326.
    #[getter]
    pub fn geoms_wkt(&self) -> Vec<String> {
        self.inner.rows().iter().map(|row| row.geom.wkt_string()).collect()
    }

    #[getter]
    pub fn centrality(&self, py: Python) -> Py<PyArray1<f64>> {
        self.inner.centralities().into_pyarray(py).unbind()
    }

    #[getter]
    pub fn attempted(&self) -> Option<usize> {
        self.report.map(|report| report.attempted)
    }

    #[getter]
    pub fn routed(&self) -> Option<usize> {
        self.report.map(|report| report.routed)
    }

    pub fn total(&self) -> f64 {
        self.inner.total()
    }

    pub fn __len__(&self) -> usize {
        self.inner.len()
    }
}

/// Population-weighted (or uniformly sampled) route centrality.
#[pyfunction]
#[pyo3(signature = (network_structure, num_routes, weighting="random", route_metric="length", raster_path=None, random_seed=None, parallel=None, require_routes=None))]
pub fn sampled_route_centrality(
    py: Python,
    network_structure: &PyNetworkGraph,
    num_routes: usize,
    weighting: &str,
    route_metric: &str,
    raster_path: Option<PathBuf>,
    random_seed: Option<u64>,
    parallel: Option<bool>,
    require_routes: Option<bool>,
) -> PyResult<PyCentralityTable> {
    let mut config = AnalysisConfig {
        method: CentralityMethod::Sampled,
        num_routes: Some(num_routes),
        weighting: Some(weighting.parse::<WeightingMode>()?),
        route_metric: route_metric.parse::<RouteMetric>()?,
        random_seed,
        parallel_routing: parallel.unwrap_or(false),
        ..AnalysisConfig::default()
    };
    if let Some(raster_path) = raster_path {
        config.raster_path = raster_path;
    }
    config.validate()?;
    let graph = &network_structure.inner;
    let result = py.allow_threads(move || {
        let sampled = sampled_centrality(graph, num_routes, &config, &DijkstraRouter)?;
        if require_routes.unwrap_or(false) {
            sampled.require_routes()
        } else {
            Ok(sampled)
        }
    })?;
    Ok(PyCentralityTable {
        inner: result.table,
        report: Some(result.report),
    })
}

/// Normalized exact edge betweenness.
#[pyfunction]
#[pyo3(signature = (network_structure, route_metric="length"))]
pub fn exact_betweenness(
    py: Python,
    network_structure: &PyNetworkGraph,
    route_metric: &str,
) -> PyResult<PyCentralityTable> {
    let route_metric: RouteMetric = route_metric.parse()?;
    let graph = &network_structure.inner;
    let table = py.allow_threads(move || exact_centrality(graph, route_metric));
    Ok(PyCentralityTable {
        inner: table,
        report: None,
    })
}

/// Population of the raster cell at each `(lat, lon)`, re-projecting the raster if needed.
#[pyfunction]
pub fn population_at_coords(
    py: Python,
    raster_path: PathBuf,
    coords: Vec<(f64, f64)>,
) -> PyResult<Py<PyArray1<f64>>> {
    let grid = RasterPopulationGrid::load(&raster_path)?;
    let index = NodeCoordinateIndex::from_entries(
        coords
            .into_iter()
            .enumerate()
            .map(|(i, (lat, lon))| (i as NodeKey, lat, lon)),
    );
    let population = sample_population(&grid, &index)?;
    Ok(population.values().into_pyarray(py).unbind())
}

#[pymodule]
fn road_centrality(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    py_module.add_class::<PyNetworkGraph>()?;
    py_module.add_class::<PyCentralityTable>()?;
    py_module.add_function(wrap_pyfunction!(sampled_route_centrality, py_module)?)?;
    py_module.add_function(wrap_pyfunction!(exact_betweenness, py_module)?)?;
    py_module.add_function(wrap_pyfunction!(population_at_coords, py_module)?)?;
    py_module.add(
        "__doc__",
        "Population-weighted road segment centrality implemented in Rust.",
    )?;
    Ok(())
}
