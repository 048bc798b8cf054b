//! End-to-end centrality runs: configuration, graph, weighting and scoring.

use crate::aggregate::{aggregate, aggregate_par, SamplingReport};
use crate::assemble::CentralityTable;
use crate::centrality::edge_betweenness;
use crate::common::seeded_rng;
use crate::config::{AnalysisConfig, CentralityMethod, RouteMetric, WeightingMode};
use crate::error::{CentralityError, Result};
use crate::graph::{GraphProvider, NetworkGraph};
use crate::population::population_weighted_pairs;
use crate::routing::RoutingOracle;
use crate::selection::select_uniform_pairs;
use crate::travel_time::add_travel_times;

/// Result of a sampled run.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledCentrality {
    pub table: CentralityTable,
    pub report: SamplingReport,
    /// Population weighting was requested but every node had zero population.
    pub degraded_to_uniform: bool,
}

impl SampledCentrality {
    /// Fails with [`CentralityError::AllSamplesFailed`] when no sampled pair was routed.
    pub fn require_routes(self) -> Result<Self> {
        if self.report.attempted > 0 && self.report.routed == 0 {
            return Err(CentralityError::AllSamplesFailed {
                attempted: self.report.attempted,
            });
        }
        Ok(self)
    }
}

/// Result of [`run_analysis`]. `report` is only present for the sampled method.
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityRun {
    pub table: CentralityTable,
    pub report: Option<SamplingReport>,
}

impl From<SampledCentrality> for CentralityRun {
    fn from(sampled: SampledCentrality) -> Self {
        Self {
            table: sampled.table,
            report: Some(sampled.report),
        }
    }
}

/// Adds travel times when routing by travel time. Fails before any routing when the
/// network mode has no speed table.
pub fn prepare_graph(graph: &mut NetworkGraph, config: &AnalysisConfig) -> Result<()> {
    if config.route_metric == RouteMetric::TravelTime {
        add_travel_times(graph, config.network_mode, &config.speed_limits)?;
    }
    Ok(())
}

/// Normalized edge betweenness of every edge.
pub fn exact_centrality(graph: &NetworkGraph, metric: RouteMetric) -> CentralityTable {
    let scores = edge_betweenness(graph, metric);
    CentralityTable::from_betweenness(&scores, graph)
}

/// Samples `num_routes` pairs with the configured weighting, routes them and counts edge usage.
pub fn sampled_centrality<O: RoutingOracle + Sync + ?Sized>(
    graph: &NetworkGraph,
    num_routes: usize,
    config: &AnalysisConfig,
    oracle: &O,
) -> Result<SampledCentrality> {
    let mut rng = seeded_rng(config.random_seed);
    let pairs = match config.effective_weighting() {
        WeightingMode::Population => {
            population_weighted_pairs(graph, &config.raster_path, num_routes, &mut rng)?
        }
        WeightingMode::Random => select_uniform_pairs(&graph.node_keys(), num_routes, &mut rng)?,
    };
    let outcome = if config.parallel_routing {
        aggregate_par(graph, &pairs.pairs(), config.route_metric, oracle)?
    } else {
        aggregate(graph, &pairs.pairs(), config.route_metric, oracle)?
    };
    Ok(SampledCentrality {
        table: CentralityTable::from_usage(&outcome.usage, graph),
        report: outcome.report,
        degraded_to_uniform: pairs.degraded_to_uniform,
    })
}

/// Runs the configured centrality method for the configured place.
pub fn run_analysis<P: GraphProvider + ?Sized, O: RoutingOracle + Sync + ?Sized>(
    provider: &P,
    oracle: &O,
    config: &AnalysisConfig,
) -> Result<CentralityRun> {
    let num_routes = config.validate()?;
    log::info!(
        "Calculating {} centrality for {} ({} network, weighted by {}).",
        config.method,
        config.location,
        config.network_mode,
        config.route_metric
    );
    let mut graph = provider.graph_for(&config.location, config.network_mode)?;
    graph.validate()?;
    prepare_graph(&mut graph, config)?;

    match (config.method, num_routes) {
        (CentralityMethod::Sampled, Some(num_routes)) => {
            Ok(sampled_centrality(&graph, num_routes, config, oracle)?.into())
        }
        (CentralityMethod::Sampled, None) => Err(CentralityError::InvalidConfig(
            "Number of routes must be specified for the sampled method.".to_string(),
        )),
        (CentralityMethod::Exact, _) => Ok(CentralityRun {
            table: exact_centrality(&graph, config.route_metric),
            report: None,
        }),
    }
}
