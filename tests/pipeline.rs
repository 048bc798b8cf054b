mod common;

use common::{line_graph, provider, write_wgs84_raster, PLACE};
use road_centrality::analysis::sampled_centrality;
use road_centrality::routing::{RouteError, RoutingOracle};
use road_centrality::{
    run_analysis, AnalysisConfig, CentralityError, DijkstraRouter, EdgeKey, NetworkGraph, NetworkMode, NodeKey,
    RouteMetric, WeightingMode,
};
use tempfile::tempdir;

/// Fails the test if any route is requested.
struct UnreachableOracle;

impl RoutingOracle for UnreachableOracle {
    fn shortest_path(
        &self,
        _graph: &NetworkGraph,
        origin: NodeKey,
        destination: NodeKey,
        _metric: RouteMetric,
    ) -> Result<Vec<NodeKey>, RouteError> {
        panic!("unexpected route request {} -> {}", origin, destination);
    }
}

#[test]
fn population_weighted_run_routes_between_populated_nodes() {
    let dir = tempdir().unwrap();
    let raster = dir.path().join("population.tif");
    write_wgs84_raster(&raster, &[&[5.0, 0.0, 5.0]], (8.0, 49.001), 0.001);
    let config = AnalysisConfig::sampled(PLACE, 200, WeightingMode::Population)
        .with_raster_path(&raster)
        .with_random_seed(42);

    let run = run_analysis(&provider(NetworkMode::Drive), &DijkstraRouter, &config).unwrap();
    let report = run.report.unwrap();
    assert_eq!(report.attempted, 200);
    assert_eq!(report.skipped_no_path, 0);
    // Only nodes 1 and 3 carry population, so every route spans the whole line.
    assert!(report.routed > 50 && report.skipped_degenerate > 50);
    let usage = |source, target| run.table.get(&EdgeKey::new(source, target, 0)).unwrap().centrality;
    assert_eq!(usage(1, 2), usage(2, 3));
    assert_eq!(usage(3, 2), usage(2, 1));
    assert_eq!(usage(1, 2) + usage(3, 2), report.routed as f64);
    assert_eq!(run.table.len(), 4);
}

#[test]
fn single_populated_node_yields_no_routes() {
    let dir = tempdir().unwrap();
    let raster = dir.path().join("population.tif");
    write_wgs84_raster(&raster, &[&[0.0, 0.0, 10.0]], (8.0, 49.001), 0.001);
    let config = AnalysisConfig::sampled(PLACE, 20, WeightingMode::Population)
        .with_raster_path(&raster)
        .with_random_seed(1);

    let sampled = sampled_centrality(&line_graph(), 20, &config, &DijkstraRouter).unwrap();
    assert_eq!(sampled.report.skipped_degenerate, 20);
    assert_eq!(sampled.table.total(), 0.0);
    assert!(matches!(
        sampled.require_routes(),
        Err(CentralityError::AllSamplesFailed { attempted: 20 })
    ));
}

#[test]
fn empty_population_degrades_to_uniform_selection() {
    let dir = tempdir().unwrap();
    let raster = dir.path().join("population.tif");
    write_wgs84_raster(&raster, &[&[0.0, 0.0, 0.0]], (8.0, 49.001), 0.001);
    let config = AnalysisConfig::sampled(PLACE, 100, WeightingMode::Population)
        .with_raster_path(&raster)
        .with_random_seed(3);

    let sampled = sampled_centrality(&line_graph(), 100, &config, &DijkstraRouter).unwrap();
    assert!(sampled.degraded_to_uniform);
    assert!(sampled.report.routed > 0);
}

#[test]
fn nodes_outside_the_raster_abort_the_run() {
    let dir = tempdir().unwrap();
    let raster = dir.path().join("population.tif");
    write_wgs84_raster(&raster, &[&[1.0, 1.0]], (8.0, 49.001), 0.001);
    let config = AnalysisConfig::sampled(PLACE, 10, WeightingMode::Population).with_raster_path(&raster);

    match run_analysis(&provider(NetworkMode::Drive), &UnreachableOracle, &config) {
        Err(CentralityError::OutOfBounds { node, .. }) => assert_eq!(node, 3),
        other => panic!("expected out of bounds error, got {:?}", other),
    }
}

#[test]
fn unsupported_mode_fails_before_routing() {
    let config = AnalysisConfig::sampled(PLACE, 10, WeightingMode::Population)
        .with_network_mode(NetworkMode::Walk)
        .with_route_metric(RouteMetric::TravelTime)
        .with_raster_path("does/not/exist.tif");

    match run_analysis(&provider(NetworkMode::Walk), &UnreachableOracle, &config) {
        Err(CentralityError::UnsupportedMode { mode, available }) => {
            assert_eq!(mode, NetworkMode::Walk);
            assert!(available.contains("drive"));
        }
        other => panic!("expected unsupported mode error, got {:?}", other),
    }
}

#[test]
fn missing_raster_fails_before_routing() {
    let config = AnalysisConfig::sampled(PLACE, 10, WeightingMode::Population).with_raster_path("does/not/exist.tif");
    assert!(matches!(
        run_analysis(&provider(NetworkMode::Drive), &UnreachableOracle, &config),
        Err(CentralityError::DataAccess { .. })
    ));
}

#[test]
fn travel_time_exact_run_scores_every_edge() {
    let config = AnalysisConfig::exact(PLACE).with_route_metric(RouteMetric::TravelTime);
    let run = run_analysis(&provider(NetworkMode::Drive), &DijkstraRouter, &config).unwrap();
    assert!(run.report.is_none());
    assert_eq!(run.table.len(), 4);
    for row in run.table.rows() {
        assert!((row.centrality - 1.0 / 3.0).abs() < 1e-9);
    }
}
