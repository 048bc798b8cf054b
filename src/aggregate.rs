//! Edge usage counts accumulated over sampled routes.

use crate::config::RouteMetric;
use crate::error::Result;
use crate::graph::{EdgeKey, NetworkGraph};
use crate::routing::{RouteError, RoutingOracle};
use crate::selection::SampledPair;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::Ordering;

/// Number of sampled routes using each edge. Edges never used are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeUsageAccumulator {
    counts: HashMap<EdgeKey, u32>,
}

impl EdgeUsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment(&mut self, edge_key: EdgeKey) {
        *self.counts.entry(edge_key).or_insert(0) += 1;
    }

    /// Usage count, 0 for edges no route used.
    #[inline]
    pub fn get(&self, edge_key: &EdgeKey) -> u32 {
        self.counts.get(edge_key).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: EdgeUsageAccumulator) {
        for (edge_key, count) in other.counts {
            *self.counts.entry(edge_key).or_insert(0) += count;
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &u32)> {
        self.counts.iter()
    }
}

/// Per-run tally of how sampled pairs were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingReport {
    pub attempted: usize,
    pub routed: usize,
    pub skipped_no_path: usize,
    pub skipped_degenerate: usize,
}

impl SamplingReport {
    pub fn merge(&mut self, other: SamplingReport) {
        self.attempted += other.attempted;
        self.routed += other.routed;
        self.skipped_no_path += other.skipped_no_path;
        self.skipped_degenerate += other.skipped_degenerate;
    }

    pub fn skipped(&self) -> usize {
        self.skipped_no_path + self.skipped_degenerate
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOutcome {
    pub usage: EdgeUsageAccumulator,
    pub report: SamplingReport,
}

impl SamplingOutcome {
    /// True when pairs were attempted but none produced a route.
    pub fn all_failed(&self) -> bool {
        self.report.attempted > 0 && self.report.routed == 0
    }

    fn merge(&mut self, other: SamplingOutcome) {
        self.usage.merge(other.usage);
        self.report.merge(other.report);
    }
}

fn route_pairs<O: RoutingOracle + ?Sized>(
    graph: &NetworkGraph,
    pairs: &[SampledPair],
    metric: RouteMetric,
    oracle: &O,
) -> Result<SamplingOutcome> {
    let mut outcome = SamplingOutcome::default();
    for pair in pairs {
        graph.progress.fetch_add(1, Ordering::Relaxed);
        outcome.report.attempted += 1;
        let route = match oracle.shortest_path(graph, pair.origin, pair.destination, metric) {
            Ok(route) => route,
            Err(RouteError::NoPath {
                origin,
                destination,
            }) => {
                log::debug!("Skipping pair ({}, {}): no path.", origin, destination);
                outcome.report.skipped_no_path += 1;
                continue;
            }
            Err(RouteError::Degenerate { reason }) => {
                log::debug!(
                    "Skipping pair ({}, {}): {}.",
                    pair.origin,
                    pair.destination,
                    reason
                );
                outcome.report.skipped_degenerate += 1;
                continue;
            }
            Err(RouteError::Fatal(e)) => {
                log::error!(
                    "Routing failed for pair ({}, {}): {}",
                    pair.origin,
                    pair.destination,
                    e
                );
                return Err(e);
            }
        };
        if route.len() < 2 {
            log::debug!(
                "Skipping pair ({}, {}): route has fewer than two nodes.",
                pair.origin,
                pair.destination
            );
            outcome.report.skipped_degenerate += 1;
            continue;
        }
        let route_edges = graph.route_edges(&route, metric).map_err(|e| {
            log::error!(
                "Routing failed for pair ({}, {}): {}",
                pair.origin,
                pair.destination,
                e
            );
            e
        })?;
        match route_edges {
            Some(edges) => {
                edges
                    .into_iter()
                    .for_each(|edge_key| outcome.usage.increment(edge_key));
                outcome.report.routed += 1;
            }
            None => {
                log::debug!(
                    "Skipping pair ({}, {}): route uses a hop without a usable edge.",
                    pair.origin,
                    pair.destination
                );
                outcome.report.skipped_degenerate += 1;
            }
        }
    }
    Ok(outcome)
}

fn log_outcome(outcome: &SamplingOutcome) {
    log::info!("Created {} routes.", outcome.report.routed);
    if outcome.all_failed() {
        log::warn!(
            "None of the {} sampled pairs could be routed.",
            outcome.report.attempted
        );
    }
}

/// Routes every pair in order and counts the edges of each route.
///
/// Pairs without a path, or with a degenerate route, are skipped and tallied in the report.
/// A fatal routing error aborts the run.
pub fn aggregate<O: RoutingOracle + ?Sized>(
    graph: &NetworkGraph,
    pairs: &[SampledPair],
    metric: RouteMetric,
    oracle: &O,
) -> Result<SamplingOutcome> {
    graph.progress_init();
    let outcome = route_pairs(graph, pairs, metric, oracle)?;
    log_outcome(&outcome);
    Ok(outcome)
}

/// Same result as [`aggregate`], routing chunks of pairs across rayon workers.
pub fn aggregate_par<O: RoutingOracle + Sync + ?Sized>(
    graph: &NetworkGraph,
    pairs: &[SampledPair],
    metric: RouteMetric,
    oracle: &O,
) -> Result<SamplingOutcome> {
    graph.progress_init();
    let chunk_size = (pairs.len() / rayon::current_num_threads().max(1)).max(1);
    let outcome = pairs
        .par_chunks(chunk_size)
        .map(|chunk| route_pairs(graph, chunk, metric, oracle))
        .try_reduce(SamplingOutcome::default, |mut acc, other| {
            acc.merge(other);
            Ok(acc)
        })?;
    log_outcome(&outcome);
    Ok(outcome)
}
