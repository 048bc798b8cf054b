//! Road segment centrality: exact edge betweenness and population-weighted route sampling.

pub mod aggregate;
pub mod analysis;
pub mod assemble;
pub mod centrality;
pub mod common;
pub mod config;
pub mod crs;
pub mod error;
pub mod graph;
pub mod population;
pub mod raster;
pub mod reproject;
pub mod routing;
pub mod selection;
pub mod travel_time;

#[cfg(feature = "python")]
mod python;
#[cfg(test)]
mod test_logging;

pub use aggregate::{aggregate, aggregate_par, EdgeUsageAccumulator, SamplingOutcome, SamplingReport};
pub use analysis::{run_analysis, CentralityRun, SampledCentrality};
pub use assemble::{CentralityRow, CentralityTable};
pub use centrality::edge_betweenness;
pub use config::{AnalysisConfig, CentralityMethod, NetworkMode, RouteMetric, WeightingMode};
pub use error::{CentralityError, Result};
pub use graph::{EdgeKey, GraphProvider, NetworkGraph, NodeCoordinateIndex, NodeKey, StaticGraphProvider};
pub use population::{population_weighted_pairs, sample_population, NodePopulation};
pub use raster::{GeoTransform, RasterPopulationGrid};
pub use routing::{DijkstraRouter, RouteError, RoutingOracle};
pub use selection::{select_uniform_pairs, select_weighted_pairs, SampledPair, SampledPairs};
pub use travel_time::{add_travel_times, SpeedLimits};
