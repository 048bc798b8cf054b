//! Analysis configuration and the enumerations shared across the crate.

use crate::common::DEFAULT_RASTER_PATH;
use crate::error::{CentralityError, Result};
use crate::travel_time::SpeedLimits;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Travel modality of the street network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkMode {
    AllPrivate,
    All,
    Bike,
    Drive,
    DriveService,
    Walk,
}

impl NetworkMode {
    pub const ALL: [NetworkMode; 6] = [
        NetworkMode::AllPrivate,
        NetworkMode::All,
        NetworkMode::Bike,
        NetworkMode::Drive,
        NetworkMode::DriveService,
        NetworkMode::Walk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::AllPrivate => "all_private",
            NetworkMode::All => "all",
            NetworkMode::Bike => "bike",
            NetworkMode::Drive => "drive",
            NetworkMode::DriveService => "drive_service",
            NetworkMode::Walk => "walk",
        }
    }
}

/// Edge attribute used to decide which route is "shortest".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMetric {
    Length,
    TravelTime,
}

impl RouteMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMetric::Length => "length",
            RouteMetric::TravelTime => "travel_time",
        }
    }
}

/// How origins and destinations are drawn for the sampled method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightingMode {
    Population,
    Random,
}

impl WeightingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingMode::Population => "population",
            WeightingMode::Random => "random",
        }
    }
}

/// Centrality strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CentralityMethod {
    /// Edge betweenness over all node pairs.
    Exact,
    /// Route sampling between drawn origin/destination pairs.
    Sampled,
}

impl CentralityMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CentralityMethod::Exact => "exact",
            CentralityMethod::Sampled => "sampled",
        }
    }
}

macro_rules! impl_display {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display!(NetworkMode, RouteMetric, WeightingMode, CentralityMethod);

impl FromStr for NetworkMode {
    type Err = CentralityError;

    fn from_str(s: &str) -> Result<Self> {
        NetworkMode::ALL
            .iter()
            .find(|mode| mode.as_str() == s)
            .copied()
            .ok_or_else(|| {
                CentralityError::InvalidConfig(format!(
                    "Unknown network type '{}'. Expected one of: all_private, all, bike, drive, drive_service, walk.",
                    s
                ))
            })
    }
}

impl FromStr for RouteMetric {
    type Err = CentralityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "length" => Ok(RouteMetric::Length),
            "travel_time" => Ok(RouteMetric::TravelTime),
            _ => Err(CentralityError::InvalidConfig(format!(
                "Unknown route type '{}'. Expected 'length' or 'travel_time'.",
                s
            ))),
        }
    }
}

impl FromStr for WeightingMode {
    type Err = CentralityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "population" => Ok(WeightingMode::Population),
            "random" => Ok(WeightingMode::Random),
            _ => Err(CentralityError::InvalidConfig(format!(
                "Invalid weighting method '{}'. Expected 'population' or 'random'.",
                s
            ))),
        }
    }
}

impl FromStr for CentralityMethod {
    type Err = CentralityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" | "networkx" => Ok(CentralityMethod::Exact),
            "sampled" | "geographical" => Ok(CentralityMethod::Sampled),
            _ => Err(CentralityError::InvalidConfig(format!(
                "Invalid centrality method '{}'. Expected 'exact' or 'sampled'.",
                s
            ))),
        }
    }
}

/// Everything a single analysis run needs to know.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub location: String,
    pub network_mode: NetworkMode,
    pub route_metric: RouteMetric,
    pub method: CentralityMethod,
    /// Required, and positive, for the sampled method only.
    pub num_routes: Option<usize>,
    /// Defaults to random weighting for the sampled method.
    pub weighting: Option<WeightingMode>,
    pub raster_path: PathBuf,
    pub random_seed: Option<u64>,
    pub speed_limits: SpeedLimits,
    /// Route sampled pairs across rayon workers instead of sequentially.
    pub parallel_routing: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            location: "Heidelberg, Germany".to_string(),
            network_mode: NetworkMode::Drive,
            route_metric: RouteMetric::Length,
            method: CentralityMethod::Exact,
            num_routes: None,
            weighting: None,
            raster_path: PathBuf::from(DEFAULT_RASTER_PATH),
            random_seed: None,
            speed_limits: SpeedLimits::default(),
            parallel_routing: false,
        }
    }
}

impl AnalysisConfig {
    /// Configuration for the exact betweenness method.
    pub fn exact(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Configuration for the sampled method with `num_routes` routes.
    pub fn sampled(location: impl Into<String>, num_routes: usize, weighting: WeightingMode) -> Self {
        Self {
            location: location.into(),
            method: CentralityMethod::Sampled,
            num_routes: Some(num_routes),
            weighting: Some(weighting),
            ..Self::default()
        }
    }

    pub fn with_network_mode(mut self, network_mode: NetworkMode) -> Self {
        self.network_mode = network_mode;
        self
    }

    pub fn with_route_metric(mut self, route_metric: RouteMetric) -> Self {
        self.route_metric = route_metric;
        self
    }

    pub fn with_raster_path(mut self, raster_path: impl Into<PathBuf>) -> Self {
        self.raster_path = raster_path.into();
        self
    }

    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = Some(random_seed);
        self
    }

    pub fn with_speed_limits(mut self, speed_limits: SpeedLimits) -> Self {
        self.speed_limits = speed_limits;
        self
    }

    pub fn with_parallel_routing(mut self, parallel_routing: bool) -> Self {
        self.parallel_routing = parallel_routing;
        self
    }

    /// Weighting actually used by the sampled method.
    pub fn effective_weighting(&self) -> WeightingMode {
        self.weighting.unwrap_or(WeightingMode::Random)
    }

    /// Checks option combinations and returns the validated route count, if any.
    pub fn validate(&self) -> Result<Option<usize>> {
        match self.method {
            CentralityMethod::Sampled => match self.num_routes {
                None => Err(CentralityError::InvalidConfig(
                    "Number of routes must be specified for the sampled method.".to_string(),
                )),
                Some(0) => Err(CentralityError::InvalidConfig(
                    "Number of routes must be a positive integer.".to_string(),
                )),
                Some(num_routes) => Ok(Some(num_routes)),
            },
            CentralityMethod::Exact => {
                if self.num_routes.is_some() {
                    log::warn!("The exact method does not support a number of routes.");
                }
                if self.weighting.is_some() {
                    log::warn!("The exact method does not support a weighting method.");
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("drive_service".parse::<NetworkMode>().unwrap(), NetworkMode::DriveService);
        assert_eq!("travel_time".parse::<RouteMetric>().unwrap(), RouteMetric::TravelTime);
        assert_eq!("geographical".parse::<CentralityMethod>().unwrap(), CentralityMethod::Sampled);
        assert_eq!("networkx".parse::<CentralityMethod>().unwrap(), CentralityMethod::Exact);
        assert!("boat".parse::<NetworkMode>().is_err());
        assert!("invalid_weighting".parse::<WeightingMode>().is_err());
        for mode in NetworkMode::ALL {
            assert_eq!(mode.to_string().parse::<NetworkMode>().unwrap(), mode);
        }
    }

    #[test]
    fn sampled_method_requires_positive_route_count() {
        let mut config = AnalysisConfig::sampled("Dossenheim, Germany", 5, WeightingMode::Random);
        assert_eq!(config.validate().unwrap(), Some(5));
        config.num_routes = Some(0);
        assert!(matches!(config.validate(), Err(CentralityError::InvalidConfig(_))));
        config.num_routes = None;
        assert!(matches!(config.validate(), Err(CentralityError::InvalidConfig(_))));
    }

    #[test]
    fn exact_method_ignores_sampling_options() {
        let mut config = AnalysisConfig::exact("Dossenheim, Germany");
        config.num_routes = Some(10);
        config.weighting = Some(WeightingMode::Population);
        assert_eq!(config.validate().unwrap(), None);
    }

    #[test]
    fn sampled_weighting_defaults_to_random() {
        let mut config = AnalysisConfig::sampled("Dossenheim, Germany", 5, WeightingMode::Population);
        assert_eq!(config.effective_weighting(), WeightingMode::Population);
        config.weighting = None;
        assert_eq!(config.effective_weighting(), WeightingMode::Random);
    }
}
