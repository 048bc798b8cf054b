//! Speed limits per road class and the travel-time annotation derived from them.

use crate::common::KPH_TO_M_S;
use crate::config::NetworkMode;
use crate::error::{CentralityError, Result};
use crate::graph::NetworkGraph;
use std::collections::HashMap;

/// Speed in km/h per road class, per network mode. `None` marks a class the mode cannot use.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedLimits {
    tables: HashMap<NetworkMode, HashMap<String, Option<f64>>>,
}

const DRIVE_SPEEDS: [(&str, Option<f64>); 21] = [
    ("motorway", Some(100.0)),
    ("motorway_link", Some(60.0)),
    ("motorroad", Some(90.0)),
    ("trunk", Some(85.0)),
    ("trunk_link", Some(60.0)),
    ("primary", Some(65.0)),
    ("primary_link", Some(50.0)),
    ("secondary", Some(60.0)),
    ("secondary_link", Some(50.0)),
    ("tertiary", Some(50.0)),
    ("tertiary_link", Some(40.0)),
    ("unclassified", Some(30.0)),
    ("residential", Some(30.0)),
    ("living_street", Some(10.0)),
    ("service", Some(20.0)),
    ("road", Some(20.0)),
    ("track", Some(15.0)),
    ("path", None),
    ("footway", None),
    ("pedestrian", None),
    ("cycleway", None),
];

const BIKE_SPEEDS: [(&str, Option<f64>); 21] = [
    ("motorway", None),
    ("motorway_link", None),
    ("motorroad", None),
    ("trunk", Some(18.0)),
    ("trunk_link", Some(18.0)),
    ("primary", Some(18.0)),
    ("primary_link", Some(18.0)),
    ("secondary", Some(18.0)),
    ("secondary_link", Some(18.0)),
    ("tertiary", Some(18.0)),
    ("tertiary_link", Some(18.0)),
    ("unclassified", Some(16.0)),
    ("residential", Some(18.0)),
    ("living_street", Some(6.0)),
    ("service", Some(14.0)),
    ("road", Some(12.0)),
    ("track", Some(12.0)),
    ("path", Some(12.0)),
    ("footway", Some(6.0)),
    ("pedestrian", Some(6.0)),
    ("cycleway", Some(18.0)),
];

impl Default for SpeedLimits {
    fn default() -> Self {
        let mut speed_limits = Self::empty();
        speed_limits.set_table(NetworkMode::Drive, DRIVE_SPEEDS);
        speed_limits.set_table(NetworkMode::Bike, BIKE_SPEEDS);
        speed_limits
    }
}

impl SpeedLimits {
    /// No tables at all.
    pub fn empty() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Replaces the table for a mode.
    pub fn set_table<'a>(
        &mut self,
        network_mode: NetworkMode,
        speeds: impl IntoIterator<Item = (&'a str, Option<f64>)>,
    ) {
        let table = speeds
            .into_iter()
            .map(|(road_class, speed)| (road_class.to_string(), speed))
            .collect();
        self.tables.insert(network_mode, table);
    }

    pub fn table(&self, network_mode: NetworkMode) -> Option<&HashMap<String, Option<f64>>> {
        self.tables.get(&network_mode)
    }

    /// Modes with a table, in declaration order.
    pub fn supported_modes(&self) -> Vec<NetworkMode> {
        NetworkMode::ALL
            .into_iter()
            .filter(|mode| self.tables.contains_key(mode))
            .collect()
    }

    /// The mode's table, or [`CentralityError::UnsupportedMode`].
    pub fn require_table(&self, network_mode: NetworkMode) -> Result<&HashMap<String, Option<f64>>> {
        self.table(network_mode).ok_or_else(|| {
            let available = self
                .supported_modes()
                .iter()
                .map(|mode| mode.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            log::error!(
                "Speeds for {} not implemented yet. Please choose one of the following: {}",
                network_mode,
                available
            );
            CentralityError::UnsupportedMode {
                mode: network_mode,
                available,
            }
        })
    }

    /// Usable speed for a road class, `None` if absent, unsupported or non-positive.
    pub fn speed_for(&self, network_mode: NetworkMode, road_class: &str) -> Option<f64> {
        self.table(network_mode)?
            .get(road_class)
            .copied()
            .flatten()
            .filter(|speed| speed.is_finite() && *speed > 0.0)
    }
}

/// Annotates every edge with `speed_kph` and `travel_time` (seconds).
///
/// Edges whose road class has no usable speed are left without a travel time and so drop
/// out of travel-time routing. The graph is untouched when the mode has no table.
pub fn add_travel_times(
    graph: &mut NetworkGraph,
    network_mode: NetworkMode,
    speed_limits: &SpeedLimits,
) -> Result<usize> {
    speed_limits.require_table(network_mode)?;
    let mut annotated = 0;
    for edge_payload in graph.graph.edge_weights_mut() {
        let speed_kph = edge_payload
            .highway
            .as_deref()
            .and_then(|road_class| speed_limits.speed_for(network_mode, road_class));
        let length = edge_payload.length;
        edge_payload.speed_kph = speed_kph;
        edge_payload.travel_time = speed_kph.map(|speed| length / (speed * KPH_TO_M_S));
        if edge_payload.travel_time.is_some() {
            annotated += 1;
        }
    }
    let skipped = graph.edge_count() - annotated;
    if skipped > 0 {
        log::debug!(
            "{} of {} edges have no speed for {} and are excluded from travel time routing.",
            skipped,
            graph.edge_count(),
            network_mode
        );
    }
    Ok(annotated)
}
