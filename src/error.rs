use crate::config::NetworkMode;
use crate::graph::NodeKey;

/// Result type for centrality operations.
pub type Result<T> = std::result::Result<T, CentralityError>;

/// Errors that abort a centrality run.
#[derive(Debug, thiserror::Error)]
pub enum CentralityError {
    #[error("Failed to access raster data at '{path}': {reason}")]
    DataAccess { path: String, reason: String },

    #[error("Node {node} at (lat {lat}, lon {lon}) lies outside the raster extent.")]
    OutOfBounds { node: NodeKey, lat: f64, lon: f64 },

    #[error("Place not found: '{0}'. Please check the spelling and try again.")]
    PlaceNotFound(String),

    #[error("Speeds for {mode} not implemented yet. Please choose one of the following: {available}")]
    UnsupportedMode { mode: NetworkMode, available: String },

    #[error("Node {0} is not part of the network.")]
    UnknownNode(NodeKey),

    #[error("Invalid geometry for edge {start}-{end} (key {key}): {reason}")]
    InvalidGeometry {
        start: NodeKey,
        end: NodeKey,
        key: usize,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("None of the {attempted} sampled pairs produced a usable route.")]
    AllSamplesFailed { attempted: usize },
}

impl CentralityError {
    pub(crate) fn data_access(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        CentralityError::DataAccess {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}
