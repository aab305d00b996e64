//! Error type of the driver
use crate::types::{LifecycleStage, MarkerId};

/// Errors raised while setting up or stepping a flow driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Invalid or missing configuration, incompatible communicator, ...
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested marker is missing from the tag list or the tag to id map
    #[error("marker {name:?} not found among the solver boundary markers")]
    MarkerNotFound {
        /// Marker tag
        name: String,
    },

    /// Fatal error inside one of the lifecycle calls
    #[error("solver failed in {stage} at time iteration {time_iter}: {message}")]
    Solver {
        /// Failing lifecycle call
        stage: LifecycleStage,
        /// Time iteration of the failing step
        time_iter: usize,
        /// Backend diagnostic
        message: String,
    },

    /// Step requested after the run already stopped or failed
    #[error("driver is {0} and accepts no further time steps")]
    Terminated(&'static str),

    /// Time iterations must advance by exactly one
    #[error("time iteration {got} requested, expected {expected}")]
    OutOfOrder {
        /// Next valid time iteration
        expected: usize,
        /// Requested time iteration
        got: usize,
    },

    /// Boundary data requested without a completed, continuing time step
    #[error("boundary data requested before a completed time step")]
    NoCompletedStep,

    /// Vertex index beyond the vertex count of the marker
    #[error("vertex {index} out of range for marker {marker} with {count} vertices")]
    VertexOutOfRange {
        /// Marker id
        marker: MarkerId,
        /// Requested vertex
        index: usize,
        /// Vertex count of the marker
        count: usize,
    },

    /// Io error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed toml file
    #[error("parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Hdf5 error, kept as message
    #[cfg(feature = "hdf5")]
    #[error("hdf5 error: {0}")]
    Hdf5(String),
}

#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for DriverError {
    fn from(e: hdf5::Error) -> Self {
        Self::Hdf5(e.to_string())
    }
}

impl DriverError {
    /// Shorthand for [`DriverError::Solver`]
    pub fn solver<M: Into<String>>(stage: LifecycleStage, time_iter: usize, message: M) -> Self {
        Self::Solver {
            stage,
            time_iter,
            message: message.into(),
        }
    }
}

/// Result alias used throughout this crate
pub type Result<T> = std::result::Result<T, DriverError>;
