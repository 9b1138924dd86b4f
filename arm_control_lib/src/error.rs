use thiserror::Error;

/// Errors raised by the controller base, its trajectory generator and the
/// reference backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    /// Text was handed to a numeric broadcast.
    #[error("only numeric inputs are supported by nums2array, got text {0:?}")]
    InvalidInputType(String),

    /// The controller variant does not provide this capability.
    #[error("`{capability}` is not implemented by this controller")]
    NotImplemented { capability: &'static str },

    #[error("invalid controller configuration: {0}")]
    InvalidConfig(String),

    /// The backend has no site with this name.
    #[error("unknown site `{0}`")]
    UnknownSite(String),

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{what}: expected length {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Trajectory segments need a strictly positive duration.
    #[error("trajectory duration must be positive, got {0}")]
    InvalidDuration(f64),

    #[error("trajectory queried at t={time:.6} before its start at t={start:.6}")]
    QueryBeforeStart { time: f64, start: f64 },

    #[error("no trajectory segment has been built")]
    NoActiveSegment,

    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl ControllerError {
    pub fn not_implemented(capability: &'static str) -> Self {
        Self::NotImplemented { capability }
    }

    pub fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
