use crate::error::ControllerError;
use crate::utils::euler2mat;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How orientation is interpolated between the two ends of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMethod {
    /// Quintic blend of each Euler angle independently.
    Euler,
    /// Quintic blend of the angle along the relative rotation axis.
    Rotation,
}

impl fmt::Display for OrientationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrientationMethod::Euler => write!(f, "euler"),
            OrientationMethod::Rotation => write!(f, "rotation"),
        }
    }
}

impl FromStr for OrientationMethod {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "euler" => Ok(OrientationMethod::Euler),
            "rotation" => Ok(OrientationMethod::Rotation),
            other => Err(ControllerError::InvalidConfig(format!(
                "unknown orientation method `{other}` (expected `euler` or `rotation`)"
            ))),
        }
    }
}

/// Target pose at the end of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ViaPoint {
    pub position: Vector3<f64>,
    pub orientation: Matrix3<f64>,
}

impl ViaPoint {
    pub fn new(position: Vector3<f64>, orientation: Matrix3<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_rpy(position: [f64; 3], rpy: [f64; 3]) -> Self {
        Self {
            position: Vector3::from(position),
            orientation: euler2mat(&Vector3::from(rpy)),
        }
    }
}

/// One evaluated sample of a Cartesian reference trajectory.
///
/// `orientation` holds Euler angles for [`OrientationMethod::Euler`] and a
/// rotation vector relative to the segment's final orientation for
/// [`OrientationMethod::Rotation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Absolute simulation time of the sample.
    pub time: f64,
    /// Time since the owning segment started.
    pub elapsed: f64,
    pub position: Vector3<f64>,
    pub orientation: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
}
