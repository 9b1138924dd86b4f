use super::QuinticBlend;
use crate::types::OrientationMethod;
use crate::utils::{axis_magnitude, mat2euler, relative_rotation_vector, ROTATION_EPSILON};
use nalgebra::{Matrix3, Vector3};

/// Orientation half of a trajectory segment.
#[derive(Debug, Clone, PartialEq)]
pub enum OrientationPlan {
    /// Euler angles blended independently. Not geodesic, and subject to the
    /// usual Euler singularities.
    Euler {
        initial: Vector3<f64>,
        target: Vector3<f64>,
    },
    /// Angle along the fixed relative-rotation axis, blended from the full
    /// `magnitude` down to zero.
    Rotation {
        magnitude: f64,
        direction: Vector3<f64>,
    },
    /// Initial and target orientations coincide.
    Stationary,
}

impl OrientationPlan {
    pub fn euler(initial: Vector3<f64>, target: Vector3<f64>) -> Self {
        OrientationPlan::Euler { initial, target }
    }

    pub fn euler_from_matrices(initial: &Matrix3<f64>, target: &Matrix3<f64>) -> Self {
        Self::euler(mat2euler(initial), mat2euler(target))
    }

    pub fn rotation(initial: &Matrix3<f64>, target: &Matrix3<f64>) -> Self {
        let rotation_vector = relative_rotation_vector(initial, target);
        if rotation_vector.norm() < ROTATION_EPSILON {
            return OrientationPlan::Stationary;
        }

        let (magnitude, direction) = axis_magnitude(&rotation_vector);
        OrientationPlan::Rotation {
            magnitude,
            direction,
        }
    }

    pub fn method(&self) -> OrientationMethod {
        match self {
            OrientationPlan::Euler { .. } => OrientationMethod::Euler,
            OrientationPlan::Rotation { .. } | OrientationPlan::Stationary => {
                OrientationMethod::Rotation
            }
        }
    }

    /// `(orientation, angular_velocity)` under `blend`.
    ///
    /// For the rotation plan the orientation is `(magnitude * s - magnitude) *
    /// direction`: it starts at minus the full rotation and reaches zero at the
    /// end of the segment, i.e. it is the rotation still separating the
    /// reference from the target orientation, with the opposite sign.
    pub fn evaluate(&self, blend: &QuinticBlend) -> (Vector3<f64>, Vector3<f64>) {
        match self {
            OrientationPlan::Euler { initial, target } => {
                let (orientation, rate, _) = blend.interpolate(initial, target);
                (orientation, rate)
            }
            OrientationPlan::Rotation {
                magnitude,
                direction,
            } => {
                let magnitude_traj = magnitude * blend.position - magnitude;
                let magnitude_vel = magnitude * blend.velocity;
                (direction * magnitude_traj, direction * magnitude_vel)
            }
            OrientationPlan::Stationary => (Vector3::zeros(), Vector3::zeros()),
        }
    }
}
