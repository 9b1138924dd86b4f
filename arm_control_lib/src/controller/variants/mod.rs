pub mod joint_torque;
pub mod pose_tracking;

pub use joint_torque::JointTorqueController;
pub use pose_tracking::PoseTrackingController;

use crate::error::{ControllerError, Result};
use crate::utils::{nums2array, Nums};
use nalgebra::DVector;

/// Broadcast a gain to `dim` entries and insist on the exact length.
pub(crate) fn gain_vector(
    what: &'static str,
    gain: impl Into<Nums>,
    dim: usize,
) -> Result<DVector<f64>> {
    let gain = nums2array(gain, dim)?;
    if gain.len() != dim {
        return Err(ControllerError::dimension(what, dim, gain.len()));
    }
    Ok(gain)
}
