use crate::error::{ControllerError, Result};
use crate::utils::{nums2array, Nums};
use nalgebra::DVector;

/// Per-actuator torque bounds, fixed when the controller is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorLimits {
    min: DVector<f64>,
    max: DVector<f64>,
}

impl ActuatorLimits {
    pub fn new(min: DVector<f64>, max: DVector<f64>) -> Result<Self> {
        check_bounds("actuator range", &min, &max, false)?;
        Ok(Self { min, max })
    }

    /// Broadcast scalar-or-array bounds to `dim` actuators.
    pub fn from_nums(min: impl Into<Nums>, max: impl Into<Nums>, dim: usize) -> Result<Self> {
        let min = sized("actuator_min", nums2array(min, dim)?, dim)?;
        let max = sized("actuator_max", nums2array(max, dim)?, dim)?;
        Self::new(min, max)
    }

    pub fn min(&self) -> &DVector<f64> {
        &self.min
    }

    pub fn max(&self) -> &DVector<f64> {
        &self.max
    }

    pub fn dim(&self) -> usize {
        self.min.len()
    }

    /// Element-wise clamp into `[min, max]`.
    pub fn clip(&self, torques: &DVector<f64>) -> Result<DVector<f64>> {
        if torques.len() != self.dim() {
            return Err(ControllerError::dimension("torques", self.dim(), torques.len()));
        }
        Ok(clamp_elementwise(torques, &self.min, &self.max))
    }
}

/// Input and output bounds of a controller's action space. Actions are
/// clamped to the input range, then mapped affinely onto the output range.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRange {
    pub input_min: DVector<f64>,
    pub input_max: DVector<f64>,
    pub output_min: DVector<f64>,
    pub output_max: DVector<f64>,
}

impl ControlRange {
    pub fn new(
        input_min: DVector<f64>,
        input_max: DVector<f64>,
        output_min: DVector<f64>,
        output_max: DVector<f64>,
    ) -> Result<Self> {
        check_bounds("control input range", &input_min, &input_max, true)?;
        check_bounds("control output range", &output_min, &output_max, false)?;
        if output_min.len() != input_min.len() {
            return Err(ControllerError::dimension(
                "control output range",
                input_min.len(),
                output_min.len(),
            ));
        }
        Ok(Self {
            input_min,
            input_max,
            output_min,
            output_max,
        })
    }

    pub fn from_nums(
        input_min: impl Into<Nums>,
        input_max: impl Into<Nums>,
        output_min: impl Into<Nums>,
        output_max: impl Into<Nums>,
        control_dim: usize,
    ) -> Result<Self> {
        Self::new(
            sized("input_min", nums2array(input_min, control_dim)?, control_dim)?,
            sized("input_max", nums2array(input_max, control_dim)?, control_dim)?,
            sized("output_min", nums2array(output_min, control_dim)?, control_dim)?,
            sized("output_max", nums2array(output_max, control_dim)?, control_dim)?,
        )
    }

    /// Pass-through range over the actuator limits.
    pub fn from_actuator_limits(limits: &ActuatorLimits) -> Self {
        Self {
            input_min: limits.min.clone(),
            input_max: limits.max.clone(),
            output_min: limits.min.clone(),
            output_max: limits.max.clone(),
        }
    }

    pub fn dim(&self) -> usize {
        self.input_min.len()
    }
}

pub(crate) fn clamp_elementwise(
    values: &DVector<f64>,
    min: &DVector<f64>,
    max: &DVector<f64>,
) -> DVector<f64> {
    values.zip_zip_map(min, max, |v, lo, hi| v.max(lo).min(hi))
}

fn sized(what: &'static str, values: DVector<f64>, dim: usize) -> Result<DVector<f64>> {
    if values.len() != dim {
        return Err(ControllerError::dimension(what, dim, values.len()));
    }
    Ok(values)
}

fn check_bounds(
    what: &'static str,
    min: &DVector<f64>,
    max: &DVector<f64>,
    strict: bool,
) -> Result<()> {
    if min.len() != max.len() {
        return Err(ControllerError::dimension(what, min.len(), max.len()));
    }
    for (i, (lo, hi)) in min.iter().zip(max.iter()).enumerate() {
        let ordered = if strict { lo < hi } else { lo <= hi };
        if !ordered {
            return Err(ControllerError::InvalidConfig(format!(
                "{what}[{i}]: min {lo} must be {} max {hi}",
                if strict { "below" } else { "at most" }
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_bounds_torques() {
        let limits = ActuatorLimits::from_nums(-10.0, 10.0, 3).unwrap();
        let clipped = limits
            .clip(&DVector::from_vec(vec![-25.0, 3.0, 11.0]))
            .unwrap();
        assert_eq!(clipped.as_slice(), &[-10.0, 3.0, 10.0]);
    }

    #[test]
    fn test_clip_is_identity_in_range() {
        let limits = ActuatorLimits::from_nums(vec![-1.0, -2.0], vec![1.0, 2.0], 2).unwrap();
        let torques = DVector::from_vec(vec![0.5, -1.999]);
        let once = limits.clip(&torques).unwrap();
        assert_eq!(once, torques);
        assert_eq!(limits.clip(&once).unwrap(), torques);
    }

    #[test]
    fn test_clip_rejects_wrong_length() {
        let limits = ActuatorLimits::from_nums(-1.0, 1.0, 3).unwrap();
        assert!(limits.clip(&DVector::zeros(2)).is_err());
    }

    #[test]
    fn test_inverted_actuator_range_is_rejected() {
        assert!(matches!(
            ActuatorLimits::from_nums(1.0, -1.0, 2),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_wrong_length_actuator_range_is_rejected() {
        assert_eq!(
            ActuatorLimits::from_nums(vec![-1.0; 6], 1.0, 7).unwrap_err(),
            ControllerError::dimension("actuator_min", 7, 6)
        );
    }

    #[test]
    fn test_degenerate_input_range_is_rejected() {
        assert!(ControlRange::from_nums(1.0, 1.0, -1.0, 1.0, 2).is_err());
    }
}
