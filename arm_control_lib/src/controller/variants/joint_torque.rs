use crate::backend::SimulationBackend;
use crate::controller::{Controller, ControllerCore};
use crate::error::{ControllerError, Result};
use nalgebra::DVector;
use tracing::debug;

/// Direct joint-torque control: the scaled action is the torque goal, with
/// gravity compensation added on every tick.
#[derive(Debug, Clone)]
pub struct JointTorqueController {
    core: ControllerCore,
    goal_torque: DVector<f64>,
}

impl JointTorqueController {
    pub fn new(core: ControllerCore) -> Result<Self> {
        if core.control_dim() != core.joint_dim() {
            return Err(ControllerError::dimension(
                "joint torque control range",
                core.joint_dim(),
                core.control_dim(),
            ));
        }
        let goal_torque = DVector::zeros(core.joint_dim());
        Ok(Self { core, goal_torque })
    }

    /// Scale `action` from the control input range into a torque goal.
    /// The backend is not queried.
    pub fn set_goal(&mut self, action: &[f64]) -> Result<()> {
        self.goal_torque = self.core.scale_action(&DVector::from_column_slice(action))?;
        debug!("Joint torque goal set: {:?}", self.goal_torque.as_slice());
        Ok(())
    }

    pub fn goal_torque(&self) -> &DVector<f64> {
        &self.goal_torque
    }
}

impl Controller for JointTorqueController {
    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControllerCore {
        &mut self.core
    }

    fn run_controller(&mut self, sim: &mut dyn SimulationBackend) -> Result<DVector<f64>> {
        self.core.update(sim, false);
        let torques = &self.goal_torque + self.core.torque_compensation(sim);
        self.core.invalidate();
        Ok(torques)
    }

    fn reset_goal(&mut self) -> Result<()> {
        self.goal_torque = DVector::zeros(self.core.joint_dim());
        Ok(())
    }

    fn name(&self) -> Result<&str> {
        Ok("JOINT_TORQUE")
    }
}
