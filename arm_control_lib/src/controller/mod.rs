//! Controller base contract and the state every variant shares.
//!
//! One tick of the stepping loop is `compute_torques`: the variant reads the
//! (lazily refreshed) snapshot, produces raw torques in `run_controller`, the
//! cache is invalidated for the next tick and the result is clipped to the
//! actuator limits.

pub mod base;
pub mod scaling;
pub mod state_cache;
pub mod variants;

pub use base::ControllerCore;
pub use scaling::ActionScaler;
pub use state_cache::StateCache;
pub use variants::*;

use crate::backend::SimulationBackend;
use crate::error::{ControllerError, Result};
use nalgebra::{DVector, UnitQuaternion, Vector3};
use tracing::debug;

pub trait Controller {
    fn core(&self) -> &ControllerCore;

    fn core_mut(&mut self) -> &mut ControllerCore;

    /// Turn the current snapshot and goal into raw (unclipped) joint torques.
    ///
    /// Implementations must leave the state cache invalidated
    /// (`self.core_mut().invalidate()`) so the next tick re-reads the backend.
    fn run_controller(&mut self, sim: &mut dyn SimulationBackend) -> Result<DVector<f64>>;

    /// Reset the variant's goal, usually to zero.
    fn reset_goal(&mut self) -> Result<()> {
        Err(ControllerError::not_implemented("reset_goal"))
    }

    fn name(&self) -> Result<&str> {
        Err(ControllerError::not_implemented("name"))
    }

    /// Hook for variants whose kinematic model tracks a mobile base separately
    /// from the backend. `base_ori` is the base orientation in world frame.
    fn update_base_pose(&mut self, _base_pos: &Vector3<f64>, _base_ori: &UnitQuaternion<f64>) {}

    fn update_initial_joints(
        &mut self,
        sim: &mut dyn SimulationBackend,
        initial_joints: &[f64],
    ) -> Result<()> {
        self.core_mut().update_initial_joints(sim, initial_joints)
    }

    /// Refresh the cached snapshot if stale or `force` is set.
    fn update(&mut self, sim: &mut dyn SimulationBackend, force: bool) -> bool {
        self.core_mut().update(sim, force)
    }

    /// One control tick: run the variant, invalidate the cache, clip.
    fn compute_torques(&mut self, sim: &mut dyn SimulationBackend) -> Result<DVector<f64>> {
        let raw = self.run_controller(sim)?;

        let core = self.core_mut();
        core.invalidate();
        let torques = core.clip_torques(&raw)?;
        debug!("Torque command: raw |τ|={:.4}, clipped |τ|={:.4}", raw.norm(), torques.norm());
        core.record_torques(torques.clone());

        Ok(torques)
    }

    fn actuator_limits(&self) -> (&DVector<f64>, &DVector<f64>) {
        self.core().actuator_limits()
    }

    fn control_limits(&self) -> (&DVector<f64>, &DVector<f64>) {
        self.core().control_limits()
    }
}
