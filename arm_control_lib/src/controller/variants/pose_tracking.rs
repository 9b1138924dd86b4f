use super::gain_vector;
use crate::backend::SimulationBackend;
use crate::controller::{Controller, ControllerCore};
use crate::error::{ControllerError, Result};
use crate::trajectory::SegmentStart;
use crate::types::{GainsConfig, OrientationMethod, ViaPoint};
use crate::utils::{relative_rotation_vector, Nums};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector6};
use tracing::debug;

const PSEUDO_INVERSE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
enum PoseGoal {
    Hold {
        position: Vector3<f64>,
        orientation: Matrix3<f64>,
    },
    Track,
}

/// End-effector pose reference for one tick, all in world frame.
struct Reference {
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    orientation: Matrix3<f64>,
    angular_velocity: Vector3<f64>,
}

/// Tracks minimum-jerk Cartesian segments with a Jacobian-transpose PD law,
/// plus a mass-weighted posture term toward the initial joints that acts
/// only in the Jacobian nullspace.
#[derive(Debug, Clone)]
pub struct PoseTrackingController {
    core: ControllerCore,
    kp: DVector<f64>,
    kd: DVector<f64>,
    kp_null: DVector<f64>,
    kd_null: DVector<f64>,
    goal: PoseGoal,
}

impl PoseTrackingController {
    /// `kp`/`kd` act on the 6-D pose error, `kp_null`/`kd_null` on the
    /// joint posture error.
    pub fn new(
        core: ControllerCore,
        kp: impl Into<Nums>,
        kd: impl Into<Nums>,
        kp_null: impl Into<Nums>,
        kd_null: impl Into<Nums>,
    ) -> Result<Self> {
        let joint_dim = core.joint_dim();
        let goal = PoseGoal::Hold {
            position: *core.initial_ee_pos(),
            orientation: *core.initial_ee_ori_mat(),
        };

        Ok(Self {
            kp: gain_vector("kp", kp, 6)?,
            kd: gain_vector("kd", kd, 6)?,
            kp_null: gain_vector("kp_null", kp_null, joint_dim)?,
            kd_null: gain_vector("kd_null", kd_null, joint_dim)?,
            core,
            goal,
        })
    }

    pub fn from_gains(core: ControllerCore, gains: &GainsConfig) -> Result<Self> {
        Self::new(
            core,
            gains.kp.clone(),
            gains.kd.clone(),
            gains.kp_null.clone(),
            gains.kd_null.clone(),
        )
    }

    /// Start a new segment toward `target` at the backend's current time and
    /// follow it from the next tick on.
    pub fn plan_to(
        &mut self,
        sim: &dyn SimulationBackend,
        target: &ViaPoint,
        duration: f64,
        start: SegmentStart,
    ) -> Result<()> {
        self.core
            .build_min_jerk_trajectory(sim, duration, target, start)?;
        self.goal = PoseGoal::Track;
        Ok(())
    }

    pub fn is_tracking(&self) -> bool {
        self.goal == PoseGoal::Track
    }

    /// True once the active segment has run its full duration (or when none
    /// is being tracked).
    pub fn segment_finished(&self, time: f64) -> bool {
        match (&self.goal, self.core.trajectory().active_segment()) {
            (PoseGoal::Track, Some(segment)) => segment.is_finished(time),
            _ => true,
        }
    }

    fn reference(&mut self, sim: &dyn SimulationBackend) -> Result<Reference> {
        match &self.goal {
            PoseGoal::Hold {
                position,
                orientation,
            } => Ok(Reference {
                position: *position,
                velocity: Vector3::zeros(),
                orientation: *orientation,
                angular_velocity: Vector3::zeros(),
            }),
            PoseGoal::Track => {
                let point = self.core.next_desired_point(sim)?;
                let segment = self
                    .core
                    .trajectory()
                    .active_segment()
                    .ok_or(ControllerError::NoActiveSegment)?;

                let angular_velocity = match segment.method() {
                    OrientationMethod::Euler => self
                        .core
                        .euler_rate_to_world_angular_velocity(&point.angular_velocity),
                    OrientationMethod::Rotation => point.angular_velocity,
                };

                Ok(Reference {
                    position: point.position,
                    velocity: point.velocity,
                    orientation: segment.reference_rotation(&point),
                    angular_velocity,
                })
            }
        }
    }
}

impl Controller for PoseTrackingController {
    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControllerCore {
        &mut self.core
    }

    fn run_controller(&mut self, sim: &mut dyn SimulationBackend) -> Result<DVector<f64>> {
        self.core.update(sim, false);
        let reference = self.reference(sim)?;
        let state = self.core.snapshot();
        let n = state.joint_dim();

        let pos_err = reference.position - state.ee_pos;
        let ori_err = relative_rotation_vector(&state.ee_ori_mat, &reference.orientation);
        let vel_err = reference.velocity - state.ee_pos_vel;
        let ang_vel_err = reference.angular_velocity - state.ee_ori_vel;

        let pose_err = Vector6::new(pos_err.x, pos_err.y, pos_err.z, ori_err.x, ori_err.y, ori_err.z);
        let twist_err = Vector6::new(
            vel_err.x,
            vel_err.y,
            vel_err.z,
            ang_vel_err.x,
            ang_vel_err.y,
            ang_vel_err.z,
        );
        let wrench = DVector::from_iterator(
            6,
            (0..6).map(|i| self.kp[i] * pose_err[i] + self.kd[i] * twist_err[i]),
        );

        let jacobian = DMatrix::from_column_slice(6, n, state.j_full.as_slice());
        let task_torques = jacobian.transpose() * &wrench;

        let posture_acc = self
            .kp_null
            .component_mul(&(self.core.initial_joint() - &state.joint_pos))
            - self.kd_null.component_mul(&state.joint_vel);
        let posture_torques = &state.mass_matrix * posture_acc;

        let jacobian_pinv = jacobian
            .clone()
            .pseudo_inverse(PSEUDO_INVERSE_EPS)
            .map_err(|e| ControllerError::Numerical(e.to_string()))?;
        let nullspace = DMatrix::identity(n, n) - jacobian.transpose() * jacobian_pinv.transpose();

        debug!(
            "Pose error: |p|={:.5} m, |r|={:.5} rad",
            pos_err.norm(),
            ori_err.norm()
        );

        let torques =
            task_torques + nullspace * posture_torques + self.core.torque_compensation(sim);
        self.core.invalidate();
        Ok(torques)
    }

    /// Hold the current measured end-effector pose.
    fn reset_goal(&mut self) -> Result<()> {
        let state = self.core.snapshot();
        self.goal = PoseGoal::Hold {
            position: state.ee_pos,
            orientation: state.ee_ori_mat,
        };
        Ok(())
    }

    fn name(&self) -> Result<&str> {
        Ok("POSE_TRACKING")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::DhChainSim;
    use crate::types::{ActuatorLimits, DHParameter, JointIndexes, LinkConfig, SimulationConfig};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn sim_config(initial_qpos: Vec<f64>) -> SimulationConfig {
        let link = |alpha: f64, d: f64, mass: f64| LinkConfig {
            dh: DHParameter {
                a: 0.05,
                alpha,
                d,
                theta: 0.0,
            },
            mass,
        };
        SimulationConfig {
            timestep: 0.002,
            gravity: [0.0, 0.0, -9.81],
            site_name: "ee".to_string(),
            base_offset: [0.0, 0.0, 0.0],
            links: vec![
                link(-FRAC_PI_2, 0.3, 2.0),
                link(FRAC_PI_2, 0.0, 1.5),
                link(-FRAC_PI_2, 0.35, 1.0),
                link(0.0, 0.1, 0.5),
            ],
            passive_joints: 0,
            passive_mass: 0.1,
            armature: 0.2,
            damping: 0.0,
            initial_qpos: Some(initial_qpos),
        }
    }

    const Q0: [f64; 4] = [0.1, 0.6, -0.2, 0.8];

    fn controller(sim: &mut DhChainSim) -> PoseTrackingController {
        let core = ControllerCore::new(
            sim,
            "ee",
            JointIndexes::contiguous(0..4),
            ActuatorLimits::from_nums(-100.0, 100.0, 4).unwrap(),
        )
        .unwrap();
        PoseTrackingController::new(core, 100.0, 20.0, 10.0, 2.0 * 10.0_f64.sqrt()).unwrap()
    }

    #[test]
    fn test_holding_initial_pose_only_compensates_gravity() {
        let mut sim = DhChainSim::from_config(&sim_config(Q0.to_vec())).unwrap();
        let mut controller = controller(&mut sim);
        assert!(!controller.is_tracking());

        let torques = controller.run_controller(&mut sim).unwrap();
        let bias = DVector::from_column_slice(sim.qfrc_bias());
        assert_abs_diff_eq!(torques, bias, epsilon = 1e-9);
        assert!(controller.core().is_stale());
    }

    #[test]
    fn test_gain_length_must_match() {
        let mut sim = DhChainSim::from_config(&sim_config(Q0.to_vec())).unwrap();
        let core = ControllerCore::new(
            &mut sim,
            "ee",
            JointIndexes::contiguous(0..4),
            ActuatorLimits::from_nums(-100.0, 100.0, 4).unwrap(),
        )
        .unwrap();
        let result = PoseTrackingController::new(core, vec![1.0; 5], 1.0, 1.0, 1.0);
        assert!(matches!(
            result,
            Err(ControllerError::DimensionMismatch {
                expected: 6,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_tracks_reachable_pose() {
        let q_target = [0.25, 0.45, -0.1, 0.65];
        let target_sim = DhChainSim::from_config(&sim_config(q_target.to_vec())).unwrap();
        let site = target_sim.site_id("ee").unwrap();
        let target = ViaPoint::new(target_sim.site_xpos(site), target_sim.site_xmat(site));

        let mut sim = DhChainSim::from_config(&sim_config(Q0.to_vec())).unwrap();
        let mut controller = controller(&mut sim);
        controller
            .plan_to(&sim, &target, 1.0, SegmentStart::Fresh)
            .unwrap();
        assert!(controller.is_tracking());

        for _ in 0..2000 {
            let torques = controller.compute_torques(&mut sim).unwrap();
            sim.step_joints(&[0, 1, 2, 3], &torques).unwrap();
        }
        assert!(controller.segment_finished(sim.time()));

        let pos_err = (sim.site_xpos(site) - target.position).norm();
        let ori_err = relative_rotation_vector(&sim.site_xmat(site), &target.orientation).norm();
        assert!(pos_err < 2e-3, "position error {pos_err}");
        assert!(ori_err < 1e-2, "orientation error {ori_err}");
        assert_eq!(controller.core().trajectory().history().len(), 2000);
    }

    #[test]
    fn test_reset_goal_holds_current_pose() {
        let mut sim = DhChainSim::from_config(&sim_config(Q0.to_vec())).unwrap();
        let mut controller = controller(&mut sim);
        let target = ViaPoint::new(Vector3::new(0.3, 0.1, 0.5), Matrix3::identity());
        controller
            .plan_to(&sim, &target, 2.0, SegmentStart::Fresh)
            .unwrap();

        controller.reset_goal().unwrap();
        assert!(!controller.is_tracking());
        assert!(controller.segment_finished(0.0));
        assert_eq!(controller.name().unwrap(), "POSE_TRACKING");
    }
}
