use super::{ActionScaler, StateCache};
use crate::backend::SimulationBackend;
use crate::error::{ControllerError, Result};
use crate::trajectory::{SegmentStart, TrajectoryGenerator, TrajectorySegment};
use crate::types::{
    ActuatorLimits, ControlRange, ControllerConfig, JointIndexes, KinematicSnapshot,
    OrientationMethod, TrajectoryPoint, ViaPoint,
};
use crate::utils::{euler_rate_to_body_angular_velocity, euler_rate_to_world_angular_velocity};
use nalgebra::{DVector, Matrix3, Vector3};
use tracing::{debug, info};

/// State shared by every controller variant of one arm: the cached snapshot,
/// actuator limits, action scaling, the initial reference configuration and
/// the trajectory generator with its history.
#[derive(Debug, Clone)]
pub struct ControllerCore {
    eef_name: String,
    joint_dim: usize,
    actuator_limits: ActuatorLimits,
    scaler: ActionScaler,
    cache: StateCache,
    model_timestep: f64,
    initial_joint: DVector<f64>,
    initial_ee_pos: Vector3<f64>,
    initial_ee_ori_mat: Matrix3<f64>,
    initial_ee_ori_vel: Vector3<f64>,
    torques: Option<DVector<f64>>,
    trajectory: TrajectoryGenerator,
}

impl ControllerCore {
    /// Attach to `eef_name` on the backend and take the first snapshot, whose
    /// pose and joint configuration become the initial reference.
    ///
    /// Index sets and actuator limits are checked against the backend here,
    /// so a malformed setup fails at construction rather than mid-episode.
    pub fn new(
        sim: &mut dyn SimulationBackend,
        eef_name: &str,
        joint_indexes: JointIndexes,
        actuator_limits: ActuatorLimits,
    ) -> Result<Self> {
        joint_indexes.validate(sim.nq(), sim.nv())?;
        let joint_dim = joint_indexes.dim();
        if actuator_limits.dim() != joint_dim {
            return Err(ControllerError::dimension(
                "actuator range",
                joint_dim,
                actuator_limits.dim(),
            ));
        }

        let site = sim.site_id(eef_name)?;
        let model_timestep = sim.timestep();

        let mut cache = StateCache::new(site, joint_indexes);
        sim.forward();
        cache.update(sim, true);

        let snapshot = cache.snapshot();
        let initial_joint = snapshot.joint_pos.clone();
        let initial_ee_pos = snapshot.ee_pos;
        let initial_ee_ori_mat = snapshot.ee_ori_mat;
        let initial_ee_ori_vel = snapshot.ee_ori_vel;

        info!(
            "Controller attached to `{}`: {} joints, dt={:.4}s, ee=({:.3}, {:.3}, {:.3})",
            eef_name,
            joint_dim,
            model_timestep,
            initial_ee_pos.x,
            initial_ee_pos.y,
            initial_ee_pos.z
        );

        Ok(Self {
            eef_name: eef_name.to_string(),
            joint_dim,
            scaler: ActionScaler::new(ControlRange::from_actuator_limits(&actuator_limits)),
            actuator_limits,
            cache,
            model_timestep,
            initial_joint,
            initial_ee_pos,
            initial_ee_ori_mat,
            initial_ee_ori_vel,
            torques: None,
            trajectory: TrajectoryGenerator::new(OrientationMethod::Euler),
        })
    }

    /// Build from a loaded configuration: limits, optional control range and
    /// trajectory settings.
    pub fn from_config(sim: &mut dyn SimulationBackend, config: &ControllerConfig) -> Result<Self> {
        let dim = config.joint_indexes.dim();
        let limits = ActuatorLimits::from_nums(
            config.actuator_range.min.clone(),
            config.actuator_range.max.clone(),
            dim,
        )?;

        let trajectory = TrajectoryGenerator::new(config.trajectory.method)
            .with_history_limit(config.trajectory.history_limit)
            .with_rounded_final_orientation(config.trajectory.round_final_orientation);

        let core = Self::new(sim, &config.eef_name, config.joint_indexes.clone(), limits)?
            .with_trajectory(trajectory);

        match &config.control {
            Some(control) => Ok(core.with_control_range(ControlRange::from_nums(
                control.input_min.clone(),
                control.input_max.clone(),
                control.output_min.clone(),
                control.output_max.clone(),
                dim,
            )?)),
            None => Ok(core),
        }
    }

    /// Replace the default pass-through action range.
    pub fn with_control_range(mut self, range: ControlRange) -> Self {
        debug!("Control range set for {} action dimensions", range.dim());
        self.scaler = ActionScaler::new(range);
        self
    }

    pub fn with_trajectory(mut self, trajectory: TrajectoryGenerator) -> Self {
        self.trajectory = trajectory;
        self
    }

    /// Refresh the snapshot if stale or `force` is set.
    pub fn update(&mut self, sim: &mut dyn SimulationBackend, force: bool) -> bool {
        self.cache.update(sim, force)
    }

    /// Mark the snapshot stale; called whenever a torque command is produced.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn is_stale(&self) -> bool {
        self.cache.is_stale()
    }

    pub fn snapshot(&self) -> &KinematicSnapshot {
        self.cache.snapshot()
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn scale_action(&self, action: &DVector<f64>) -> Result<DVector<f64>> {
        self.scaler.scale_action(action)
    }

    pub fn clip_torques(&self, torques: &DVector<f64>) -> Result<DVector<f64>> {
        self.actuator_limits.clip(torques)
    }

    /// Gravity/bias torques at the controlled joints, read fresh from the
    /// backend on every call.
    pub fn torque_compensation(&self, sim: &dyn SimulationBackend) -> DVector<f64> {
        let bias = sim.qfrc_bias();
        let qvel_index = &self.cache.indexes().qvel;
        DVector::from_iterator(qvel_index.len(), qvel_index.iter().map(|&i| bias[i]))
    }

    /// `(actuator_min, actuator_max)`.
    pub fn actuator_limits(&self) -> (&DVector<f64>, &DVector<f64>) {
        (self.actuator_limits.min(), self.actuator_limits.max())
    }

    /// `(input_min, input_max)` of the action space.
    pub fn control_limits(&self) -> (&DVector<f64>, &DVector<f64>) {
        self.scaler.control_limits()
    }

    pub fn control_dim(&self) -> usize {
        self.scaler.control_dim()
    }

    /// Overwrite the initial joint configuration and re-derive the initial
    /// end-effector pose from a forced refresh.
    pub fn update_initial_joints(
        &mut self,
        sim: &mut dyn SimulationBackend,
        initial_joints: &[f64],
    ) -> Result<()> {
        if initial_joints.len() != self.joint_dim {
            return Err(ControllerError::dimension(
                "initial joints",
                self.joint_dim,
                initial_joints.len(),
            ));
        }

        self.initial_joint = DVector::from_column_slice(initial_joints);
        self.cache.update(sim, true);
        self.initial_ee_pos = self.cache.snapshot().ee_pos;
        self.initial_ee_ori_mat = self.cache.snapshot().ee_ori_mat;
        debug!("Initial joints updated: {:?}", initial_joints);
        Ok(())
    }

    /// Plan a minimum-jerk segment to `target` starting now.
    ///
    /// The starting pose is read directly from the backend, not from the
    /// cached snapshot.
    pub fn build_min_jerk_trajectory(
        &mut self,
        sim: &dyn SimulationBackend,
        duration: f64,
        target: &ViaPoint,
        start: SegmentStart,
    ) -> Result<&TrajectorySegment> {
        let site = self.cache.site();
        self.trajectory.build_segment(
            sim.site_xpos(site),
            sim.site_xmat(site),
            target,
            duration,
            sim.time(),
            start,
        )
    }

    /// Reference point of the active segment at the backend's current time.
    pub fn next_desired_point(&mut self, sim: &dyn SimulationBackend) -> Result<TrajectoryPoint> {
        self.trajectory.next_desired_point(sim.time())
    }

    pub fn trajectory(&self) -> &TrajectoryGenerator {
        &self.trajectory
    }

    /// Euler-angle rates as angular velocity in the end-effector frame, at the
    /// cached orientation.
    pub fn euler_rate_to_body_angular_velocity(&self, euler_rate: &Vector3<f64>) -> Vector3<f64> {
        euler_rate_to_body_angular_velocity(&self.snapshot().ee_ori_mat, euler_rate)
    }

    /// Euler-angle rates as world-frame angular velocity, at the cached
    /// orientation.
    pub fn euler_rate_to_world_angular_velocity(&self, euler_rate: &Vector3<f64>) -> Vector3<f64> {
        euler_rate_to_world_angular_velocity(&self.snapshot().ee_ori_mat, euler_rate)
    }

    pub(crate) fn record_torques(&mut self, torques: DVector<f64>) {
        self.torques = Some(torques);
    }

    /// Last clipped torque command.
    pub fn torques(&self) -> Option<&DVector<f64>> {
        self.torques.as_ref()
    }

    pub fn eef_name(&self) -> &str {
        &self.eef_name
    }

    pub fn joint_indexes(&self) -> &JointIndexes {
        self.cache.indexes()
    }

    pub fn joint_dim(&self) -> usize {
        self.joint_dim
    }

    pub fn model_timestep(&self) -> f64 {
        self.model_timestep
    }

    pub fn initial_joint(&self) -> &DVector<f64> {
        &self.initial_joint
    }

    pub fn initial_ee_pos(&self) -> &Vector3<f64> {
        &self.initial_ee_pos
    }

    pub fn initial_ee_ori_mat(&self) -> &Matrix3<f64> {
        &self.initial_ee_ori_mat
    }

    pub fn initial_ee_ori_vel(&self) -> &Vector3<f64> {
        &self.initial_ee_ori_vel
    }
}
