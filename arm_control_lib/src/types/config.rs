use crate::types::{JointIndexes, OrientationMethod, ViaPoint};
use crate::utils::Nums;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which reference controller variant the stepping loop builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    JointTorque,
    PoseTracking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub kind: ControllerKind,
    /// Name of the end-effector site in the backend model.
    pub eef_name: String,
    pub joint_indexes: JointIndexes,
    pub actuator_range: RangeConfig,
    /// Action-space bounds; defaults to the actuator range when absent.
    #[serde(default)]
    pub control: Option<ControlRangeConfig>,
    #[serde(default)]
    pub gains: GainsConfig,
    pub trajectory: TrajectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeConfig {
    pub min: Nums,
    pub max: Nums,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRangeConfig {
    pub input_min: Nums,
    pub input_max: Nums,
    pub output_min: Nums,
    pub output_max: Nums,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GainsConfig {
    pub kp: Nums,
    pub kd: Nums,
    pub kp_null: Nums,
    pub kd_null: Nums,
}

impl Default for GainsConfig {
    fn default() -> Self {
        Self {
            kp: Nums::Scalar(150.0),
            kd: Nums::Scalar(2.0 * 150.0_f64.sqrt()),
            kp_null: Nums::Scalar(10.0),
            kd_null: Nums::Scalar(2.0 * 10.0_f64.sqrt()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    pub method: OrientationMethod,
    /// Duration of each segment in seconds.
    pub segment_duration: f64,
    /// Keep only the most recent points of the evaluated history.
    #[serde(default)]
    pub history_limit: Option<usize>,
    /// Round via-point orientation matrices to integer entries.
    #[serde(default)]
    pub round_final_orientation: bool,
    #[serde(default)]
    pub via_points: Vec<ViaPointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaPointConfig {
    pub position: [f64; 3],
    /// Static-frame roll, pitch, yaw in radians.
    #[serde(default)]
    pub rpy: [f64; 3],
}

impl From<&ViaPointConfig> for ViaPoint {
    fn from(config: &ViaPointConfig) -> Self {
        ViaPoint::from_rpy(config.position, config.rpy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub timestep: f64,
    #[serde(default = "default_gravity")]
    pub gravity: [f64; 3],
    pub site_name: String,
    pub base_offset: [f64; 3],
    pub links: Vec<LinkConfig>,
    /// Extra joints after the arm chain that do not move the site
    /// (e.g. gripper fingers).
    #[serde(default)]
    pub passive_joints: usize,
    #[serde(default = "default_passive_mass")]
    pub passive_mass: f64,
    #[serde(default = "default_armature")]
    pub armature: f64,
    #[serde(default)]
    pub damping: f64,
    #[serde(default)]
    pub initial_qpos: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(flatten)]
    pub dh: DHParameter,
    /// Point mass at the link frame origin (kg).
    pub mass: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DHParameter {
    pub a: f64,     // link length
    pub alpha: f64, // link twist
    pub d: f64,     // link offset
    pub theta: f64, // joint angle offset
}

fn default_gravity() -> [f64; 3] {
    [0.0, 0.0, -9.81]
}

fn default_passive_mass() -> f64 {
    0.1
}

fn default_armature() -> f64 {
    0.01
}

impl ControllerConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read controller config {}", path.display()))?;
        let config: ControllerConfig = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse controller config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.eef_name.is_empty() {
            return Err(eyre::eyre!("eef_name must not be empty"));
        }

        let dof = self.joint_indexes.dim();
        if self.joint_indexes.qpos.len() != dof || self.joint_indexes.qvel.len() != dof {
            return Err(eyre::eyre!(
                "Joint index sets disagree: {} joints, {} qpos, {} qvel",
                dof,
                self.joint_indexes.qpos.len(),
                self.joint_indexes.qvel.len()
            ));
        }

        if self.trajectory.segment_duration <= 0.0 {
            return Err(eyre::eyre!(
                "Segment duration must be positive, got {}",
                self.trajectory.segment_duration
            ));
        }

        Ok(())
    }

    pub fn via_points(&self) -> Vec<ViaPoint> {
        self.trajectory.via_points.iter().map(ViaPoint::from).collect()
    }
}

impl SimulationConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read simulation config {}", path.display()))?;
        let config: SimulationConfig = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse simulation config {}", path.display()))?;
        Ok(config)
    }

    /// Total number of joints: the DH chain plus passive joints.
    pub fn dof(&self) -> usize {
        self.links.len() + self.passive_joints
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestep <= 0.0 {
            return Err(eyre::eyre!("Timestep must be positive, got {}", self.timestep));
        }

        if self.links.is_empty() {
            return Err(eyre::eyre!("Simulation needs at least one link"));
        }

        if let Some((i, link)) = self.links.iter().enumerate().find(|(_, l)| l.mass < 0.0) {
            return Err(eyre::eyre!("Link {} has negative mass {}", i, link.mass));
        }

        if let Some(qpos) = &self.initial_qpos {
            if qpos.len() != self.dof() {
                return Err(eyre::eyre!(
                    "Initial qpos count ({}) doesn't match DOF ({})",
                    qpos.len(),
                    self.dof()
                ));
            }
        }

        Ok(())
    }
}
