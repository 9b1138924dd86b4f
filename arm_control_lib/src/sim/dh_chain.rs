use crate::backend::{SimulationBackend, SiteId};
use crate::error::{ControllerError, Result};
use crate::types::{DHParameter, SimulationConfig};
use nalgebra::{DMatrix, DVector, Matrix3, Matrix3xX, Matrix4, Vector3};
use tracing::{debug, info};

/// Serial revolute chain described by DH parameters, with a point mass at
/// every link frame and one site at the last frame.
///
/// Dynamics are quasi-static: the inertia matrix and gravity bias are exact
/// for the point-mass model, velocity-product (Coriolis) terms are left out.
/// Passive joints after the chain carry inertia but never move the site.
#[derive(Debug, Clone)]
pub struct DhChainSim {
    dh_params: Vec<DHParameter>,
    masses: Vec<f64>,
    base_offset: Vector3<f64>,
    gravity: Vector3<f64>,
    passive_joints: usize,
    passive_mass: f64,
    armature: f64,
    damping: f64,
    site_name: String,
    timestep: f64,
    time: f64,
    qpos: Vec<f64>,
    qvel: Vec<f64>,

    // derived by `recompute`
    link_pos: Vec<Vector3<f64>>,
    site_pos: Vector3<f64>,
    site_rot: Matrix3<f64>,
    jacp: Matrix3xX<f64>,
    jacr: Matrix3xX<f64>,
    mass_matrix: DMatrix<f64>,
    bias: Vec<f64>,
    forward_calls: usize,
}

impl DhChainSim {
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        if !config.timestep.is_finite() || config.timestep <= 0.0 {
            return Err(ControllerError::InvalidConfig(format!(
                "timestep must be positive, got {}",
                config.timestep
            )));
        }
        if config.links.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "simulation needs at least one link".to_string(),
            ));
        }

        let dof = config.dof();
        let qpos = match &config.initial_qpos {
            Some(qpos) if qpos.len() != dof => {
                return Err(ControllerError::dimension("initial qpos", dof, qpos.len()));
            }
            Some(qpos) => qpos.clone(),
            None => vec![0.0; dof],
        };

        let mut sim = Self {
            dh_params: config.links.iter().map(|l| l.dh).collect(),
            masses: config.links.iter().map(|l| l.mass).collect(),
            base_offset: Vector3::from(config.base_offset),
            gravity: Vector3::from(config.gravity),
            passive_joints: config.passive_joints,
            passive_mass: config.passive_mass,
            armature: config.armature,
            damping: config.damping,
            site_name: config.site_name.clone(),
            timestep: config.timestep,
            time: 0.0,
            qpos,
            qvel: vec![0.0; dof],
            link_pos: Vec::new(),
            site_pos: Vector3::zeros(),
            site_rot: Matrix3::identity(),
            jacp: Matrix3xX::zeros(dof),
            jacr: Matrix3xX::zeros(dof),
            mass_matrix: DMatrix::zeros(dof, dof),
            bias: vec![0.0; dof],
            forward_calls: 0,
        };
        sim.recompute();

        info!(
            "DH chain sim ready: {} links + {} passive joints, dt={}s, site `{}`",
            sim.dh_params.len(),
            sim.passive_joints,
            sim.timestep,
            sim.site_name
        );
        Ok(sim)
    }

    fn chain_len(&self) -> usize {
        self.dh_params.len()
    }

    fn dh_transformation(a: f64, alpha: f64, d: f64, theta: f64) -> Matrix4<f64> {
        let cos_theta = theta.cos();
        let sin_theta = theta.sin();
        let cos_alpha = alpha.cos();
        let sin_alpha = alpha.sin();

        #[rustfmt::skip]
        let transform = Matrix4::new(
            cos_theta, -sin_theta * cos_alpha,  sin_theta * sin_alpha, a * cos_theta,
            sin_theta,  cos_theta * cos_alpha, -cos_theta * sin_alpha, a * sin_theta,
            0.0,        sin_alpha,              cos_alpha,             d,
            0.0,        0.0,                    0.0,                   1.0,
        );
        transform
    }

    /// Frames 0..=n of the chain; frame `i` carries the axis of joint `i`.
    fn frames(&self) -> Vec<Matrix4<f64>> {
        let mut transform = Matrix4::identity();
        transform[(0, 3)] = self.base_offset.x;
        transform[(1, 3)] = self.base_offset.y;
        transform[(2, 3)] = self.base_offset.z;

        let mut frames = Vec::with_capacity(self.chain_len() + 1);
        frames.push(transform);
        for (i, dh) in self.dh_params.iter().enumerate() {
            let theta = self.qpos[i] + dh.theta;
            transform *= Self::dh_transformation(dh.a, dh.alpha, dh.d, theta);
            frames.push(transform);
        }
        frames
    }

    /// Positional Jacobian of a point attached to frame `link + 1`.
    fn point_jacobian(
        frames: &[Matrix4<f64>],
        point: &Vector3<f64>,
        link: usize,
        nv: usize,
    ) -> Matrix3xX<f64> {
        let mut jac = Matrix3xX::zeros(nv);
        for (i, frame) in frames.iter().enumerate().take(link + 1) {
            let joint_pos = Vector3::new(frame[(0, 3)], frame[(1, 3)], frame[(2, 3)]);
            let axis = Vector3::new(frame[(0, 2)], frame[(1, 2)], frame[(2, 2)]);
            jac.set_column(i, &axis.cross(&(point - joint_pos)));
        }
        jac
    }

    fn recompute(&mut self) {
        let nv = self.qvel.len();
        let n = self.chain_len();
        let frames = self.frames();

        self.link_pos = frames[1..]
            .iter()
            .map(|f| Vector3::new(f[(0, 3)], f[(1, 3)], f[(2, 3)]))
            .collect();
        self.site_pos = self.link_pos[n - 1];
        self.site_rot = frames[n].fixed_view::<3, 3>(0, 0).into_owned();

        self.jacp = Self::point_jacobian(&frames, &self.site_pos, n - 1, nv);
        self.jacr = Matrix3xX::zeros(nv);
        for (i, frame) in frames.iter().enumerate().take(n) {
            self.jacr
                .set_column(i, &Vector3::new(frame[(0, 2)], frame[(1, 2)], frame[(2, 2)]));
        }

        let mut mass_matrix = DMatrix::<f64>::zeros(nv, nv);
        let mut bias = DVector::<f64>::zeros(nv);
        for (k, (pos, &mass)) in self.link_pos.iter().zip(&self.masses).enumerate() {
            let jac = Self::point_jacobian(&frames, pos, k, nv);
            mass_matrix += mass * jac.transpose() * &jac;
            bias -= mass * jac.transpose() * self.gravity;
        }
        for j in n..nv {
            mass_matrix[(j, j)] += self.passive_mass;
        }
        for j in 0..nv {
            mass_matrix[(j, j)] += self.armature;
        }

        self.mass_matrix = mass_matrix;
        self.bias = bias.as_slice().to_vec();
    }

    /// Advance one timestep under `qfrc_applied` (one entry per velocity
    /// coordinate) with semi-implicit Euler.
    pub fn step(&mut self, qfrc_applied: &[f64]) -> Result<()> {
        let nv = self.qvel.len();
        if qfrc_applied.len() != nv {
            return Err(ControllerError::dimension(
                "applied generalized forces",
                nv,
                qfrc_applied.len(),
            ));
        }

        let rhs = DVector::from_iterator(
            nv,
            (0..nv).map(|i| qfrc_applied[i] - self.bias[i] - self.damping * self.qvel[i]),
        );
        let qacc = self
            .mass_matrix
            .clone()
            .cholesky()
            .ok_or_else(|| {
                ControllerError::Numerical("mass matrix is not positive definite".to_string())
            })?
            .solve(&rhs);

        for i in 0..nv {
            self.qvel[i] += self.timestep * qacc[i];
            self.qpos[i] += self.timestep * self.qvel[i];
        }
        self.time += self.timestep;
        self.recompute();
        Ok(())
    }

    /// Apply `torques` at the velocity coordinates in `qvel_index`, zero
    /// elsewhere, and step.
    pub fn step_joints(&mut self, qvel_index: &[usize], torques: &DVector<f64>) -> Result<()> {
        if qvel_index.len() != torques.len() {
            return Err(ControllerError::dimension(
                "joint torques",
                qvel_index.len(),
                torques.len(),
            ));
        }

        let mut qfrc = vec![0.0; self.qvel.len()];
        for (&index, &torque) in qvel_index.iter().zip(torques.iter()) {
            let len = qfrc.len();
            let slot = qfrc.get_mut(index).ok_or(ControllerError::IndexOutOfRange {
                what: "qvel",
                index,
                len,
            })?;
            *slot = torque;
        }
        self.step(&qfrc)
    }

    /// Overwrite joint positions; derived quantities follow on the next
    /// [`SimulationBackend::forward`].
    pub fn set_qpos(&mut self, qpos: &[f64]) -> Result<()> {
        if qpos.len() != self.qpos.len() {
            return Err(ControllerError::dimension("qpos", self.qpos.len(), qpos.len()));
        }
        self.qpos.copy_from_slice(qpos);
        debug!("qpos set to {:?}", qpos);
        Ok(())
    }

    pub fn set_qvel(&mut self, qvel: &[f64]) -> Result<()> {
        if qvel.len() != self.qvel.len() {
            return Err(ControllerError::dimension("qvel", self.qvel.len(), qvel.len()));
        }
        self.qvel.copy_from_slice(qvel);
        Ok(())
    }

    /// How many times [`SimulationBackend::forward`] has been called.
    pub fn forward_count(&self) -> usize {
        self.forward_calls
    }
}

impl SimulationBackend for DhChainSim {
    fn forward(&mut self) {
        self.recompute();
        self.forward_calls += 1;
    }

    fn site_id(&self, name: &str) -> Result<SiteId> {
        if name == self.site_name {
            Ok(SiteId(0))
        } else {
            Err(ControllerError::UnknownSite(name.to_string()))
        }
    }

    fn site_xpos(&self, _site: SiteId) -> Vector3<f64> {
        self.site_pos
    }

    fn site_xmat(&self, _site: SiteId) -> Matrix3<f64> {
        self.site_rot
    }

    fn site_xvelp(&self, _site: SiteId) -> Vector3<f64> {
        &self.jacp * DVector::from_column_slice(&self.qvel)
    }

    fn site_xvelr(&self, _site: SiteId) -> Vector3<f64> {
        &self.jacr * DVector::from_column_slice(&self.qvel)
    }

    fn qpos(&self) -> &[f64] {
        &self.qpos
    }

    fn qvel(&self) -> &[f64] {
        &self.qvel
    }

    fn site_jacp(&self, _site: SiteId) -> Matrix3xX<f64> {
        self.jacp.clone()
    }

    fn site_jacr(&self, _site: SiteId) -> Matrix3xX<f64> {
        self.jacr.clone()
    }

    fn full_mass_matrix(&self) -> DMatrix<f64> {
        self.mass_matrix.clone()
    }

    fn qfrc_bias(&self) -> &[f64] {
        &self.bias
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }
}
