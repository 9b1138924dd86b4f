//! The narrow state-query interface a controller needs from a physics engine.
//!
//! Everything here is read-only except [`SimulationBackend::forward`], which
//! must be called before derived quantities are read. Arrays are sized to the
//! whole model (`nq` positions, `nv` velocities); controllers select their own
//! joints by index.

use crate::error::Result;
use nalgebra::{DMatrix, Matrix3, Matrix3xX, Vector3};

/// Handle to a named site, resolved once through [`SimulationBackend::site_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiteId(pub usize);

pub trait SimulationBackend {
    /// Propagate the current `qpos`/`qvel` through kinematics.
    fn forward(&mut self);

    /// Resolve a site by name; fails with `UnknownSite`.
    fn site_id(&self, name: &str) -> Result<SiteId>;

    fn site_xpos(&self, site: SiteId) -> Vector3<f64>;

    fn site_xmat(&self, site: SiteId) -> Matrix3<f64>;

    /// Linear velocity of the site in world coordinates.
    fn site_xvelp(&self, site: SiteId) -> Vector3<f64>;

    /// Angular velocity of the site in world coordinates.
    fn site_xvelr(&self, site: SiteId) -> Vector3<f64>;

    fn qpos(&self) -> &[f64];

    fn qvel(&self) -> &[f64];

    /// Positional Jacobian of the site over all `nv` velocity coordinates.
    fn site_jacp(&self, site: SiteId) -> Matrix3xX<f64>;

    /// Rotational Jacobian of the site over all `nv` velocity coordinates.
    fn site_jacr(&self, site: SiteId) -> Matrix3xX<f64>;

    /// Dense, symmetric `nv x nv` joint-space inertia matrix.
    fn full_mass_matrix(&self) -> DMatrix<f64>;

    /// Bias forces (gravity, Coriolis, passive) over all `nv` coordinates.
    fn qfrc_bias(&self) -> &[f64];

    /// Absolute simulation time in seconds.
    fn time(&self) -> f64;

    /// Fixed integration step in seconds.
    fn timestep(&self) -> f64;

    fn nq(&self) -> usize {
        self.qpos().len()
    }

    fn nv(&self) -> usize {
        self.qvel().len()
    }
}
