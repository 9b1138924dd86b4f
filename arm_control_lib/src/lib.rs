//! Controller base for simulated robot arms.
//!
//! A controller variant implements [`Controller`] on top of a
//! [`ControllerCore`], which owns the lazily refreshed kinematic snapshot,
//! actuator limits, action scaling and the minimum-jerk trajectory
//! generator. The physics engine is reached only through
//! [`SimulationBackend`]; [`DhChainSim`] is a self-contained implementation.

pub mod backend;
pub mod controller;
pub mod error;
pub mod sim;
pub mod trajectory;
pub mod types;
pub mod utils;

pub use backend::{SimulationBackend, SiteId};
pub use controller::{
    ActionScaler, Controller, ControllerCore, JointTorqueController, PoseTrackingController,
    StateCache,
};
pub use error::{ControllerError, Result};
pub use sim::DhChainSim;
pub use utils::{init_tracing, nums2array, Nums};
