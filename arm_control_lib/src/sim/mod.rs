//! Reference [`SimulationBackend`](crate::backend::SimulationBackend)
//! implementations for running controllers without an external engine.

pub mod dh_chain;

pub use dh_chain::DhChainSim;
