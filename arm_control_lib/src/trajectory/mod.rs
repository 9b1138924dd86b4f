//! Minimum-jerk Cartesian reference trajectories between two poses.

pub mod generator;
pub mod orientation;
pub mod quintic;
pub mod segment;

pub use generator::*;
pub use orientation::*;
pub use quintic::*;
pub use segment::*;
