pub mod config;
pub mod joint_indexes;
pub mod kinematic_state;
pub mod limits;
pub mod trajectory_types;

pub use config::*;
pub use joint_indexes::*;
pub use kinematic_state::*;
pub use limits::*;
pub use trajectory_types::*;
