pub mod logging;
pub mod nums;
pub mod transform;

pub use logging::init_tracing;
pub use nums::*;
pub use transform::*;
