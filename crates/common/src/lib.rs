pub mod detections;
pub mod payload;
pub mod recognition;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
