pub mod annotate;
pub mod api;
pub mod config;
pub mod detector;
pub mod error;
pub mod labels;
pub mod layout;
pub mod pages;
pub mod pipeline;
pub mod remap;
pub mod state;

pub use config::PlateServiceConfig;
pub use pipeline::{PipelineConfig, RecognitionPipeline};
pub use state::PlateServiceState;
