pub mod static_detector;
pub mod yolov8;

use anyhow::Result;
use async_trait::async_trait;
use common::detections::Detection;
use image::DynamicImage;

pub use static_detector::StaticDetector;
pub use yolov8::{YoloV8Config, YoloV8Detector};

/// Object detector used by the recognition pipeline.
///
/// Implementations are constructed once at startup and shared read-only
/// between requests.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Backend identifier (e.g., "yolov8_onnx")
    fn backend(&self) -> &'static str;

    /// Class labels indexed by class id
    fn class_names(&self) -> &[String];

    /// Detect objects in an image. Boxes are in the image's pixel space.
    async fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;

    /// Health check - verify the detector is operational
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Label for a class id, falling back to `class_{id}`
    fn class_name(&self, class_id: usize) -> String {
        self.class_names()
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}
