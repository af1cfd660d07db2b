/// Detector that returns a fixed set of detections for every image.
///
/// Used for dry runs without model files (`DETECTOR_BACKEND=static`) and to
/// drive the pipeline in tests.
use super::Detector;
use anyhow::Result;
use async_trait::async_trait;
use common::detections::{BoundingBox, Detection};
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct StaticDetector {
    class_names: Vec<String>,
    detections: Vec<Detection>,
    calls: AtomicUsize,
}

impl StaticDetector {
    pub fn new(class_names: Vec<String>, detections: Vec<Detection>) -> Self {
        Self {
            class_names,
            detections,
            calls: AtomicUsize::new(0),
        }
    }

    /// Detector that never finds anything
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Add a detection, resolving its label from the class table
    pub fn with_detection(mut self, class_id: usize, confidence: f32, bbox: BoundingBox) -> Self {
        let class = self.class_name(class_id);
        self.detections.push(Detection {
            class,
            class_id,
            confidence,
            bbox,
        });
        self
    }

    /// Number of times `detect` has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Detector for StaticDetector {
    fn backend(&self) -> &'static str {
        "static"
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    async fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.detections.clone())
    }
}
