//! Request and response contracts for the plate recognition endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /process_image_route`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeRequest {
    /// Base64 image, optionally prefixed with a `data:image/...;base64,` marker
    pub image: Option<String>,
}

/// Result of recognizing a single image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResponse {
    /// Annotated image as base64 JPEG
    pub processed_image: String,

    /// Raw labels, one plate row per line
    pub english_text: String,

    /// Labels translated to Nepali script, one plate row per line
    pub nepali_text: String,

    /// Whether a Bagmati province marker was read anywhere in the image
    pub is_bagmati: bool,
}

/// Detector metadata reported by the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorInfo {
    /// Role of the detector ("plate" or "character")
    pub role: String,

    /// Backend identifier (e.g., "yolov8_onnx", "static")
    pub backend: String,

    /// Number of classes the detector can emit
    pub num_classes: usize,

    pub healthy: bool,
}
