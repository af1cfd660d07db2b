use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;

/// Which detector implementation to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorBackend {
    /// YOLOv8 ONNX models
    Onnx,
    /// Detectors that never find anything (UI dry runs)
    Static,
}

impl FromStr for DetectorBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "onnx" | "yolov8" => Ok(Self::Onnx),
            "static" | "none" => Ok(Self::Static),
            other => Err(anyhow!("unknown detector backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlateServiceConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: String,

    pub backend: DetectorBackend,

    pub plate_model_path: String,

    pub character_model_path: String,

    /// Class names overriding the plate model metadata
    pub plate_labels: Option<Vec<String>>,

    /// Class names overriding the character model metadata
    pub character_labels: Option<Vec<String>>,

    /// Plate model class id of the license plate class
    pub plate_class_id: usize,

    /// Input size of the plate model
    pub plate_input_size: u32,

    /// Input size of the character model; plate crops are resized to it
    pub char_input_size: u32,

    /// Vertical pixel distance separating two text rows
    pub row_threshold: f32,

    pub detection_confidence: f32,

    /// Execution provider preference (CPU, CUDA, TensorRT)
    pub execution_provider: String,

    /// Font file for box labels, overriding the embedded font
    pub font_path: Option<String>,

    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for PlateServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            backend: DetectorBackend::Onnx,
            plate_model_path: "models/plate.onnx".to_string(),
            character_model_path: "models/character.onnx".to_string(),
            plate_labels: None,
            character_labels: None,
            plate_class_id: 1,
            plate_input_size: 640,
            char_input_size: 224,
            row_threshold: 20.0,
            detection_confidence: 0.25,
            execution_provider: "CPU".to_string(),
            font_path: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

/// Comma separated list, e.g. `PLATE_LABELS=vehicle,license_plate`
fn parse_labels(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect()
    })
}

impl PlateServiceConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env::var("PLATE_SERVICE_ADDR").unwrap_or(defaults.bind_addr),
            backend: parse_var("DETECTOR_BACKEND", defaults.backend)?,
            plate_model_path: env::var("PLATE_MODEL_PATH").unwrap_or(defaults.plate_model_path),
            character_model_path: env::var("CHARACTER_MODEL_PATH")
                .unwrap_or(defaults.character_model_path),
            plate_labels: parse_labels("PLATE_LABELS"),
            character_labels: parse_labels("CHARACTER_LABELS"),
            plate_class_id: parse_var("PLATE_CLASS_ID", defaults.plate_class_id)?,
            plate_input_size: parse_var("PLATE_INPUT_SIZE", defaults.plate_input_size)?,
            char_input_size: parse_var("CHAR_INPUT_SIZE", defaults.char_input_size)?,
            row_threshold: parse_var("ROW_THRESHOLD", defaults.row_threshold)?,
            detection_confidence: parse_var(
                "DETECTION_CONFIDENCE",
                defaults.detection_confidence,
            )?,
            execution_provider: env::var("EXECUTION_PROVIDER")
                .unwrap_or(defaults.execution_provider),
            font_path: env::var("ANNOTATION_FONT_PATH").ok(),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.char_input_size == 0 || self.plate_input_size == 0 {
            return Err(anyhow!("model input sizes must be positive"));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(anyhow!(
                "DETECTION_CONFIDENCE must be within [0, 1] (got {})",
                self.detection_confidence
            ));
        }
        if !self.row_threshold.is_finite() || self.row_threshold < 0.0 {
            return Err(anyhow!(
                "ROW_THRESHOLD must be a finite, non-negative number (got {})",
                self.row_threshold
            ));
        }
        Ok(())
    }
}
