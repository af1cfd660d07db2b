/// YOLOv8 detector backed by ONNX Runtime.
///
/// Both the plate model and the character model are Ultralytics YOLOv8
/// exports. They share the same output layout, `[1, 4 + classes, anchors]`,
/// and only differ in input size and class table.
use super::Detector;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use common::detections::{BoundingBox, Detection};
use image::DynamicImage;
use ndarray::{Array, IxDyn};
use once_cell::sync::Lazy;
use ort::{
    execution_providers::{
        CPUExecutionProvider, CUDAExecutionProvider, TensorRTExecutionProvider,
    },
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloV8Config {
    /// Path to the ONNX model file
    pub model_path: String,

    /// Name used in logs and metrics ("plate", "character")
    #[serde(default = "default_role")]
    pub role: String,

    /// Model input size (width and height)
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    /// Confidence threshold for detections (0.0 to 1.0)
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f32,

    /// IoU threshold for per-class NMS
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,

    #[serde(default = "default_max_detections")]
    pub max_detections: usize,

    /// Class names; read from the model metadata when not given
    #[serde(default)]
    pub class_names: Option<Vec<String>>,

    /// Execution provider preference (CPU, CUDA, TensorRT)
    #[serde(default = "default_execution_provider")]
    pub execution_provider: String,

    #[serde(default)]
    pub device_id: i32,

    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,

    #[serde(default = "default_inter_threads")]
    pub inter_threads: usize,
}

fn default_role() -> String {
    "detector".to_string()
}

fn default_input_size() -> u32 {
    640
}

fn default_confidence() -> f32 {
    0.25
}

fn default_iou_threshold() -> f32 {
    0.45
}

fn default_max_detections() -> usize {
    300
}

fn default_execution_provider() -> String {
    "CPU".to_string()
}

fn default_intra_threads() -> usize {
    4
}

fn default_inter_threads() -> usize {
    1
}

impl YoloV8Config {
    pub fn new(role: impl Into<String>, model_path: impl Into<String>, input_size: u32) -> Self {
        Self {
            model_path: model_path.into(),
            role: role.into(),
            input_size,
            confidence_threshold: default_confidence(),
            iou_threshold: default_iou_threshold(),
            max_detections: default_max_detections(),
            class_names: None,
            execution_provider: default_execution_provider(),
            device_id: 0,
            intra_threads: default_intra_threads(),
            inter_threads: default_inter_threads(),
        }
    }
}

static NAMES_ENTRY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).ok());

/// Parse the `names` metadata written by Ultralytics exports,
/// e.g. `{0: 'BA', 1: 'PA'}`. Gaps are filled with `class_{i}`.
pub fn parse_class_names(raw: &str) -> Vec<String> {
    let Some(names_entry) = NAMES_ENTRY.as_ref() else {
        return Vec::new();
    };

    let entries: Vec<(usize, String)> = names_entry
        .captures_iter(raw)
        .filter_map(|caps| {
            let index = caps.get(1)?.as_str().parse().ok()?;
            let name = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((index, name))
        })
        .collect();

    let len = entries.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|i| format!("class_{}", i)).collect();
    for (index, name) in entries {
        names[index] = name;
    }
    names
}

/// Resize to a square, RGB, NCHW, scaled to [0, 1]
fn preprocess(img: &DynamicImage, size: u32) -> Array<f32, IxDyn> {
    let resized = img.resize_exact(size, size, image::imageops::FilterType::Triangle);
    let rgb_img = resized.to_rgb8();

    let mut input = Array::zeros(IxDyn(&[1, 3, size as usize, size as usize]));
    for (x, y, pixel) in rgb_img.enumerate_pixels() {
        for channel in 0..3 {
            input[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
        }
    }

    input
}

/// Per-class Non-Maximum Suppression, highest confidence first
fn nms(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in candidates {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) >= iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}

pub struct YoloV8Detector {
    config: YoloV8Config,
    class_names: Vec<String>,
    session: Mutex<Session>,
    execution_provider: String,
}

impl YoloV8Detector {
    /// Load the model and build an inference session
    pub fn load(config: YoloV8Config) -> Result<Self> {
        if !std::path::Path::new(&config.model_path).exists() {
            return Err(anyhow!(
                "{} model not found at '{}'",
                config.role,
                config.model_path
            ));
        }

        let (session, execution_provider) = create_session(&config)?;

        let class_names = match config.class_names.clone() {
            Some(names) if !names.is_empty() => names,
            _ => {
                let raw = session
                    .metadata()
                    .and_then(|metadata| metadata.custom("names"))
                    .ok()
                    .flatten();
                match raw {
                    Some(raw) => parse_class_names(&raw),
                    None => {
                        tracing::warn!(
                            "{} model has no class names; labels will be class indices",
                            config.role
                        );
                        Vec::new()
                    }
                }
            }
        };

        tracing::info!(
            role = %config.role,
            model = %config.model_path,
            provider = %execution_provider,
            input_size = config.input_size,
            classes = class_names.len(),
            "Loaded YOLOv8 detector"
        );

        Ok(Self {
            config,
            class_names,
            session: Mutex::new(session),
            execution_provider,
        })
    }

    pub fn config(&self) -> &YoloV8Config {
        &self.config
    }
}

/// Decode raw `[1, 4 + classes, anchors]` output into detections in the
/// pixel space of a `source_width` x `source_height` image
fn decode_output(
    output: &Array<f32, IxDyn>,
    config: &YoloV8Config,
    class_names: &[String],
    source_width: u32,
    source_height: u32,
) -> Result<Vec<Detection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[1] <= 4 {
        return Err(anyhow!("unexpected YOLOv8 output shape {:?}", shape));
    }

    let num_classes = shape[1] - 4;
    let num_anchors = shape[2];
    let scale_x = source_width as f32 / config.input_size as f32;
    let scale_y = source_height as f32 / config.input_size as f32;

    let mut candidates = Vec::new();
    for i in 0..num_anchors {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, output[[0, 4 + c, i]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if confidence < config.confidence_threshold {
            continue;
        }

        let cx = output[[0, 0, i]] * scale_x;
        let cy = output[[0, 1, i]] * scale_y;
        let w = output[[0, 2, i]] * scale_x;
        let h = output[[0, 3, i]] * scale_y;

        candidates.push(Detection {
            class: class_names
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", class_id)),
            class_id,
            confidence,
            bbox: BoundingBox::from_center(cx, cy, w, h).clamp_to(source_width, source_height),
        });
    }

    let mut detections = nms(candidates, config.iou_threshold);
    detections.truncate(config.max_detections);
    Ok(detections)
}

fn session_builder(config: &YoloV8Config) -> Result<ort::session::builder::SessionBuilder> {
    Ok(Session::builder()
        .context("Failed to create session builder")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(config.intra_threads)
        .context("Failed to set intra threads")?
        .with_inter_threads(config.inter_threads)
        .context("Failed to set inter threads")?)
}

/// Create an ONNX session, falling back TensorRT -> CUDA -> CPU
fn create_session(config: &YoloV8Config) -> Result<(Session, String)> {
    match config.execution_provider.to_uppercase().as_str() {
        "TENSORRT" => {
            let result = session_builder(config)?
                .with_execution_providers([
                    TensorRTExecutionProvider::default()
                        .with_device_id(config.device_id)
                        .build(),
                    CUDAExecutionProvider::default()
                        .with_device_id(config.device_id)
                        .build(),
                    CPUExecutionProvider::default().build(),
                ])
                .context("Failed to set execution providers")?
                .commit_from_file(&config.model_path);

            match result {
                Ok(session) => Ok((session, "TensorRT".to_string())),
                Err(e) => {
                    tracing::warn!("TensorRT failed for {}, trying CUDA: {}", config.role, e);
                    try_cuda(config)
                }
            }
        }
        "CUDA" => try_cuda(config),
        _ => try_cpu(config),
    }
}

fn try_cuda(config: &YoloV8Config) -> Result<(Session, String)> {
    let result = session_builder(config)?
        .with_execution_providers([
            CUDAExecutionProvider::default()
                .with_device_id(config.device_id)
                .build(),
            CPUExecutionProvider::default().build(),
        ])
        .context("Failed to set execution providers")?
        .commit_from_file(&config.model_path);

    match result {
        Ok(session) => Ok((session, "CUDA".to_string())),
        Err(e) => {
            tracing::warn!("CUDA failed for {}, using CPU: {}", config.role, e);
            try_cpu(config)
        }
    }
}

fn try_cpu(config: &YoloV8Config) -> Result<(Session, String)> {
    let session = session_builder(config)?
        .commit_from_file(&config.model_path)
        .with_context(|| format!("Failed to load {} model from file", config.role))?;
    Ok((session, "CPU".to_string()))
}

#[async_trait]
impl Detector for YoloV8Detector {
    fn backend(&self) -> &'static str {
        "yolov8_onnx"
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    async fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let input_tensor = Value::from_array(preprocess(image, self.config.input_size))?;

        let inference_start = Instant::now();
        let output = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow!("Failed to lock {} session: {}", self.config.role, e))?;
            let outputs = session.run(ort::inputs![input_tensor])?;
            let output_value = outputs
                .get("output0")
                .context("No output tensor found")?;
            let (shape, data) = output_value.try_extract_tensor::<f32>()?;
            let shape_usize: Vec<usize> = shape.as_ref().iter().map(|&x| x as usize).collect();
            Array::from_shape_vec(IxDyn(&shape_usize), data.to_vec())?
        };
        let inference_time = inference_start.elapsed();

        telemetry::metrics::PLATE_SERVICE_INFERENCE_TIME
            .with_label_values(&[&self.config.role, &self.execution_provider])
            .observe(inference_time.as_secs_f64());

        let detections = decode_output(
            &output,
            &self.config,
            &self.class_names,
            image.width(),
            image.height(),
        )?;
        tracing::debug!(
            role = %self.config.role,
            detections = detections.len(),
            inference_ms = inference_time.as_millis() as u64,
            "YOLOv8 inference complete"
        );

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: usize, confidence: f32, bbox: BoundingBox) -> Detection {
        Detection {
            class: format!("class_{}", class_id),
            class_id,
            confidence,
            bbox,
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = YoloV8Config::new("character", "models/character.onnx", 224);
        assert_eq!(config.role, "character");
        assert_eq!(config.input_size, 224);
        assert_eq!(config.confidence_threshold, 0.25);
        assert_eq!(config.iou_threshold, 0.45);
        assert_eq!(config.execution_provider, "CPU");
        assert!(config.class_names.is_none());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config: YoloV8Config =
            serde_json::from_value(serde_json::json!({ "model_path": "plate.onnx" })).unwrap();
        assert_eq!(config.input_size, 640);
        assert_eq!(config.max_detections, 300);
        assert_eq!(config.intra_threads, 4);
    }

    #[test]
    fn test_parse_class_names() {
        let names = parse_class_names("{0: 'BA', 1: 'PA', 2: \"KHA\", 3: 'Bagmati'}");
        assert_eq!(names, vec!["BA", "PA", "KHA", "Bagmati"]);
    }

    #[test]
    fn test_parse_class_names_fills_gaps() {
        let names = parse_class_names("{0: 'vehicle', 2: 'license_plate'}");
        assert_eq!(names, vec!["vehicle", "class_1", "license_plate"]);
        assert!(parse_class_names("").is_empty());
    }

    #[test]
    fn test_nms_is_per_class() {
        let boxes = vec![
            det(0, 0.9, BoundingBox::new(10.0, 10.0, 60.0, 60.0)),
            det(0, 0.8, BoundingBox::new(15.0, 15.0, 65.0, 65.0)),
            det(1, 0.7, BoundingBox::new(12.0, 12.0, 62.0, 62.0)),
            det(0, 0.85, BoundingBox::new(100.0, 100.0, 150.0, 150.0)),
        ];

        let kept = nms(boxes, 0.45);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.85);
        assert_eq!(kept[2].class_id, 1);
    }

    #[test]
    fn test_decode_output_scales_and_filters() {
        let mut config = YoloV8Config::new("plate", "plate.onnx", 100);
        config.confidence_threshold = 0.5;
        let names = vec!["vehicle".to_string(), "license_plate".to_string()];

        // two anchors: one confident plate, one below threshold
        let mut output = Array::zeros(IxDyn(&[1, 6, 2]));
        for (row, value) in [50.0, 40.0, 20.0, 10.0, 0.1, 0.9].iter().enumerate() {
            output[[0, row, 0]] = *value;
        }
        for (row, value) in [10.0, 10.0, 4.0, 4.0, 0.3, 0.2].iter().enumerate() {
            output[[0, row, 1]] = *value;
        }

        let detections = decode_output(&output, &config, &names, 200, 300).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, "license_plate");
        assert_eq!(detections[0].class_id, 1);
        assert_eq!(detections[0].bbox, BoundingBox::new(80.0, 105.0, 120.0, 135.0));
    }

    #[test]
    fn test_decode_output_rejects_bad_shape() {
        let config = YoloV8Config::new("plate", "plate.onnx", 100);
        let output = Array::zeros(IxDyn(&[1, 4, 2]));
        assert!(decode_output(&output, &config, &[], 100, 100).is_err());
    }

    #[test]
    fn test_preprocess_layout() {
        let mut img = image::RgbImage::new(4, 4);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([255, 0, 51]);
        }
        let input = preprocess(&DynamicImage::ImageRgb8(img), 4);

        assert_eq!(input.shape(), &[1, 3, 4, 4]);
        assert_eq!(input[[0, 0, 2, 2]], 1.0);
        assert_eq!(input[[0, 1, 2, 2]], 0.0);
        assert!((input[[0, 2, 2, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let config = YoloV8Config::new("plate", "models/does-not-exist.onnx", 640);
        let err = YoloV8Detector::load(config).err().unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
