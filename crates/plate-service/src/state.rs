use crate::annotate;
use crate::pipeline::{RecognitionOutcome, RecognitionPipeline};
use ab_glyph::FontArc;
use anyhow::{Context, Result};
use common::recognition::{DetectorInfo, RecognitionResponse};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Default maximum request body size (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct PlateServiceState {
    inner: Arc<PlateServiceStateInner>,
}

struct PlateServiceStateInner {
    pipeline: RecognitionPipeline,
    font: FontArc,
    max_upload_bytes: usize,
}

/// Result of processing one uploaded or captured image
#[derive(Debug, Clone)]
pub struct RecognitionReport {
    /// Source image re-encoded as base64 JPEG, kept for the result page
    pub input_image: Option<String>,

    /// Annotated image as base64 JPEG
    pub processed_image: String,

    pub outcome: RecognitionOutcome,
}

impl RecognitionReport {
    pub fn to_response(&self) -> RecognitionResponse {
        RecognitionResponse {
            processed_image: self.processed_image.clone(),
            english_text: self.outcome.english_text.clone(),
            nepali_text: self.outcome.nepali_text.clone(),
            is_bagmati: self.outcome.is_bagmati,
        }
    }
}

impl PlateServiceState {
    pub fn new(pipeline: RecognitionPipeline, font: FontArc) -> Self {
        Self::with_upload_limit(pipeline, font, DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_upload_limit(
        pipeline: RecognitionPipeline,
        font: FontArc,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PlateServiceStateInner {
                pipeline,
                font,
                max_upload_bytes,
            }),
        }
    }

    pub fn pipeline(&self) -> &RecognitionPipeline {
        &self.inner.pipeline
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner.max_upload_bytes
    }

    /// Decode image bytes, recognize plates and render the annotated image
    pub async fn recognize_bytes(&self, bytes: &[u8]) -> Result<RecognitionReport> {
        self.recognize(bytes, false).await
    }

    /// Like [`Self::recognize_bytes`], also returning the source image for display
    pub async fn recognize_upload(&self, bytes: &[u8]) -> Result<RecognitionReport> {
        self.recognize(bytes, true).await
    }

    async fn recognize(&self, bytes: &[u8], keep_input: bool) -> Result<RecognitionReport> {
        let start = Instant::now();
        let image = image::load_from_memory(bytes).context("Failed to decode image")?;

        let (outcome, annotated) = self
            .inner
            .pipeline
            .recognize_and_annotate(&image, &self.inner.font)
            .await?;

        let input_image = if keep_input {
            Some(annotate::encode_jpeg_base64(&image.to_rgb8())?)
        } else {
            None
        };
        let processed_image = annotate::encode_jpeg_base64(&annotated)?;

        info!(
            width = image.width(),
            height = image.height(),
            plates = outcome.plates.len(),
            characters = outcome.characters.len(),
            is_bagmati = outcome.is_bagmati,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recognized image"
        );

        Ok(RecognitionReport {
            input_image,
            processed_image,
            outcome,
        })
    }

    /// Health of both detectors
    pub async fn detector_health(&self) -> Vec<DetectorInfo> {
        let pipeline = &self.inner.pipeline;
        let mut infos = Vec::with_capacity(2);

        for (role, detector) in [
            ("plate", pipeline.plate_detector()),
            ("character", pipeline.character_detector()),
        ] {
            let healthy = detector.health_check().await.unwrap_or(false);
            telemetry::metrics::PLATE_SERVICE_DETECTOR_HEALTH
                .with_label_values(&[role])
                .set(healthy as i64);
            infos.push(DetectorInfo {
                role: role.to_string(),
                backend: detector.backend().to_string(),
                num_classes: detector.class_names().len(),
                healthy,
            });
        }

        infos
    }
}
