//! Two-stage plate recognition.
//!
//! The plate detector runs once over the whole image. Every plate-class box
//! is cropped from the source, resized to the character model's input square,
//! and passed to the character detector. Character boxes are remapped into
//! source coordinates and accumulated across plates before the text is laid
//! out.

use crate::annotate;
use crate::detector::Detector;
use crate::labels;
use crate::layout::{self, DEFAULT_ROW_THRESHOLD};
use crate::remap::{remap_box, PlateRegion};
use ab_glyph::FontArc;
use anyhow::{Context, Result};
use common::detections::{CharacterDetection, Detection};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Class id of the license plate class in the plate model
    pub plate_class_id: usize,

    /// Side of the square the plate crop is resized to for the character model
    pub char_input_size: u32,

    /// Vertical distance (pixels) separating two text rows
    pub row_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            plate_class_id: 1,
            char_input_size: 224,
            row_threshold: DEFAULT_ROW_THRESHOLD,
        }
    }
}

/// Everything read from one image
#[derive(Debug, Clone, Default)]
pub struct RecognitionOutcome {
    /// Plate-class detections, in plate detector order
    pub plates: Vec<Detection>,

    /// Character detections of all plates, in source-image coordinates
    pub characters: Vec<CharacterDetection>,

    pub english_text: String,

    pub nepali_text: String,

    /// True if any character anywhere in the image is a Bagmati marker
    pub is_bagmati: bool,
}

#[derive(Clone)]
pub struct RecognitionPipeline {
    plate_detector: Arc<dyn Detector>,
    character_detector: Arc<dyn Detector>,
    config: PipelineConfig,
}

impl RecognitionPipeline {
    pub fn new(
        plate_detector: Arc<dyn Detector>,
        character_detector: Arc<dyn Detector>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            plate_detector,
            character_detector,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn plate_detector(&self) -> &Arc<dyn Detector> {
        &self.plate_detector
    }

    pub fn character_detector(&self) -> &Arc<dyn Detector> {
        &self.character_detector
    }

    /// Detect plates and characters and reconstruct the plate text
    pub async fn recognize(&self, image: &DynamicImage) -> Result<RecognitionOutcome> {
        let detections = self
            .plate_detector
            .detect(image)
            .await
            .context("Plate detection failed")?;

        let mut outcome = RecognitionOutcome::default();

        for detection in detections {
            if detection.class_id != self.config.plate_class_id {
                tracing::debug!(
                    class = %detection.class,
                    confidence = detection.confidence,
                    "Skipping non-plate detection"
                );
                continue;
            }

            let Some(region) = PlateRegion::from_bbox(&detection.bbox, image.width(), image.height())
            else {
                tracing::debug!(bbox = ?detection.bbox, "Skipping empty plate region");
                continue;
            };

            let characters = self.read_plate(image, &region).await?;
            tracing::debug!(
                plate = ?region,
                confidence = detection.confidence,
                characters = characters.len(),
                "Read plate"
            );

            outcome.characters.extend(characters);
            outcome.plates.push(detection);
        }

        outcome.is_bagmati =
            labels::contains_regional_marker(outcome.characters.iter().map(|c| c.label.as_str()));

        let (english, nepali) =
            layout::reconstruct_text(&outcome.characters, self.config.row_threshold);
        outcome.english_text = english;
        outcome.nepali_text = nepali;

        telemetry::metrics::PLATE_SERVICE_PLATES_DETECTED.inc_by(outcome.plates.len() as u64);
        for character in &outcome.characters {
            telemetry::metrics::PLATE_SERVICE_CHARACTERS_DETECTED
                .with_label_values(&[&character.label])
                .inc();
        }

        Ok(outcome)
    }

    /// Recognize and draw the detections on a copy of the image
    pub async fn recognize_and_annotate(
        &self,
        image: &DynamicImage,
        font: &FontArc,
    ) -> Result<(RecognitionOutcome, RgbImage)> {
        let outcome = self.recognize(image).await?;
        let mut annotated = image.to_rgb8();
        annotate::draw_outcome(&mut annotated, &outcome, font);
        Ok((outcome, annotated))
    }

    async fn read_plate(
        &self,
        image: &DynamicImage,
        region: &PlateRegion,
    ) -> Result<Vec<CharacterDetection>> {
        let size = self.config.char_input_size;
        let plate = image
            .crop_imm(region.x1, region.y1, region.width(), region.height())
            .resize_exact(size, size, FilterType::Triangle);

        let detections = self
            .character_detector
            .detect(&plate)
            .await
            .context("Character detection failed")?;

        Ok(detections
            .into_iter()
            .map(|detection| CharacterDetection {
                label: detection.class,
                confidence: detection.confidence,
                bbox: remap_box(&detection.bbox, size, size, region),
                plate_origin: region.origin(),
            })
            .collect())
    }
}
