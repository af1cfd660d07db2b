//! Draws recognition results onto an image and encodes it for transport.

use crate::pipeline::RecognitionOutcome;
use ab_glyph::{FontArc, FontVec, PxScale};
use anyhow::{Context, Result};
use common::detections::BoundingBox;
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

pub const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const BOX_THICKNESS: u32 = 2;
const LABEL_OFFSET: i32 = 10;
const LABEL_SCALE: f32 = 16.0;
const JPEG_QUALITY: u8 = 90;

const DEFAULT_FONT_DATA: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Font compiled into the binary, used unless `ANNOTATION_FONT_PATH` is set
pub fn default_font() -> Result<FontArc> {
    FontArc::try_from_slice(DEFAULT_FONT_DATA).context("Invalid embedded font")
}

/// Load a TrueType/OpenType font used for box labels
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read font file {}", path.display()))?;
    let font = FontVec::try_from_vec(data)
        .with_context(|| format!("Invalid font file {}", path.display()))?;
    Ok(FontArc::new(font))
}

/// Draw plate boxes labelled `"{class} {confidence:.2}"` and character
/// boxes labelled with the character
pub fn draw_outcome(image: &mut RgbImage, outcome: &RecognitionOutcome, font: &FontArc) {
    for plate in &outcome.plates {
        draw_box(image, &plate.bbox);
        let text = format!("{} {:.2}", plate.class, plate.confidence);
        draw_label(image, &plate.bbox, &text, font);
    }

    for character in &outcome.characters {
        draw_box(image, &character.bbox);
        draw_label(image, &character.bbox, &character.label, font);
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox) {
    let x = bbox.x1 as i32;
    let y = bbox.y1 as i32;
    let width = bbox.x2 as i32 - x;
    let height = bbox.y2 as i32 - y;

    for inset in 0..BOX_THICKNESS as i32 {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x + inset, y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, ANNOTATION_COLOR);
    }
}

fn draw_label(image: &mut RgbImage, bbox: &BoundingBox, text: &str, font: &FontArc) {
    let x = bbox.x1 as i32;
    let y = bbox.y1 as i32 - LABEL_OFFSET - LABEL_SCALE as i32;
    draw_text_mut(
        image,
        ANNOTATION_COLOR,
        x,
        y.max(0),
        PxScale::from(LABEL_SCALE),
        font,
        text,
    );
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        encoder
            .encode_image(image)
            .context("Failed to encode JPEG")?;
    }
    Ok(buffer)
}

/// Encode an RGB image as base64 JPEG
pub fn encode_jpeg_base64(image: &RgbImage) -> Result<String> {
    Ok(common::payload::encode_base64(&encode_jpeg(image)?))
}
