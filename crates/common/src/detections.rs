//! Detection contracts shared by the plate service and its clients.
//!
//! Boxes are kept in floating point corner form (`x1, y1, x2, y2`) so that
//! character boxes can be rescaled from a plate crop back into the source
//! image without compounding rounding error. Integer pixels only appear
//! when something is drawn.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from a YOLO style center/size prediction
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp the box to an image of the given size
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// Intersection over Union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        };

        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Labeled, scored box produced by a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label resolved through the model's class table
    pub class: String,

    /// Raw class index emitted by the model
    pub class_id: usize,

    /// Detection confidence (0.0 to 1.0)
    pub confidence: f32,

    pub bbox: BoundingBox,
}

/// Character detection remapped into source-image coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetection {
    pub label: String,

    pub confidence: f32,

    /// Box in source-image coordinates
    pub bbox: BoundingBox,

    /// Top-left corner of the plate region the character was read from
    pub plate_origin: (f32, f32),
}

impl CharacterDetection {
    /// Left edge, used as the column key when laying out text
    pub fn x(&self) -> f32 {
        self.bbox.x1
    }

    /// Top edge, used as the row key when laying out text
    pub fn y(&self) -> f32 {
        self.bbox.y1
    }
}
