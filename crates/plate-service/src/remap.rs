//! Mapping between a plate crop and the source image.
//!
//! The character model sees each plate resized to a fixed square. Boxes it
//! returns are scaled linearly back into source-image space, independently
//! per axis. Everything stays in `f32`; rounding to pixels is left to the
//! annotator.

use common::detections::BoundingBox;

/// Integer crop rectangle of a plate inside the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PlateRegion {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Croppable region for a detected plate box.
    ///
    /// The box is clamped to the image and its corners truncated to whole
    /// pixels. Returns `None` when nothing is left to crop.
    pub fn from_bbox(bbox: &BoundingBox, image_width: u32, image_height: u32) -> Option<Self> {
        let clamped = bbox.clamp_to(image_width, image_height);
        let region = Self {
            x1: clamped.x1 as u32,
            y1: clamped.y1 as u32,
            x2: clamped.x2 as u32,
            y2: clamped.y2 as u32,
        };

        (region.width() > 0 && region.height() > 0).then_some(region)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.x1 as f32, self.y1 as f32)
    }
}

/// Map a box detected in a `crop_width` x `crop_height` resized crop back
/// into source-image coordinates of `region`
pub fn remap_box(
    local: &BoundingBox,
    crop_width: u32,
    crop_height: u32,
    region: &PlateRegion,
) -> BoundingBox {
    let (origin_x, origin_y) = region.origin();
    let extent_x = region.width() as f32;
    let extent_y = region.height() as f32;
    let crop_w = crop_width as f32;
    let crop_h = crop_height as f32;

    BoundingBox {
        x1: origin_x + local.x1 * extent_x / crop_w,
        y1: origin_y + local.y1 * extent_y / crop_h,
        x2: origin_x + local.x2 * extent_x / crop_w,
        y2: origin_y + local.y2 * extent_y / crop_h,
    }
}
