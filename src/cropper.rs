//! Aspect-ratio cropping with "cover" semantics.
//!
//! The crop always keeps one full source axis and trims the other
//! symmetrically, so the result fills the target box without letterboxing.

use image::{imageops, RgbaImage};
use log::debug;

use crate::error::{BoothError, BoothResult};

/// Aspect ratio of a captured frame (400:160).
pub const CAPTURE_ASPECT: f64 = 2.5;

/// Crop rectangle in source pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integral crop rectangle, guaranteed to lie inside the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Rounds to whole pixels, clamped so the rectangle never leaves
    /// `[0, source_width] x [0, source_height]` and is never empty.
    pub fn to_pixels(&self, source_width: u32, source_height: u32) -> PixelRect {
        let width = (self.width.round() as u32).clamp(1, source_width.max(1));
        let height = (self.height.round() as u32).clamp(1, source_height.max(1));
        let x = (self.x.round() as u32).min(source_width.saturating_sub(width));
        let y = (self.y.round() as u32).min(source_height.saturating_sub(height));

        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Computes the centered cover crop of a `source_width x source_height`
/// image for `target_aspect` (width / height).
pub fn cover_crop(
    source_width: u32,
    source_height: u32,
    target_aspect: f64,
) -> BoothResult<CropRect> {
    if source_width == 0 || source_height == 0 {
        return Err(BoothError::InvalidInput(format!(
            "Cannot crop an empty {}x{} image",
            source_width, source_height
        )));
    }
    if !target_aspect.is_finite() || target_aspect <= 0.0 {
        return Err(BoothError::InvalidInput(format!(
            "Target aspect ratio must be positive, got {}",
            target_aspect
        )));
    }

    let src_w = source_width as f64;
    let src_h = source_height as f64;

    let rect = if src_w / src_h > target_aspect {
        // Source is wider: keep full height, trim the sides
        let width = (src_h * target_aspect).min(src_w);
        CropRect {
            x: (src_w - width) / 2.0,
            y: 0.0,
            width,
            height: src_h,
        }
    } else {
        // Source is taller or equal: keep full width, trim top and bottom
        let height = (src_w / target_aspect).min(src_h);
        CropRect {
            x: 0.0,
            y: (src_h - height) / 2.0,
            width: src_w,
            height,
        }
    };

    Ok(rect)
}

/// Cover-crops `image` to `target_aspect` and returns the cropped pixels.
pub fn crop_to_aspect(image: &RgbaImage, target_aspect: f64) -> BoothResult<RgbaImage> {
    let (width, height) = image.dimensions();
    let rect = cover_crop(width, height, target_aspect)?.to_pixels(width, height);

    debug!(
        "Cropping {}x{} to {}x{} at ({}, {})",
        width, height, rect.width, rect.height, rect.x, rect.y
    );

    Ok(imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image())
}
