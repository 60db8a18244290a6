//! Capture source adapter: turns live camera frames and uploaded files into
//! cropped, optionally mirrored and filtered photos.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use image::{imageops, DynamicImage, RgbaImage};
use log::{debug, info, warn};

use crate::cropper::{crop_to_aspect, CAPTURE_ASPECT};
use crate::error::{BoothError, BoothResult};
use crate::filters::PhotoFilter;
use crate::media_type;
use crate::photo::RasterImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub target_aspect: f64,
    pub mirror: bool,
    pub filter: PhotoFilter,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            target_aspect: CAPTURE_ASPECT,
            mirror: false,
            filter: PhotoFilter::None,
        }
    }
}

/// Crops a video frame to the target aspect, then mirrors and filters it.
///
/// The result is sized exactly to the crop rectangle.
pub fn capture_from_live_frame(
    frame: &RgbaImage,
    settings: &CaptureSettings,
) -> BoothResult<RasterImage> {
    let mut photo = crop_to_aspect(frame, settings.target_aspect)?;

    if settings.mirror {
        imageops::flip_horizontal_in_place(&mut photo);
    }
    settings.filter.apply(&mut photo);

    debug!(
        "Captured {}x{} photo (mirror: {}, filter: {})",
        photo.width(),
        photo.height(),
        settings.mirror,
        settings.filter
    );

    Ok(RasterImage::new(photo))
}

/// Decodes an uploaded file and runs it through the live-frame pipeline.
///
/// EXIF orientation is applied first so phone photos come out upright.
pub fn capture_from_upload(bytes: &[u8], settings: &CaptureSettings) -> BoothResult<RasterImage> {
    let format = media_type::sniff_image(bytes).ok_or_else(|| {
        BoothError::UnsupportedMediaType("Uploaded file is not an image".to_string())
    })?;

    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        BoothError::DecodeFailure(format!("Failed to decode {}: {}", format.to_mime_type(), e))
    })?;
    let image = apply_orientation(image, read_orientation(bytes));

    capture_from_live_frame(&image.to_rgba8(), settings)
}

fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    match field.value {
        Value::Short(ref v) if !v.is_empty() => Some(v[0] as u32),
        _ => None,
    }
}

fn apply_orientation(img: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.fliph().rotate270(),
        Some(6) => img.rotate90(),
        Some(7) => img.fliph().rotate90(),
        Some(8) => img.rotate270(),
        _ => img,
    }
}

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug)]
pub struct RejectedUpload {
    pub name: String,
    pub error: BoothError,
}

#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub accepted: Vec<RasterImage>,
    pub rejected: Vec<RejectedUpload>,
    /// Files left unprocessed because the limit was reached.
    pub ignored: usize,
}

/// Processes uploads one by one, keeping at most `limit` photos.
///
/// A bad file is rejected on its own; the rest are still processed.
pub fn accept_uploads(
    files: &[UploadedFile],
    limit: usize,
    settings: &CaptureSettings,
) -> UploadOutcome {
    let mut outcome = UploadOutcome::default();

    for (idx, file) in files.iter().enumerate() {
        if outcome.accepted.len() >= limit {
            outcome.ignored = files.len() - idx;
            break;
        }

        let result = capture_from_upload(&file.bytes, settings).map_err(|e| match e {
            BoothError::UnsupportedMediaType(_) => {
                BoothError::UnsupportedMediaType(format!("{} is not an image", file.name))
            }
            other => other,
        });

        match result {
            Ok(photo) => outcome.accepted.push(photo),
            Err(error) => {
                warn!("Rejected upload {}: {}", file.name, error);
                outcome.rejected.push(RejectedUpload {
                    name: file.name.clone(),
                    error,
                });
            }
        }
    }

    info!(
        "Uploads: {} accepted, {} rejected, {} ignored",
        outcome.accepted.len(),
        outcome.rejected.len(),
        outcome.ignored
    );

    outcome
}
