use std::io::Cursor;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{BoothError, BoothResult};

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Decoded, immutable RGBA bitmap.
///
/// Cloning is cheap; the pixels are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage(Arc<RgbaImage>);

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self(Arc::new(pixels))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    /// Encodes the image as a `data:image/png;base64,...` URL
    pub fn to_data_url(&self) -> BoothResult<String> {
        encode_png_data_url(&self.0)
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(pixels: RgbaImage) -> Self {
        Self::new(pixels)
    }
}

/// A photo as held by the session: already decoded, or still serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoSource {
    Raster(RasterImage),
    DataUrl(String),
}

impl PhotoSource {
    /// Decodes the photo. Raster photos are returned as-is.
    pub fn decode(&self) -> BoothResult<RasterImage> {
        match self {
            PhotoSource::Raster(image) => Ok(image.clone()),
            PhotoSource::DataUrl(url) => decode_data_url(url).map(RasterImage::new),
        }
    }
}

impl From<RasterImage> for PhotoSource {
    fn from(image: RasterImage) -> Self {
        PhotoSource::Raster(image)
    }
}

/// Ordered photos for one strip, capped at the selected photo count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoSet {
    photos: Vec<PhotoSource>,
    capacity: usize,
}

impl PhotoSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            photos: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, photo: impl Into<PhotoSource>) -> BoothResult<()> {
        if self.is_full() {
            return Err(BoothError::InvalidInput(format!(
                "Photo set already holds {} photos",
                self.capacity
            )));
        }
        self.photos.push(photo.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.photos.len() >= self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.photos.len())
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhotoSource> {
        self.photos.iter()
    }
}

impl FromIterator<RasterImage> for PhotoSet {
    fn from_iter<T: IntoIterator<Item = RasterImage>>(iter: T) -> Self {
        let photos: Vec<PhotoSource> = iter.into_iter().map(PhotoSource::Raster).collect();
        let capacity = photos.len();
        Self { photos, capacity }
    }
}

pub fn encode_png(pixels: &RgbaImage) -> BoothResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    pixels
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| BoothError::ExportFailure(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

pub fn encode_png_data_url(pixels: &RgbaImage) -> BoothResult<String> {
    let png = encode_png(pixels)?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png)
    ))
}

/// Decodes a `data:image/*;base64,` URL into RGBA pixels
pub fn decode_data_url(data: &str) -> BoothResult<RgbaImage> {
    if !data.starts_with(DATA_URL_PREFIX) {
        return Err(BoothError::UnsupportedMediaType(
            "Data URL does not hold an image".to_string(),
        ));
    }

    let payload_start = data
        .find(BASE64_MARKER)
        .ok_or_else(|| BoothError::DecodeFailure("Data URL is not base64 encoded".to_string()))?;

    let bytes = general_purpose::STANDARD
        .decode(&data[payload_start + BASE64_MARKER.len()..])
        .map_err(|e| BoothError::DecodeFailure(format!("Invalid base64 payload: {}", e)))?;

    let image: DynamicImage = image::load_from_memory(&bytes)?;
    Ok(image.to_rgba8())
}
