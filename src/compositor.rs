//! Photo strip compositor.
//!
//! Draw order is fixed: background, photos, stickers, custom text, timestamp.
//! Later layers occlude earlier ones where they overlap.
//!
//! Every photo (and the frame image, if any) is decoded before the first
//! pixel is drawn, and a strip is only returned once all layers succeeded,
//! so callers never see a half-drawn canvas.

use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};
use log::{debug, info};

use crate::assets::AssetCatalog;
use crate::cropper::crop_to_aspect;
use crate::customization::{Background, Customization, FontFamily};
use crate::error::{BoothError, BoothResult};
use crate::layout::{compute_layout, CellRect};
use crate::photo::{encode_png, PhotoSet, RasterImage};
use crate::template::{Template, PRINT_SCALE};
use crate::text::{self, Shadow, TextStyle};
use crate::timestamp::{timestamp_lines, Clock, SystemClock, TimeFormat};

/// Corner radius of every photo, in canvas pixels.
pub const CORNER_RADIUS: f32 = 12.0;

/// Sticker glyph size in preview pixels.
const STICKER_SIZE: f32 = 36.0;
const TIMESTAMP_SIZE: f32 = 16.0;
const TIMESTAMP_LINE_GAP: f32 = 4.0;

/// Finished photo strip.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCanvas {
    pixels: RgbaImage,
    template: Template,
}

impl CompositeCanvas {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn to_png(&self) -> BoothResult<Vec<u8>> {
        encode_png(&self.pixels)
    }
}

#[derive(Clone)]
pub struct Compositor {
    assets: Arc<AssetCatalog>,
    clock: Arc<dyn Clock>,
    time_format: TimeFormat,
}

impl Compositor {
    pub fn new(assets: AssetCatalog) -> Self {
        Self {
            assets: Arc::new(assets),
            clock: Arc::new(SystemClock),
            time_format: TimeFormat::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    pub fn assets(&self) -> &AssetCatalog {
        &self.assets
    }

    /// Builds the strip for `photos` with `customization`.
    pub async fn compose(
        &self,
        photos: &PhotoSet,
        customization: &Customization,
    ) -> BoothResult<CompositeCanvas> {
        customization.validate()?;
        if photos.is_empty() {
            return Err(BoothError::InvalidInput(
                "Cannot compose a strip without photos".to_string(),
            ));
        }

        let template = Template::select(photos.len(), customization.layout)?;
        let with_timestamp = customization.has_timestamp();
        let cells = compute_layout(&template, photos.len(), with_timestamp)?;

        let (decoded, frame) = self.decode_all(photos, customization.background).await?;

        let (width, height) = template.canvas_size(with_timestamp);
        let mut pixels = RgbaImage::new(width, height);
        self.draw(
            &mut pixels,
            &decoded,
            frame.as_ref(),
            customization,
            &cells,
            template.bottom_reserve(with_timestamp),
        )?;

        info!(
            "Composed {} strip ({}x{}) from {} photos",
            template,
            width,
            height,
            decoded.len()
        );

        Ok(CompositeCanvas { pixels, template })
    }

    /// Decodes every photo and the frame image concurrently, then waits for
    /// all of them. Results keep the photo order.
    async fn decode_all(
        &self,
        photos: &PhotoSet,
        background: Background,
    ) -> BoothResult<(Vec<RasterImage>, Option<RgbaImage>)> {
        let photo_tasks: Vec<_> = photos
            .iter()
            .cloned()
            .map(|source| tokio::task::spawn_blocking(move || source.decode()))
            .collect();

        let frame_task = match background {
            Background::FrameImage(frame) => {
                let assets = Arc::clone(&self.assets);
                Some(tokio::task::spawn_blocking(move || assets.load_frame(frame)))
            }
            Background::FrameColor(_) => None,
        };

        let mut decoded = Vec::with_capacity(photo_tasks.len());
        for (idx, task) in photo_tasks.into_iter().enumerate() {
            let image = task
                .await
                .map_err(|e| {
                    BoothError::DecodeFailure(format!("Decode of photo {} panicked: {}", idx + 1, e))
                })?
                .map_err(|e| match e {
                    BoothError::DecodeFailure(msg) => {
                        BoothError::DecodeFailure(format!("Photo {}: {}", idx + 1, msg))
                    }
                    other => other,
                })?;
            decoded.push(image);
        }

        let frame = match frame_task {
            Some(task) => Some(task.await.map_err(|e| {
                BoothError::DecodeFailure(format!("Decode of frame image panicked: {}", e))
            })??),
            None => None,
        };

        debug!("Decoded {} photos", decoded.len());
        Ok((decoded, frame))
    }

    /// Draws every layer onto `canvas`. `cells` pairs with `photos` by index.
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        photos: &[RasterImage],
        frame: Option<&RgbaImage>,
        customization: &Customization,
        cells: &[CellRect],
        bottom_reserve: u32,
    ) -> BoothResult<()> {
        if photos.len() != cells.len() {
            return Err(BoothError::InvalidInput(format!(
                "{} photos for {} layout cells",
                photos.len(),
                cells.len()
            )));
        }

        draw_background(canvas, customization.background, frame);

        for (photo, cell) in photos.iter().zip(cells) {
            draw_photo(canvas, photo, cell)?;
        }

        self.draw_stickers(canvas, customization)?;
        self.draw_custom_text(canvas, customization)?;
        self.draw_timestamp(canvas, customization, bottom_reserve)?;

        Ok(())
    }

    fn draw_stickers(&self, canvas: &mut RgbaImage, customization: &Customization) -> BoothResult<()> {
        let Some(glyph) = customization.sticker_theme.glyph() else {
            return Ok(());
        };

        let font = self.assets.fonts().sticker_face()?;
        if !text::has_glyph(font, glyph) {
            return Err(BoothError::DecodeFailure(format!(
                "Sticker font has no glyph for theme {}",
                customization.sticker_theme.as_str()
            )));
        }

        let (width, height) = canvas.dimensions();
        let style = TextStyle {
            font,
            size: STICKER_SIZE * PRINT_SCALE,
            color: Rgba([255, 255, 255, 255]),
            shadow: None,
        };
        let glyph = glyph.to_string();

        for position in &customization.sticker_positions {
            let (x, y) = position.to_pixels(width, height);
            text::draw_text(canvas, &glyph, x, y, &style);
        }

        Ok(())
    }

    fn draw_custom_text(&self, canvas: &mut RgbaImage, customization: &Customization) -> BoothResult<()> {
        if customization.custom_text.is_empty() {
            return Ok(());
        }

        let style = TextStyle {
            font: self.assets.fonts().face(customization.text_font)?,
            size: customization.text_size as f32 * PRINT_SCALE,
            color: customization.text_color.to_rgba(),
            shadow: Some(Shadow::soft(PRINT_SCALE)),
        };

        let (width, height) = canvas.dimensions();
        let (x, y) = customization.text_position.to_pixels(width, height);
        text::draw_text(canvas, &customization.custom_text, x, y, &style);

        Ok(())
    }

    fn draw_timestamp(
        &self,
        canvas: &mut RgbaImage,
        customization: &Customization,
        bottom_reserve: u32,
    ) -> BoothResult<()> {
        if !customization.has_timestamp() {
            return Ok(());
        }

        // Taken at draw time on purpose: the strip always shows "now"
        let now = self.clock.now();
        let lines = timestamp_lines(
            &now,
            customization.add_date,
            customization.add_time,
            self.time_format,
        );

        let style = TextStyle {
            font: self.assets.fonts().face(FontFamily::SansSerif)?,
            size: TIMESTAMP_SIZE * PRINT_SCALE,
            color: customization.timestamp_color.to_rgba(),
            shadow: Some(Shadow::soft(PRINT_SCALE)),
        };

        let (width, height) = canvas.dimensions();
        let line_height = text::line_height(style.font, style.size) as i32;
        let gap = (TIMESTAMP_LINE_GAP * PRINT_SCALE) as i32;
        let block_height = lines.len() as i32 * line_height + (lines.len() as i32 - 1) * gap;

        let band_top = height.saturating_sub(bottom_reserve) as i32;
        let mut y = band_top + (bottom_reserve as i32 - block_height) / 2;
        for line in &lines {
            text::draw_text_centered(canvas, line, width as i32 / 2, y, &style);
            y += line_height + gap;
        }

        Ok(())
    }
}

fn draw_background(canvas: &mut RgbaImage, background: Background, frame: Option<&RgbaImage>) {
    let (width, height) = canvas.dimensions();
    match (background, frame) {
        (Background::FrameImage(_), Some(frame)) => {
            let stretched = imageops::resize(frame, width, height, imageops::FilterType::Lanczos3);
            imageops::replace(canvas, &stretched, 0, 0);
        }
        (Background::FrameColor(color), _) => {
            let fill = color.to_rgba();
            canvas.pixels_mut().for_each(|p| *p = fill);
        }
        (Background::FrameImage(_), None) => {
            let fill = crate::customization::DEFAULT_FRAME_COLOR.to_rgba();
            canvas.pixels_mut().for_each(|p| *p = fill);
        }
    }
}

fn draw_photo(canvas: &mut RgbaImage, photo: &RasterImage, cell: &CellRect) -> BoothResult<()> {
    let cropped = crop_to_aspect(photo.pixels(), cell.aspect())?;
    let mut fitted = imageops::resize(
        &cropped,
        cell.width,
        cell.height,
        imageops::FilterType::Lanczos3,
    );
    round_corners(&mut fitted, CORNER_RADIUS);
    imageops::overlay(canvas, &fitted, cell.x as i64, cell.y as i64);
    Ok(())
}

/// Scales alpha by the coverage of a rounded rectangle the size of `image`.
fn round_corners(image: &mut RgbaImage, radius: f32) {
    let (width, height) = image.dimensions();
    let radius = radius.min(width as f32 / 2.0).min(height as f32 / 2.0);
    if radius <= 0.0 {
        return;
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let coverage = corner_coverage(x, y, width, height, radius);
        if coverage < 1.0 {
            pixel[3] = (pixel[3] as f32 * coverage).round() as u8;
        }
    }
}

fn corner_coverage(x: u32, y: u32, width: u32, height: u32, radius: f32) -> f32 {
    let px = x as f32 + 0.5;
    let py = y as f32 + 0.5;
    let cx = px.clamp(radius, width as f32 - radius);
    let cy = py.clamp(radius, height as f32 - radius);

    let dx = px - cx;
    let dy = py - cy;
    if dx == 0.0 || dy == 0.0 {
        return 1.0;
    }

    let distance = (dx * dx + dy * dy).sqrt();
    (radius - distance + 0.5).clamp(0.0, 1.0)
}
