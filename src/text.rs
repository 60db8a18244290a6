//! Text drawing onto RGBA canvases with an optional soft drop shadow.
//!
//! Glyphs are laid out and blended by `imageproc`; only the shadow layer is
//! composed here.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

/// Blurred offset copy drawn beneath the text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Shadow {
    /// Semi-transparent black, small blur and offset, scaled to print pixels.
    pub fn soft(scale: f32) -> Self {
        Self {
            color: Rgba([0, 0, 0, 128]),
            blur: 4.0 * scale,
            offset_x: (2.0 * scale).round() as i32,
            offset_y: (2.0 * scale).round() as i32,
        }
    }
}

#[derive(Clone, Copy)]
pub struct TextStyle<'a> {
    pub font: &'a FontArc,
    pub size: f32,
    pub color: Rgba<u8>,
    pub shadow: Option<Shadow>,
}

/// Whether `font` can draw `ch`.
///
/// A mapped glyph id is not enough: bitmap-only emoji fonts map the char but
/// carry no outline, and nothing would be drawn.
pub fn has_glyph(font: &FontArc, ch: char) -> bool {
    let id = font.glyph_id(ch);
    id.0 != 0 && font.outline(id).is_some()
}

/// Ascent to descent of one line at `size`.
pub fn line_height(font: &FontArc, size: f32) -> u32 {
    font.as_scaled(PxScale::from(size)).height().ceil().max(0.0) as u32
}

/// Advance width of `text` and the line height, in pixels.
pub fn measure(font: &FontArc, size: f32, text: &str) -> (u32, u32) {
    let (width, _) = text_size(PxScale::from(size), font, text);
    (width, line_height(font, size))
}

/// Draws `text` with its top-left corner at `(x, y)`.
pub fn draw_text(canvas: &mut RgbaImage, text: &str, x: i32, y: i32, style: &TextStyle<'_>) {
    if text.is_empty() {
        return;
    }

    if let Some(shadow) = style.shadow {
        draw_shadow(canvas, text, x, y, style, &shadow);
    }

    draw_text_mut(canvas, style.color, x, y, PxScale::from(style.size), style.font, text);
}

/// Draws `text` horizontally centered on `center_x`, top edge at `y`.
pub fn draw_text_centered(
    canvas: &mut RgbaImage,
    text: &str,
    center_x: i32,
    y: i32,
    style: &TextStyle<'_>,
) {
    let (width, _) = measure(style.font, style.size, text);
    draw_text(canvas, text, center_x - width as i32 / 2, y, style);
}

fn draw_shadow(
    canvas: &mut RgbaImage,
    text: &str,
    x: i32,
    y: i32,
    style: &TextStyle<'_>,
    shadow: &Shadow,
) {
    let (width, height) = measure(style.font, style.size, text);
    let margin = (shadow.blur * 3.0).ceil() as u32 + 1;

    // Transparent layer so the blur spreads alpha, not the canvas
    let mut layer = RgbaImage::new(width + 2 * margin, height + 2 * margin);
    draw_text_mut(
        &mut layer,
        shadow.color,
        margin as i32,
        margin as i32,
        PxScale::from(style.size),
        style.font,
        text,
    );

    let layer = if shadow.blur > 0.0 {
        imageops::blur(&layer, shadow.blur)
    } else {
        layer
    };

    imageops::overlay(
        canvas,
        &layer,
        (x + shadow.offset_x - margin as i32) as i64,
        (y + shadow.offset_y - margin as i32) as i64,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{find_system_font, load_font};

    fn system_font() -> Option<FontArc> {
        find_system_font().and_then(|p| load_font(&p).ok())
    }

    #[test]
    fn test_measure_grows_with_text() {
        let Some(font) = system_font() else {
            return; // Skip test if no system font available
        };
        let (short, h1) = measure(&font, 40.0, "Hi");
        let (long, h2) = measure(&font, 40.0, "Hello there");
        assert!(long > short);
        assert_eq!(h1, h2);
        assert_eq!(measure(&font, 40.0, "").0, 0);
    }

    #[test]
    fn test_has_glyph_needs_an_outline() {
        let Some(font) = system_font() else {
            return;
        };
        assert!(has_glyph(&font, 'K'));
        // Mapped, but a space has nothing to draw
        assert!(!has_glyph(&font, ' '));
        assert!(!has_glyph(&font, '\u{10FFFD}'));
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let Some(font) = system_font() else {
            return;
        };
        let mut canvas = RgbaImage::from_pixel(200, 80, Rgba([255, 255, 255, 255]));
        let style = TextStyle {
            font: &font,
            size: 40.0,
            color: Rgba([255, 0, 0, 255]),
            shadow: None,
        };

        draw_text(&mut canvas, "KODA", 10, 10, &style);

        let red = canvas.pixels().filter(|p| p[0] > 200 && p[1] < 50).count();
        assert!(red > 0);
        // Nothing above the top edge of the line
        assert!((0..200).all(|x| canvas.get_pixel(x, 5).0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_shadow_darkens_offset_area() {
        let Some(font) = system_font() else {
            return;
        };
        let mut plain = RgbaImage::from_pixel(200, 80, Rgba([255, 255, 255, 255]));
        let mut shadowed = plain.clone();
        let mut style = TextStyle {
            font: &font,
            size: 40.0,
            color: Rgba([255, 255, 255, 255]),
            shadow: None,
        };

        draw_text(&mut plain, "Snap", 10, 10, &style);
        style.shadow = Some(Shadow::soft(1.0));
        draw_text(&mut shadowed, "Snap", 10, 10, &style);

        // White text on white is invisible; only the shadow shows up
        assert!(plain.pixels().all(|p| p[0] >= 250));
        assert!(shadowed.pixels().any(|p| p[0] < 230));
    }

    #[test]
    fn test_text_off_canvas_is_clipped() {
        let Some(font) = system_font() else {
            return;
        };
        let mut canvas = RgbaImage::new(10, 10);
        let style = TextStyle {
            font: &font,
            size: 30.0,
            color: Rgba([0, 0, 0, 255]),
            shadow: Some(Shadow::soft(1.0)),
        };
        draw_text(&mut canvas, "Overflow", -40, -40, &style);
        draw_text(&mut canvas, "Overflow", 500, 500, &style);
    }
}
