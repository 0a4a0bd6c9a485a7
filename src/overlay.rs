//! Point badge rendering.
//!
//! The badge is a semi-transparent rectangle in the bottom-left corner of the
//! card with the point value centered inside it. Its color depends on the
//! point band the value falls into.

use crate::typeface::{blend_pixel, Typeface};
use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use thiserror::Error;

/// Output size of standard (non high-quality) renders.
pub const COMPACT_SIZE: (u32, u32) = (177, 254);

/// Smallest font size the badge text is ever drawn at.
pub const MIN_FONT_PX: f32 = 60.0;

const BADGE_ALPHA: u8 = 200;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("text {text:?} has no visible glyphs")]
    NothingToDraw { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointBand {
    Red,
    Orange,
    Yellow,
    Green,
}

impl PointBand {
    /// Values of zero or below share the green band with 1..=9.
    pub fn for_points(points: i64) -> PointBand {
        match points {
            p if p >= 50 => PointBand::Red,
            p if p >= 20 => PointBand::Orange,
            p if p >= 10 => PointBand::Yellow,
            _ => PointBand::Green,
        }
    }

    pub fn background(self) -> Rgba<u8> {
        match self {
            PointBand::Red => Rgba([255, 0, 0, BADGE_ALPHA]),
            PointBand::Orange => Rgba([255, 165, 0, BADGE_ALPHA]),
            PointBand::Yellow => Rgba([255, 255, 0, BADGE_ALPHA]),
            PointBand::Green => Rgba([0, 255, 0, BADGE_ALPHA]),
        }
    }

    pub fn text_color(self) -> Rgba<u8> {
        match self {
            PointBand::Red => Rgba([255, 255, 255, 255]),
            _ => Rgba([0, 0, 0, 255]),
        }
    }
}

/// Knobs that differ between the card and alias passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeStyle {
    /// Multiplier applied to font size, padding and margins.
    pub font_scale: f32,
    /// Move the badge clear of the printed card frame. Only honoured for
    /// high-quality renders with a font scale above 1.0.
    pub frame_nudge: bool,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        BadgeStyle {
            font_scale: 0.70,
            frame_nudge: false,
        }
    }
}

impl BadgeStyle {
    /// Full-size card scans get a bigger badge pushed inside the card frame.
    pub fn for_cards(high_quality: bool) -> BadgeStyle {
        if high_quality {
            BadgeStyle {
                font_scale: 1.40,
                frame_nudge: true,
            }
        } else {
            BadgeStyle::default()
        }
    }

    fn scaled(&self, value: f32) -> i32 {
        (value * self.font_scale) as i32
    }
}

/// Axis-aligned pixel rectangle, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Where the badge and its text go on an image of a given size, before any
/// final resize.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeLayout {
    pub band: PointBand,
    pub text: String,
    pub font_px: f32,
    pub rect: Rect,
    /// Origin to pass to [`Typeface::draw`] so the ink is centered in `rect`.
    pub text_origin: (i32, i32),
}

/// Font size for an image: a quarter of the smaller side, scaled, never
/// below [`MIN_FONT_PX`].
pub fn font_px(width: u32, height: u32, style: &BadgeStyle) -> f32 {
    let base = (width.min(height) / 4) as f32;
    (base * style.font_scale).max(MIN_FONT_PX)
}

#[derive(Debug)]
pub struct Renderer {
    typeface: Typeface,
}

impl Renderer {
    pub fn new(typeface: Typeface) -> Renderer {
        Renderer { typeface }
    }

    /// Stamp `points` on `image` with the default badge style.
    pub fn render(
        &self,
        image: &DynamicImage,
        points: i64,
        high_quality: bool,
    ) -> Result<RgbaImage, RenderError> {
        self.render_with(image, points, high_quality, &BadgeStyle::default())
    }

    pub fn render_with(
        &self,
        image: &DynamicImage,
        points: i64,
        high_quality: bool,
        style: &BadgeStyle,
    ) -> Result<RgbaImage, RenderError> {
        let mut canvas = image.to_rgba8();
        let layout = self.layout(canvas.width(), canvas.height(), points, high_quality, style)?;

        let background = layout.band.background();
        for y in layout.rect.y1..layout.rect.y2 {
            for x in layout.rect.x1..layout.rect.x2 {
                blend_pixel(&mut canvas, x, y, background, 255);
            }
        }

        let (text_x, text_y) = layout.text_origin;
        self.typeface.draw(
            &mut canvas,
            &layout.text,
            layout.font_px,
            text_x,
            text_y,
            layout.band.text_color(),
        );

        if high_quality {
            Ok(canvas)
        } else {
            let (width, height) = COMPACT_SIZE;
            Ok(image::imageops::resize(&canvas, width, height, FilterType::Lanczos3))
        }
    }

    pub fn layout(
        &self,
        width: u32,
        height: u32,
        points: i64,
        high_quality: bool,
        style: &BadgeStyle,
    ) -> Result<BadgeLayout, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyImage { width, height });
        }

        let text = points.to_string();
        let font_px = font_px(width, height, style);
        let ink = self
            .typeface
            .measure(&text, font_px)
            .ok_or_else(|| RenderError::NothingToDraw { text: text.clone() })?;

        let pad_x = style.scaled(16.0);
        let pad_y = style.scaled(10.0);
        let rect_width = ink.width() as i32 + pad_x * 2;
        let rect_height = ink.height() as i32 + pad_y * 2;

        let margin = style.scaled(10.0);
        let mut left = margin;
        let mut bottom = margin + style.scaled(10.0);
        if high_quality && style.frame_nudge && style.font_scale > 1.0 {
            bottom += (height as f32 * 0.035) as i32;
            left += (width as f32 * 0.025) as i32;
        }

        let (width, height) = (width as i32, height as i32);
        let y2 = height - bottom;
        let rect = Rect {
            x1: left.clamp(0, width),
            y1: (y2 - rect_height).clamp(0, height),
            x2: (left + rect_width).clamp(0, width),
            y2: y2.clamp(0, height),
        };

        let center_x = (rect.x1 + rect.x2) as f32 / 2.0;
        let center_y = (rect.y1 + rect.y2) as f32 / 2.0;
        let ink_center_x = (ink.min_x + ink.max_x) as f32 / 2.0;
        let ink_center_y = (ink.min_y + ink.max_y) as f32 / 2.0;

        Ok(BadgeLayout {
            band: PointBand::for_points(points),
            text,
            font_px,
            rect,
            text_origin: (
                (center_x - ink_center_x).round() as i32,
                (center_y - ink_center_y).round() as i32,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(Typeface::builtin())
    }

    #[test]
    fn bands_follow_thresholds() {
        assert_eq!(PointBand::for_points(100), PointBand::Red);
        assert_eq!(PointBand::for_points(50), PointBand::Red);
        assert_eq!(PointBand::for_points(49), PointBand::Orange);
        assert_eq!(PointBand::for_points(20), PointBand::Orange);
        assert_eq!(PointBand::for_points(19), PointBand::Yellow);
        assert_eq!(PointBand::for_points(10), PointBand::Yellow);
        assert_eq!(PointBand::for_points(9), PointBand::Green);
        assert_eq!(PointBand::for_points(1), PointBand::Green);
    }

    #[test]
    fn non_positive_points_use_lowest_band() {
        assert_eq!(PointBand::for_points(0), PointBand::Green);
        assert_eq!(PointBand::for_points(-5), PointBand::Green);
    }

    #[test]
    fn font_size_has_a_floor() {
        let style = BadgeStyle::default();
        assert_eq!(font_px(100, 100, &style), MIN_FONT_PX);
        assert_eq!(font_px(800, 1200, &style), 200.0 * 0.70);
    }

    #[test]
    fn badge_sits_in_bottom_left() {
        let layout = renderer()
            .layout(600, 800, 15, true, &BadgeStyle::default())
            .unwrap();

        assert_eq!(layout.rect.x1, 7);
        assert_eq!(layout.rect.y2, 800 - 14);
        assert!(layout.rect.x2 < 300);
        assert!(layout.rect.y1 > 400);
    }

    #[test]
    fn frame_nudge_only_applies_to_high_quality() {
        let style = BadgeStyle::for_cards(true);
        let nudged = renderer().layout(1000, 1000, 5, true, &style).unwrap();
        let plain = renderer().layout(1000, 1000, 5, false, &style).unwrap();

        assert_eq!(nudged.rect.x1, plain.rect.x1 + 25);
        assert_eq!(nudged.rect.y2, plain.rect.y2 - 35);
    }

    #[test]
    fn rect_is_clamped_to_tiny_images() {
        let layout = renderer()
            .layout(20, 20, 1000, true, &BadgeStyle::default())
            .unwrap();

        assert!(layout.rect.x2 <= 20);
        assert!(layout.rect.y1 >= 0);
    }

    #[test]
    fn text_ink_is_centered_in_rect() {
        let typeface = Typeface::builtin();
        let layout = renderer()
            .layout(400, 600, 42, true, &BadgeStyle::default())
            .unwrap();
        let ink = typeface.measure("42", layout.font_px).unwrap();

        let left_gap = layout.text_origin.0 + ink.min_x - layout.rect.x1;
        let right_gap = layout.rect.x2 - (layout.text_origin.0 + ink.max_x);
        let top_gap = layout.text_origin.1 + ink.min_y - layout.rect.y1;
        let bottom_gap = layout.rect.y2 - (layout.text_origin.1 + ink.max_y);

        assert!((left_gap - right_gap).abs() <= 1);
        assert!((top_gap - bottom_gap).abs() <= 1);
    }

    #[test]
    fn empty_image_is_an_error() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(matches!(
            renderer().render(&image, 10, true),
            Err(RenderError::EmptyImage { .. })
        ));
    }
}
