//! Font discovery and glyph rasterization for badge text.
//!
//! A [`Typeface`] is either an outline font loaded from disk through
//! `rusttype`, or the embedded 8x8 bitmap font from `font8x8`. Discovery walks
//! an ordered candidate list and never fails: when no outline font can be
//! loaded the bitmap font is used.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use fs_err as fs;
use image::{Rgba, RgbaImage};
use log::debug;
use rusttype::{point, Font, PositionedGlyph, Scale};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Environment variable naming an extra font file to try before the system fonts.
pub const FONT_ENV_VAR: &str = "CARD_POINTS_FONT";

const SYSTEM_FONT_PATHS: &[&str] = &[
    // macOS
    "/System/Library/Fonts/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    // Windows
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/Arial.ttf",
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
];

const BITMAP_CELL: i32 = 8;

/// Tight bounds of the inked pixels of a piece of text, relative to the
/// origin passed to [`Typeface::draw`]. `max_x`/`max_y` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }

    fn union(self, other: InkBounds) -> InkBounds {
        InkBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

enum Kind {
    Outline(Font<'static>),
    Bitmap,
}

pub struct Typeface {
    kind: Kind,
    origin: String,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("origin", &self.origin)
            .finish()
    }
}

impl Typeface {
    /// Try each candidate font in order and return the first one that loads,
    /// falling back to the built-in bitmap font.
    pub fn discover(explicit: Option<&Path>) -> Typeface {
        let from_env = std::env::var_os(FONT_ENV_VAR).map(PathBuf::from);

        for candidate in candidate_paths(explicit, from_env.as_deref()) {
            match Typeface::from_file(&candidate) {
                Ok(typeface) => {
                    debug!("Using font {}", candidate.display());
                    return typeface;
                }
                Err(err) => debug!("Skipping font candidate: {err:#}"),
            }
        }

        debug!("No usable font found, using the built-in bitmap font");
        Typeface::builtin()
    }

    pub fn builtin() -> Typeface {
        Typeface {
            kind: Kind::Bitmap,
            origin: "built-in 8x8 bitmap".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Typeface> {
        let data = fs::read(path)?;
        let font = Font::try_from_vec(data)
            .ok_or_else(|| anyhow::anyhow!("{} is not a valid font", path.display()))?;

        Ok(Typeface {
            kind: Kind::Outline(font),
            origin: path.display().to_string(),
        })
    }

    /// Where this typeface came from: a font path or the built-in marker.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Ink bounds of `text` at `px` pixels, or `None` if nothing would be drawn.
    pub fn measure(&self, text: &str, px: f32) -> Option<InkBounds> {
        match &self.kind {
            Kind::Outline(font) => outline_glyphs(font, text, px, 0, 0)
                .iter()
                .filter_map(|glyph| glyph.pixel_bounding_box())
                .map(|bb| InkBounds {
                    min_x: bb.min.x,
                    min_y: bb.min.y,
                    max_x: bb.max.x,
                    max_y: bb.max.y,
                })
                .reduce(InkBounds::union),
            Kind::Bitmap => {
                let cell = bitmap_scale(px);
                text.chars()
                    .enumerate()
                    .filter_map(|(i, ch)| {
                        let rows = BASIC_FONTS.get(ch)?;
                        bitmap_ink(&rows).map(|(c0, r0, c1, r1)| {
                            let left = i as i32 * BITMAP_CELL;
                            InkBounds {
                                min_x: (left + c0) * cell,
                                min_y: r0 * cell,
                                max_x: (left + c1 + 1) * cell,
                                max_y: (r1 + 1) * cell,
                            }
                        })
                    })
                    .reduce(InkBounds::union)
            }
        }
    }

    /// Draw `text` with its layout origin at (`x`, `y`), blending glyph
    /// coverage over the existing pixels. Pixels outside `img` are clipped.
    pub fn draw(&self, img: &mut RgbaImage, text: &str, px: f32, x: i32, y: i32, color: Rgba<u8>) {
        match &self.kind {
            Kind::Outline(font) => {
                for glyph in outline_glyphs(font, text, px, x, y) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, v| {
                            let coverage = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                            blend_pixel(
                                img,
                                bb.min.x + gx as i32,
                                bb.min.y + gy as i32,
                                color,
                                coverage,
                            );
                        });
                    }
                }
            }
            Kind::Bitmap => {
                let cell = bitmap_scale(px);
                for (i, ch) in text.chars().enumerate() {
                    let Some(rows) = BASIC_FONTS.get(ch) else {
                        continue;
                    };
                    let left = x + i as i32 * BITMAP_CELL * cell;
                    for (row, bits) in rows.iter().enumerate() {
                        for col in 0..BITMAP_CELL {
                            if bits & (1u8 << col) == 0 {
                                continue;
                            }
                            let x0 = left + col * cell;
                            let y0 = y + row as i32 * cell;
                            for dy in 0..cell {
                                for dx in 0..cell {
                                    blend_pixel(img, x0 + dx, y0 + dy, color, 255);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn candidate_paths(explicit: Option<&Path>, from_env: Option<&Path>) -> Vec<PathBuf> {
    explicit
        .into_iter()
        .chain(from_env)
        .map(Path::to_path_buf)
        .chain(SYSTEM_FONT_PATHS.iter().map(PathBuf::from))
        .collect()
}

fn outline_glyphs(
    font: &Font<'static>,
    text: &str,
    px: f32,
    x: i32,
    y: i32,
) -> Vec<PositionedGlyph<'static>> {
    let scale = Scale::uniform(px);
    let ascent = font.v_metrics(scale).ascent;
    font.layout(text, scale, point(x as f32, y as f32 + ascent)).collect()
}

/// Size in pixels of one bitmap font dot at the requested font size.
fn bitmap_scale(px: f32) -> i32 {
    ((px / BITMAP_CELL as f32).round() as i32).max(1)
}

/// Inked (first column, first row, last column, last row) of an 8x8 glyph.
fn bitmap_ink(rows: &[u8; 8]) -> Option<(i32, i32, i32, i32)> {
    let mut ink: Option<(i32, i32, i32, i32)> = None;
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..BITMAP_CELL {
            if bits & (1u8 << col) != 0 {
                let row = row as i32;
                ink = Some(match ink {
                    None => (col, row, col, row),
                    Some((c0, r0, c1, r1)) => {
                        (c0.min(col), r0.min(row), c1.max(col), r1.max(row))
                    }
                });
            }
        }
    }
    ink
}

/// Blend `color` over the pixel at (`x`, `y`) with the given coverage (0..=255).
pub(crate) fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: u8) {
    if coverage == 0 || x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= img.width() || y >= img.height() {
        return;
    }

    let alpha = coverage as u32 * color[3] as u32 / 255;
    let inv = 255 - alpha;
    let dst = img.get_pixel_mut(x, y);
    for channel in 0..3 {
        let mixed = color[channel] as u32 * alpha + dst[channel] as u32 * inv;
        dst[channel] = ((mixed + 127) / 255) as u8;
    }
    dst[3] = (alpha + dst[3] as u32 * inv / 255).min(255) as u8;
}
