//! Glyph renderer - rasterizes single glyphs into bold, binarized bitmaps.
//!
//! Every bitmap is produced the same way:
//!
//! 1. Scale the glyph outline so one em spans `glyph_size` pixels
//! 2. Center its bounding box on a white square canvas (integer offsets)
//! 3. Fill it in black five times, shifted by one pixel in each direction,
//!    to thicken thin strokes
//! 4. Binarize: luminance below `threshold` becomes 0, everything else 255
//!
//! Nothing here depends on time, threads or global state, so the same font
//! bytes and parameters always yield byte-identical bitmaps. The cache and
//! the review UI both rely on that.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use tiny_skia::{Color, FillRule, Paint, Pixmap, Transform};
use ttf_parser::Face;

use super::outline::glyph_path;
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::fonts::TrueTypeFont;

/// Pixel offsets of the bolding redraw.
const BOLD_OFFSETS: [(i32, i32); 5] = [(0, 0), (1, 0), (0, 1), (-1, 0), (0, -1)];

/// File name of the rendered image for `codepoint`, e.g. `U4E2D.png`.
pub fn glyph_image_file_name(codepoint: u32) -> String {
    format!("U{:04X}.png", codepoint)
}

/// Options for glyph rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRenderOptions {
    /// Side of the square canvas in pixels (default: 160)
    pub canvas_size: u32,
    /// Em size in pixels (default: 140)
    pub glyph_size: f32,
    /// Binarization threshold (default: 128)
    pub threshold: u8,
}

impl Default for GlyphRenderOptions {
    fn default() -> Self {
        Self {
            canvas_size: 160,
            glyph_size: 140.0,
            threshold: 128,
        }
    }
}

impl GlyphRenderOptions {
    /// Options with a custom canvas and glyph size.
    pub fn with_size(canvas_size: u32, glyph_size: f32) -> Self {
        Self {
            canvas_size,
            glyph_size,
            ..Default::default()
        }
    }
}

impl From<&ResolverConfig> for GlyphRenderOptions {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            canvas_size: config.canvas_size,
            glyph_size: config.glyph_size,
            threshold: config.binarize_threshold,
        }
    }
}

/// A rendered, binarized glyph. Pixels are 8-bit luma, only 0 or 255.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Source codepoint this bitmap was rendered for
    pub codepoint: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major luma pixels
    pub pixels: Vec<u8>,
}

impl GlyphBitmap {
    /// Image file name for this bitmap.
    pub fn file_name(&self) -> String {
        glyph_image_file_name(self.codepoint)
    }

    /// Number of black pixels.
    pub fn ink_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p == 0).count()
    }

    /// Tight bounding box of black pixels as (x, y, width, height).
    pub fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0, 0);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixels[(y * self.width + x) as usize] == 0 {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x);
                    y1 = y1.max(y);
                }
            }
        }
        if x0 == u32::MAX {
            None
        } else {
            Some((x0, y0, x1 - x0 + 1, y1 - y0 + 1))
        }
    }

    /// Encode as an 8-bit grayscale PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        PngEncoder::new(&mut buf)
            .write_image(&self.pixels, self.width, self.height, ColorType::L8)
            .map_err(|e| Error::Image(e.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Write the PNG into `dir` under [`GlyphBitmap::file_name`].
    pub fn save_png(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        std::fs::write(&path, self.to_png()?)?;
        Ok(path)
    }

    /// Decode a PNG written by [`GlyphBitmap::save_png`].
    pub fn from_png(codepoint: u32, data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
            .map_err(|e| Error::Image(e.to_string()))?
            .to_luma8();
        Ok(Self {
            codepoint,
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        })
    }
}

/// Renders glyphs from a font's own outlines.
#[derive(Debug, Clone, Default)]
pub struct GlyphRenderer {
    options: GlyphRenderOptions,
}

impl GlyphRenderer {
    /// Create a new glyph renderer with the given options.
    pub fn new(options: GlyphRenderOptions) -> Self {
        Self { options }
    }

    /// Rendering options in use.
    pub fn options(&self) -> &GlyphRenderOptions {
        &self.options
    }

    /// Render the glyph the character map assigns to `codepoint`.
    pub fn render(&self, font: &TrueTypeFont<'_>, codepoint: u32) -> Result<GlyphBitmap> {
        let glyph_index = font.glyph_index(codepoint).ok_or_else(|| Error::Render {
            codepoint,
            reason: "codepoint is not in the character map".to_string(),
        })?;
        self.render_glyph(font.face(), glyph_index, codepoint)
    }

    /// Render glyph `glyph_index`, labelling the bitmap with `codepoint`.
    pub fn render_glyph(&self, face: &Face<'_>, glyph_index: u16, codepoint: u32) -> Result<GlyphBitmap> {
        let render_err = |reason: &str| Error::Render {
            codepoint,
            reason: reason.to_string(),
        };

        let size = self.options.canvas_size;
        let mut pixmap = Pixmap::new(size, size).ok_or_else(|| render_err("invalid canvas size"))?;
        pixmap.fill(Color::WHITE);

        let path = glyph_path(face, glyph_index).ok_or_else(|| render_err("glyph has no outline"))?;

        let scale = self.options.glyph_size / f32::from(face.units_per_em());
        let bounds = path.bounds();

        // Pixel-space bounding box, y flipped (font units are y-up)
        let left = (bounds.left() * scale).floor() as i64;
        let right = (bounds.right() * scale).ceil() as i64;
        let top = (-bounds.bottom() * scale).floor() as i64;
        let bottom = (-bounds.top() * scale).ceil() as i64;
        let x = (i64::from(size) - (right - left)).div_euclid(2) - left;
        let y = (i64::from(size) - (bottom - top)).div_euclid(2) - top;

        let mut paint = Paint::default();
        paint.set_color(Color::BLACK);
        paint.anti_alias = true;

        for (dx, dy) in BOLD_OFFSETS {
            let transform =
                Transform::from_row(scale, 0.0, 0.0, -scale, (x + i64::from(dx)) as f32, (y + i64::from(dy)) as f32);
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }

        let threshold = u32::from(self.options.threshold);
        let pixels: Vec<u8> = pixmap
            .pixels()
            .iter()
            .map(|p| {
                // ITU-R 601-2 luma, as 'L' mode conversion does
                let luma = (u32::from(p.red()) * 299 + u32::from(p.green()) * 587 + u32::from(p.blue()) * 114) / 1000;
                if luma < threshold {
                    0
                } else {
                    255
                }
            })
            .collect();

        let bitmap = GlyphBitmap {
            codepoint,
            width: size,
            height: size,
            pixels,
        };

        if bitmap.ink_pixels() == 0 {
            return Err(render_err("glyph rendered blank"));
        }

        Ok(bitmap)
    }

    /// Render and write the PNG into `dir`.
    pub fn render_to_dir(
        &self,
        font: &TrueTypeFont<'_>,
        codepoint: u32,
        dir: impl AsRef<Path>,
    ) -> Result<(GlyphBitmap, PathBuf)> {
        let bitmap = self.render(font, codepoint)?;
        let path = bitmap.save_png(dir)?;
        Ok((bitmap, path))
    }
}

/// Outcome of [`ensure_glyph_images`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCheckReport {
    /// Images that were already present
    pub existing: usize,
    /// Images rendered now
    pub rendered: usize,
    /// Characters that could not be rendered
    pub failed: Vec<char>,
}

/// Make sure every character in `chars` has an image in `dir`.
///
/// The review service shows one image per mapping key; anything missing
/// (a fresh image directory, a font rotation) is rendered here. Existing
/// files are left alone. Failures are logged and collected, never fatal.
pub fn ensure_glyph_images(
    font: &TrueTypeFont<'_>,
    chars: impl IntoIterator<Item = char>,
    dir: impl AsRef<Path>,
    renderer: &GlyphRenderer,
) -> Result<ImageCheckReport> {
    write_glyph_images(font, chars, dir.as_ref(), renderer, false)
}

/// Render every character in `chars` into `dir`, replacing existing files.
///
/// Image names carry only the codepoint, so after a font rotation the
/// directory may hold another font's drawing for the same codepoint.
pub fn refresh_glyph_images(
    font: &TrueTypeFont<'_>,
    chars: impl IntoIterator<Item = char>,
    dir: impl AsRef<Path>,
    renderer: &GlyphRenderer,
) -> Result<ImageCheckReport> {
    write_glyph_images(font, chars, dir.as_ref(), renderer, true)
}

fn write_glyph_images(
    font: &TrueTypeFont<'_>,
    chars: impl IntoIterator<Item = char>,
    dir: &Path,
    renderer: &GlyphRenderer,
    overwrite: bool,
) -> Result<ImageCheckReport> {
    std::fs::create_dir_all(dir)?;

    let mut report = ImageCheckReport::default();
    for c in chars {
        let codepoint = c as u32;
        if !overwrite && dir.join(glyph_image_file_name(codepoint)).exists() {
            report.existing += 1;
            continue;
        }
        match renderer.render_to_dir(font, codepoint, dir) {
            Ok(_) => report.rendered += 1,
            Err(e) => {
                log::warn!("Could not render image for {:?}: {}", c, e);
                report.failed.push(c);
            },
        }
    }

    log::info!(
        "Glyph images in {}: {} present, {} rendered, {} failed",
        dir.display(),
        report.existing,
        report.rendered,
        report.failed.len()
    );
    Ok(report)
}
