//! Glyph rendering module for converting font glyphs to recognition images.
//!
//! This module rasterizes single glyphs with the pure-Rust `tiny-skia`
//! library, straight from the font's own outlines.
//!
//! ## Example
//!
//! ```ignore
//! use glyph_oxide::fonts::TrueTypeFont;
//! use glyph_oxide::rendering::{GlyphRenderer, GlyphRenderOptions};
//!
//! let data = std::fs::read("obfuscated.otf")?;
//! let font = TrueTypeFont::parse(&data)?;
//! let renderer = GlyphRenderer::new(GlyphRenderOptions::default());
//! let bitmap = renderer.render(&font, 0xE5D1)?;
//! bitmap.save_png("tools/ocr_chars")?;
//! ```
//!
//! ## Architecture
//!
//! 1. Convert the glyph outline into a tiny-skia path
//! 2. Fill it, bolded, onto a white canvas
//! 3. Binarize and (optionally) write a PNG named after the codepoint

mod glyph_renderer;
mod outline;

pub use glyph_renderer::{
    ensure_glyph_images, glyph_image_file_name, refresh_glyph_images, GlyphBitmap, GlyphRenderOptions, GlyphRenderer,
    ImageCheckReport,
};
