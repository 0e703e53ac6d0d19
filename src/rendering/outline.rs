//! Outline builder - turns `ttf-parser` glyph outlines into tiny-skia paths.

use tiny_skia::{Path, PathBuilder};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// Collects glyph outline segments into a tiny-skia path in font units.
pub(crate) struct OutlinePathBuilder {
    builder: PathBuilder,
}

impl OutlinePathBuilder {
    /// Create an empty builder.
    pub(crate) fn new() -> Self {
        Self {
            builder: PathBuilder::new(),
        }
    }

    /// Finish the path. `None` when the outline had no drawable segments.
    pub(crate) fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for OutlinePathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Outline of glyph `glyph_index` as a path in font units (y up).
pub(crate) fn glyph_path(face: &Face<'_>, glyph_index: u16) -> Option<Path> {
    let mut builder = OutlinePathBuilder::new();
    face.outline_glyph(GlyphId(glyph_index), &mut builder)?;
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_has_no_path() {
        let builder = OutlinePathBuilder::new();
        assert!(builder.finish().is_none());
    }

    #[test]
    fn test_square_outline_bounds() {
        let mut builder = OutlinePathBuilder::new();
        builder.move_to(100.0, 0.0);
        builder.line_to(600.0, 0.0);
        builder.line_to(600.0, 700.0);
        builder.quad_to(350.0, 800.0, 100.0, 700.0);
        builder.close();

        let path = builder.finish().expect("path");
        let bounds = path.bounds();
        assert_eq!(bounds.left(), 100.0);
        assert_eq!(bounds.right(), 600.0);
        assert_eq!(bounds.top(), 0.0);
        assert!(bounds.bottom() >= 700.0);
    }
}
