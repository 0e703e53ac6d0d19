//! Shared fixtures for integration tests.
//!
//! `FontBuilder` assembles a minimal TrueType font with `write-fonts`
//! (cmap, glyf/loca, post v2 names) so tests need no binary fixtures.
//! `Scripted` is a recognizer that answers from a per-codepoint script.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glyph_oxide::ocr::Candidate;
use glyph_oxide::rendering::GlyphBitmap;
use glyph_oxide::{Error, Recognizer, Result};
use kurbo::BezPath;
use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::glyf::{GlyfLocaBuilder, SimpleGlyph};
use write_fonts::tables::head::Head;
use write_fonts::tables::hhea::Hhea;
use write_fonts::tables::hmtx::{Hmtx, LongMetric};
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::post::Post;
use write_fonts::types::{FWord, GlyphId, UfWord};

/// One contour: on-curve points in font units.
pub type Contour = Vec<(i16, i16)>;

struct GlyphSpec {
    name: String,
    contours: Vec<Contour>,
}

impl GlyphSpec {
    fn outline(&self) -> SimpleGlyph {
        if self.contours.is_empty() {
            return SimpleGlyph::default();
        }
        let mut path = BezPath::new();
        for contour in &self.contours {
            for (i, &(x, y)) in contour.iter().enumerate() {
                let point = (f64::from(x), f64::from(y));
                if i == 0 {
                    path.move_to(point);
                } else {
                    path.line_to(point);
                }
            }
            path.close_path();
        }
        SimpleGlyph::from_bezpath(&path).unwrap()
    }
}

/// Builds a small TrueType font in memory.
pub struct FontBuilder {
    glyphs: Vec<GlyphSpec>,
    cmap: Vec<(u32, u32)>,
    with_names: bool,
}

impl Default for FontBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FontBuilder {
    /// Font with only `.notdef`.
    pub fn new() -> Self {
        Self {
            glyphs: vec![GlyphSpec {
                name: ".notdef".to_string(),
                contours: Vec::new(),
            }],
            cmap: Vec::new(),
            with_names: true,
        }
    }

    /// Add a glyph drawn with `contours`, mapped from `codepoint`.
    pub fn glyph(mut self, codepoint: u32, name: &str, contours: Vec<Contour>) -> Self {
        let gid = self.glyphs.len() as u32;
        self.glyphs.push(GlyphSpec {
            name: name.to_string(),
            contours,
        });
        self.cmap.push((codepoint, gid));
        self
    }

    /// Add a glyph with no outline.
    pub fn empty_glyph(self, codepoint: u32, name: &str) -> Self {
        self.glyph(codepoint, name, Vec::new())
    }

    /// Leave out the `post` table so no glyph has a name.
    pub fn without_glyph_names(mut self) -> Self {
        self.with_names = false;
        self
    }

    /// Serialize the font.
    pub fn build(self) -> Vec<u8> {
        let num_glyphs = self.glyphs.len() as u16;

        let mut glyf_builder = GlyfLocaBuilder::new();
        for glyph in &self.glyphs {
            glyf_builder.add_glyph(&glyph.outline()).unwrap();
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let cmap = Cmap::from_mappings(
            self.cmap
                .iter()
                .map(|&(cp, gid)| (char::from_u32(cp).unwrap(), GlyphId::new(gid))),
        )
        .unwrap();

        let head = Head {
            units_per_em: 1000,
            y_min: -200,
            x_max: 1000,
            y_max: 800,
            index_to_loc_format: loca_format as i16,
            ..Default::default()
        };
        let hhea = Hhea {
            ascender: FWord::new(800),
            descender: FWord::new(-200),
            advance_width_max: UfWord::new(1000),
            x_max_extent: FWord::new(1000),
            caret_slope_rise: 1,
            number_of_h_metrics: num_glyphs,
            ..Default::default()
        };
        let hmtx = Hmtx {
            h_metrics: (0..num_glyphs)
                .map(|_| LongMetric {
                    advance: 1000,
                    side_bearing: 0,
                })
                .collect(),
            left_side_bearings: Vec::new(),
        };
        let maxp = Maxp {
            num_glyphs,
            ..Default::default()
        };

        let mut font = write_fonts::FontBuilder::new();
        font.add_table(&cmap).unwrap();
        font.add_table(&glyf).unwrap();
        font.add_table(&head).unwrap();
        font.add_table(&hhea).unwrap();
        font.add_table(&hmtx).unwrap();
        font.add_table(&loca).unwrap();
        font.add_table(&maxp).unwrap();
        if self.with_names {
            let post = Post::new_v2(self.glyphs.iter().map(|g| g.name.as_str()));
            font.add_table(&post).unwrap();
        }
        font.build()
    }
}

/// Axis-aligned rectangle contour.
pub fn rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Contour {
    vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0)]
}

/// A block shape: one filled square.
pub fn block() -> Vec<Contour> {
    vec![rect(100, 0, 700, 600)]
}

/// A bar shape: one tall thin rectangle.
pub fn bar() -> Vec<Contour> {
    vec![rect(350, -100, 450, 700)]
}

/// A cross shape made of two rectangles.
pub fn cross() -> Vec<Contour> {
    vec![rect(100, 250, 700, 350), rect(350, -100, 450, 700)]
}

/// Font used across tests:
///
/// | Codepoint | Glyph name   | Outline |
/// |-----------|--------------|---------|
/// | U+E5D1    | `uni4E2D`    | block   |
/// | U+E5D2    | `glyph_a`    | bar     |
/// | U+E5D3    | `glyph_b`    | cross   |
/// | U+E5D4    | `uniE000`    | block   |
/// | U+E5D5    | `blank`      | none    |
pub fn obfuscation_font() -> Vec<u8> {
    FontBuilder::new()
        .glyph(0xE5D1, "uni4E2D", block())
        .glyph(0xE5D2, "glyph_a", bar())
        .glyph(0xE5D3, "glyph_b", cross())
        .glyph(0xE5D4, "uniE000", block())
        .empty_glyph(0xE5D5, "blank")
        .build()
}

/// Recognizer answering from a script keyed by codepoint.
///
/// Codepoints missing from the script get an empty result. Calls are
/// counted across clones.
#[derive(Clone)]
pub struct Scripted {
    name: String,
    script: HashMap<u32, Vec<(String, f32)>>,
    fail_on: Option<u32>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: HashMap::new(),
            fail_on: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer `text` with `confidence` for `codepoint`.
    pub fn answer(mut self, codepoint: u32, text: &str, confidence: f32) -> Self {
        self.script
            .entry(codepoint)
            .or_default()
            .push((text.to_string(), confidence));
        self
    }

    /// Return an engine error for `codepoint`.
    pub fn fail_on(mut self, codepoint: u32) -> Self {
        self.fail_on = Some(codepoint);
        self
    }

    /// Shared call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Recognizer for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&mut self, bitmap: &GlyphBitmap) -> Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(bitmap.codepoint) {
            return Err(Error::recognition(&self.name, "scripted failure"));
        }
        Ok(self
            .script
            .get(&bitmap.codepoint)
            .map(|answers| answers.iter().map(|(t, c)| Candidate::new(t.clone(), *c)).collect())
            .unwrap_or_default())
    }
}
