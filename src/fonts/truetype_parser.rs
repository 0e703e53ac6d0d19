//! TrueType/OpenType character map reader.
//!
//! This module wraps the `ttf-parser` crate to expose every entry of a
//! font's best Unicode character map as (codepoint, glyph name, glyph index)
//! triples, the starting point of mapping resolution.
//!
//! # Choosing the character map
//!
//! Fonts may carry several `cmap` subtables. The preferred one is picked in
//! the same order fontTools' `getBestCmap` uses:
//!
//! | Platform | Encoding | Meaning                  |
//! |----------|----------|--------------------------|
//! | 3        | 10       | Windows, full Unicode    |
//! | 0        | 6        | Unicode, full repertoire |
//! | 0        | 4        | Unicode 2.0+, full       |
//! | 3        | 1        | Windows, BMP             |
//! | 0        | 3        | Unicode 2.0+, BMP        |
//! | 0        | 2        | ISO 10646                |
//! | 0        | 1        | Unicode 1.1              |
//! | 0        | 0        | Unicode 1.0              |

use std::collections::BTreeMap;

use ttf_parser::cmap::Subtable;
use ttf_parser::{Face, GlyphId, PlatformId};

use crate::error::{Error, Result};

/// Preferred (platform, encoding) pairs, best first.
const CMAP_PREFERENCE: &[(PlatformId, u16)] = &[
    (PlatformId::Windows, 10),
    (PlatformId::Unicode, 6),
    (PlatformId::Unicode, 4),
    (PlatformId::Windows, 1),
    (PlatformId::Unicode, 3),
    (PlatformId::Unicode, 2),
    (PlatformId::Unicode, 1),
    (PlatformId::Unicode, 0),
];

/// One entry of a font's character map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapEntry {
    /// Source codepoint (the obfuscated character)
    pub codepoint: u32,
    /// Glyph name from `post`/CFF, or `glyphNNNNN` when the font has none
    pub glyph_name: String,
    /// Glyph index
    pub glyph_index: u16,
}

impl CmapEntry {
    /// The codepoint as a `char`.
    pub fn source_char(&self) -> Option<char> {
        char::from_u32(self.codepoint)
    }
}

/// Parsed font with its character map resolved.
pub struct TrueTypeFont<'a> {
    /// The parsed font face
    face: Face<'a>,
    /// Original font data
    data: &'a [u8],
    /// Character map entries, ascending by codepoint
    entries: Vec<CmapEntry>,
}

impl<'a> TrueTypeFont<'a> {
    /// Parse a TrueType/OpenType font from raw data.
    ///
    /// Fails with [`Error::FontParse`] when the data is empty, is not a font,
    /// or has no usable Unicode character map.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::FontParse("font file is empty".to_string()));
        }

        let face = Face::parse(data, 0).map_err(|e| Error::FontParse(e.to_string()))?;
        let entries = read_best_cmap(&face)?;

        log::debug!(
            "Parsed font '{}': {} glyphs, {} cmap entries",
            family_name(&face).unwrap_or_else(|| "Unknown".to_string()),
            face.number_of_glyphs(),
            entries.len()
        );

        Ok(Self { face, data, entries })
    }

    /// Character map entries in ascending codepoint order.
    pub fn entries(&self) -> &[CmapEntry] {
        &self.entries
    }

    /// The underlying `ttf-parser` face.
    pub fn face(&self) -> &Face<'a> {
        &self.face
    }

    /// Get the raw font data.
    pub fn raw_data(&self) -> &'a [u8] {
        self.data
    }

    /// Glyph index the character map assigns to `codepoint`.
    pub fn glyph_index(&self, codepoint: u32) -> Option<u16> {
        self.entries
            .binary_search_by_key(&codepoint, |e| e.codepoint)
            .ok()
            .map(|i| self.entries[i].glyph_index)
    }

    /// Get the font family name.
    pub fn family_name(&self) -> Option<String> {
        family_name(&self.face)
    }

    /// Get units per em for this font.
    pub fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    /// Get the number of glyphs in the font.
    pub fn num_glyphs(&self) -> u16 {
        self.face.number_of_glyphs()
    }
}

/// Parse only the character map of a font binary.
pub fn parse_cmap_entries(data: &[u8]) -> Result<Vec<CmapEntry>> {
    Ok(TrueTypeFont::parse(data)?.entries)
}

fn family_name(face: &Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .find(|name| name.name_id == ttf_parser::name_id::FAMILY)
        .and_then(|name| name.to_string())
}

/// Pick the preferred subtable and collect its non-`.notdef` entries.
fn read_best_cmap(face: &Face<'_>) -> Result<Vec<CmapEntry>> {
    let cmap = face
        .tables()
        .cmap
        .ok_or_else(|| Error::FontParse("font has no cmap table".to_string()))?;

    let subtables: Vec<Subtable<'_>> = cmap.subtables.into_iter().collect();
    let best = CMAP_PREFERENCE
        .iter()
        .find_map(|&(platform, encoding)| {
            subtables
                .iter()
                .find(|s| s.platform_id == platform && s.encoding_id == encoding)
        })
        .ok_or_else(|| Error::FontParse("font has no usable Unicode cmap subtable".to_string()))?;

    let mut glyphs: BTreeMap<u32, u16> = BTreeMap::new();
    let mut codepoints = Vec::new();
    best.codepoints(|cp| codepoints.push(cp));
    for cp in codepoints {
        match best.glyph_index(cp) {
            Some(gid) if gid.0 != 0 => {
                glyphs.insert(cp, gid.0);
            },
            _ => {},
        }
    }

    if glyphs.is_empty() {
        return Err(Error::FontParse("character map has no glyph entries".to_string()));
    }

    Ok(glyphs
        .into_iter()
        .map(|(codepoint, glyph_index)| CmapEntry {
            codepoint,
            glyph_name: glyph_name(face, glyph_index),
            glyph_index,
        })
        .collect())
}

fn glyph_name(face: &Face<'_>, glyph_index: u16) -> String {
    face.glyph_name(GlyphId(glyph_index))
        .map(str::to_string)
        .unwrap_or_else(|| format!("glyph{:05}", glyph_index))
}
