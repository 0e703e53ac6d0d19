//! Font table reading.
//!
//! This module provides character map parsing for obfuscation fonts and the
//! glyph-name heuristic that recovers real characters from `uniXXXX`-style
//! glyph names.

pub mod glyph_names;
pub mod truetype_parser;

pub use glyph_names::glyph_name_to_char;
pub use truetype_parser::{parse_cmap_entries, CmapEntry, TrueTypeFont};
