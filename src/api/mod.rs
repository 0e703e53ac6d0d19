//! High-level decoding API.
//!
//! [`FontDecoder`] ties the pieces together: it hashes each font it is
//! given, reuses a cached mapping when it has one, resolves and caches a new
//! mapping otherwise, and decodes text with whatever font is active.
//!
//! ## Quick Start
//!
//! ```ignore
//! use glyph_oxide::api::FontDecoder;
//! use glyph_oxide::ResolverConfig;
//!
//! let mut session = FontDecoder::new(ResolverConfig::default(), "cache");
//! session.update_from_path("page_font.otf", &my_engines)?;
//! let clean = session.decode_value(&payload);
//! ```

mod font_decoder;

pub use font_decoder::{FontDecoder, UpdateOutcome};
