// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::neg_cmp_op_on_partial_ord)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # Glyph Oxide
//!
//! Recover the real text behind web fonts that scramble their character map.
//!
//! Sites that obfuscate text serve a custom font whose private-use
//! codepoints draw ordinary letters, digits and ideographs. The raw text is
//! gibberish; only the rendered page reads correctly. This crate rebuilds the
//! codepoint -> character mapping from the font itself and applies it to
//! arbitrary JSON payloads.
//!
//! ## Core Features
//!
//! - **Font tables**: best Unicode `cmap` selection, glyph names from `post`/CFF
//! - **Glyph names**: `uniXXXX` / `uXXXXXX` names resolve without rendering
//! - **Rendering**: deterministic, bold, binarized glyph bitmaps (tiny-skia)
//! - **Recognition**: confidence-gated cascade of pluggable engines, run by a
//!   bounded worker pool; ONNX Runtime CTC engines with the `ocr` feature
//! - **Caching**: mappings persisted per font content hash, with reviewer
//!   edits picked up on load
//! - **Decoding**: single-pass substitution over nested JSON values
//!
//! ## Quick Start
//!
//! ```ignore
//! use glyph_oxide::{FontResolver, ResolverConfig, TextDecoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let font = std::fs::read("obfuscated.otf")?;
//! let resolver = FontResolver::new(ResolverConfig::default());
//! let resolution = resolver.resolve_naming_only(&font)?;
//! println!("{}", resolution.report);
//!
//! let decoder = TextDecoder::new(&resolution.mapping);
//! println!("{}", decoder.decode_str("\u{E5D1}"));
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Mapping data model
pub mod mapping;

// Font tables and glyph names
pub mod fonts;

// Glyph rasterization
pub mod rendering;

// Recognition engines, cascade and worker pool
pub mod ocr;

// Resolution pipeline
pub mod resolver;

// Persistent mapping cache
pub mod cache;

// Text decoding
pub mod decoder;

// Font URL extraction
pub mod locator;

// High-level API
pub mod api;

// Re-exports
pub use api::{FontDecoder, UpdateOutcome};
pub use cache::MappingCache;
pub use config::ResolverConfig;
pub use decoder::{DecodeStats, TextDecoder};
pub use error::{Error, Result};
pub use mapping::{FontCacheRecord, FontIdentity, FontMapping, MappingEntry, ResolutionMethod};
pub use ocr::{Candidate, RecognitionCascade, Recognizer};
pub use resolver::{FontResolver, Resolution, ResolutionReport};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
