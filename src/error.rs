//! Error types for the glyph mapping library.
//!
//! This module defines all error types that can occur while parsing fonts,
//! rendering glyphs, running recognition engines and persisting mappings.

use std::path::PathBuf;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during mapping resolution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Font binary is malformed, unsupported, or has no usable character map.
    ///
    /// Fatal for that font: no partial mapping is produced.
    #[error("Font parse error: {0}")]
    FontParse(String),

    /// A single glyph could not be rendered
    #[error("Render error for U+{codepoint:04X}: {reason}")]
    Render {
        /// Source codepoint that failed
        codepoint: u32,
        /// Reason for the failure
        reason: String,
    },

    /// A recognition engine failed on one image
    #[error("Recognition error in engine '{engine}': {reason}")]
    Recognition {
        /// Engine name
        engine: String,
        /// Reason for the failure
        reason: String,
    },

    /// Mapping cache could not be read or written
    #[error("Cache I/O error at {}: {reason}", path.display())]
    CacheIo {
        /// File that failed
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// Font bytes do not belong to the active font
    #[error("Font mismatch: expected {expected}, got {actual}")]
    FontMismatch {
        /// Identity of the active font
        expected: String,
        /// Identity of the font that was passed in
        actual: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::CacheIo`] for `path`.
    pub(crate) fn cache_io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::CacheIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`Error::Recognition`] for `engine`.
    pub fn recognition(engine: impl Into<String>, reason: impl ToString) -> Self {
        Error::Recognition {
            engine: engine.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_parse_error() {
        let err = Error::FontParse("no cmap".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Font parse error"));
        assert!(msg.contains("no cmap"));
    }

    #[test]
    fn test_render_error_formats_codepoint() {
        let err = Error::Render {
            codepoint: 0xE5D1,
            reason: "empty outline".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("U+E5D1"));
        assert!(msg.contains("empty outline"));
    }

    #[test]
    fn test_render_error_pads_short_codepoints() {
        let err = Error::Render {
            codepoint: 0x41,
            reason: "x".to_string(),
        };
        assert!(format!("{}", err).contains("U+0041"));
    }

    #[test]
    fn test_cache_io_error() {
        let err = Error::cache_io("/tmp/cache/record.json", "permission denied");
        let msg = format!("{}", err);
        assert!(msg.contains("/tmp/cache/record.json"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_font_mismatch_error() {
        let err = Error::FontMismatch {
            expected: "0123456789abcdef".to_string(),
            actual: "fedcba9876543210".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("expected 0123456789abcdef"));
        assert!(msg.contains("got fedcba9876543210"));
    }

    #[test]
    fn test_recognition_error() {
        let err = Error::recognition("paddle", "session failed");
        let msg = format!("{}", err);
        assert!(msg.contains("paddle"));
        assert!(msg.contains("session failed"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
