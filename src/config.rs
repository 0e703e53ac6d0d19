//! Configuration for mapping resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum confidence for the primary recognition engine.
pub const PRIMARY_MIN_CONFIDENCE: f32 = 0.7;

/// Minimum confidence for fallback recognition engines.
pub const FALLBACK_MIN_CONFIDENCE: f32 = 0.5;

/// Mapping resolution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Side of the square render canvas in pixels.
    pub canvas_size: u32,

    /// Em size of the rendered glyph in pixels.
    pub glyph_size: f32,

    /// Luminance below which a pixel becomes black.
    pub binarize_threshold: u8,

    /// Number of concurrent render/recognition workers.
    pub workers: usize,

    /// Directory for rendered glyph images.
    pub image_dir: PathBuf,

    /// Write rendered glyph images to `image_dir`.
    pub write_images: bool,

    /// Confidence bar for the primary engine (never below 0.7).
    pub primary_min_confidence: f32,

    /// Confidence bar for fallback engines (never below 0.5).
    pub fallback_min_confidence: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            canvas_size: 160,
            glyph_size: 140.0,
            binarize_threshold: 128,
            workers: 2,
            image_dir: PathBuf::from("tools").join("ocr_chars"),
            write_images: true,
            primary_min_confidence: PRIMARY_MIN_CONFIDENCE,
            fallback_min_confidence: FALLBACK_MIN_CONFIDENCE,
        }
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set canvas and glyph size.
    pub fn with_canvas(mut self, canvas_size: u32, glyph_size: f32) -> Self {
        self.canvas_size = canvas_size;
        self.glyph_size = glyph_size;
        self
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the image directory.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    /// Enable or disable writing glyph images.
    pub fn with_write_images(mut self, enable: bool) -> Self {
        self.write_images = enable;
        self
    }

    /// Set recognition thresholds. Values below the floors are raised.
    pub fn with_thresholds(mut self, primary: f32, fallback: f32) -> Self {
        self.primary_min_confidence = primary;
        self.fallback_min_confidence = fallback;
        self
    }

    /// Effective primary threshold.
    pub fn primary_threshold(&self) -> f32 {
        self.primary_min_confidence.max(PRIMARY_MIN_CONFIDENCE)
    }

    /// Effective fallback threshold.
    pub fn fallback_threshold(&self) -> f32 {
        self.fallback_min_confidence.max(FALLBACK_MIN_CONFIDENCE)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }
        if self.canvas_size == 0 {
            return Err(Error::InvalidConfig("canvas_size must be positive".to_string()));
        }
        if !(self.glyph_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "glyph_size must be positive, got {}",
                self.glyph_size
            )));
        }
        for (name, value) in [
            ("primary_min_confidence", self.primary_min_confidence),
            ("fallback_min_confidence", self.fallback_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.canvas_size, 160);
        assert_eq!(config.glyph_size, 140.0);
        assert_eq!(config.binarize_threshold, 128);
        assert_eq!(config.workers, 2);
        assert!(config.write_images);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thresholds_never_drop_below_floor() {
        let config = ResolverConfig::new().with_thresholds(0.1, 0.2);
        assert_eq!(config.primary_threshold(), PRIMARY_MIN_CONFIDENCE);
        assert_eq!(config.fallback_threshold(), FALLBACK_MIN_CONFIDENCE);

        let strict = ResolverConfig::new().with_thresholds(0.9, 0.8);
        assert_eq!(strict.primary_threshold(), 0.9);
        assert_eq!(strict.fallback_threshold(), 0.8);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = ResolverConfig::new().with_workers(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_glyph_size() {
        let config = ResolverConfig::new().with_canvas(100, 0.0);
        assert!(config.validate().is_err());
        let config = ResolverConfig::new().with_canvas(100, f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let config = ResolverConfig::new().with_thresholds(1.5, 0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: ResolverConfig = serde_json::from_str(r#"{"workers": 4}"#).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.canvas_size, 160);
    }
}
