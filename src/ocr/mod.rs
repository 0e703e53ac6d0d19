//! Character recognition over rendered glyph bitmaps.
//!
//! Recognition engines are pluggable through the [`Recognizer`] trait and
//! composed into an ordered [`RecognitionCascade`]: a strict primary engine
//! and lenient fallbacks that only get to rescue what the primary engine
//! rejected. A [`RecognitionPool`] runs render + cascade over many codepoints
//! with one cascade (and therefore one set of engines) per worker thread.
//!
//! With the `ocr` feature, [`onnx::OnnxRecognizer`] provides a CTC text
//! recognizer over ONNX Runtime that can serve as either engine.

pub mod cascade;
pub mod filter;
pub mod pool;

#[cfg(feature = "ocr")]
#[cfg_attr(docsrs, doc(cfg(feature = "ocr")))]
pub mod onnx;

pub use cascade::{CascadeOutcome, CandidatePick, RecognitionCascade, RecognitionStage, StageAttempt, Verdict};
pub use pool::{EngineFactory, JobOutcome, RecognitionPool};

use crate::error::Result;
use crate::rendering::GlyphBitmap;

/// One piece of text an engine read from an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Recognized text
    pub text: String,
    /// Engine confidence in [0, 1]
    pub confidence: f32,
}

impl Candidate {
    /// Create a candidate.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A character recognition engine.
///
/// Engines are stateful and expensive to create; `recognize` takes
/// `&mut self` and an instance is never shared between workers.
pub trait Recognizer: Send {
    /// Engine name for logs and errors.
    fn name(&self) -> &str;

    /// Read text from a bitmap. Candidates are in the engine's own order.
    fn recognize(&mut self, bitmap: &GlyphBitmap) -> Result<Vec<Candidate>>;
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&mut self, bitmap: &GlyphBitmap) -> Result<Vec<Candidate>> {
        (**self).recognize(bitmap)
    }
}
