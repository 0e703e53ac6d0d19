//! Confidence-gated recognition cascade.
//!
//! Stages run in order on the same bitmap until one accepts:
//!
//! | Stage     | Method                | Min confidence | Candidate used      |
//! |-----------|-----------------------|----------------|---------------------|
//! | primary   | `RecognitionPrimary`  | 0.7            | first               |
//! | fallbacks | `RecognitionFallback` | 0.5            | highest confidence  |
//!
//! A candidate must also reduce to exactly one letter, digit or CJK
//! ideograph and must not be pure punctuation. Engine errors count as
//! rejection. When every stage rejects, the outcome is `Unresolved`.

use crate::config::{ResolverConfig, FALLBACK_MIN_CONFIDENCE, PRIMARY_MIN_CONFIDENCE};
use crate::mapping::ResolutionMethod;
use crate::rendering::GlyphBitmap;

use super::filter::single_valid_char;
use super::{Candidate, Recognizer};

/// Which candidate of an engine's result list a stage judges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePick {
    /// The engine's first result
    First,
    /// The result with the highest confidence
    HighestConfidence,
}

impl CandidatePick {
    fn pick(self, candidates: &[Candidate]) -> Option<&Candidate> {
        match self {
            Self::First => candidates.first(),
            Self::HighestConfidence => candidates
                .iter()
                .filter(|c| !c.confidence.is_nan())
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence)),
        }
    }
}

/// Why a stage did or did not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Candidate accepted
    Accepted,
    /// Engine returned nothing
    NoCandidate,
    /// Confidence below the stage threshold
    LowConfidence,
    /// Not exactly one valid character, or only symbols
    InvalidText,
    /// Engine failed on this image
    EngineError,
}

/// Record of one stage's attempt on one bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct StageAttempt {
    /// Engine name
    pub engine: String,
    /// Judged candidate text, if any
    pub text: Option<String>,
    /// Judged candidate confidence (0 when none)
    pub confidence: f32,
    /// Result of the checks
    pub verdict: Verdict,
}

/// Result of running the cascade on one bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    /// The accepted character, `None` when unresolved
    pub resolved: Option<char>,
    /// `RecognitionPrimary`, `RecognitionFallback` or `Unresolved`
    pub method: ResolutionMethod,
    /// Confidence of the accepted candidate
    pub confidence: Option<f32>,
    /// Every stage that ran, in order
    pub attempts: Vec<StageAttempt>,
}

impl CascadeOutcome {
    fn unresolved(attempts: Vec<StageAttempt>) -> Self {
        Self {
            resolved: None,
            method: ResolutionMethod::Unresolved,
            confidence: None,
            attempts,
        }
    }
}

/// One engine with its acceptance rules.
pub struct RecognitionStage {
    recognizer: Box<dyn Recognizer>,
    min_confidence: f32,
    pick: CandidatePick,
    method: ResolutionMethod,
}

impl RecognitionStage {
    /// Primary stage: first candidate, confidence >= max(`min_confidence`, 0.7).
    pub fn primary(recognizer: Box<dyn Recognizer>, min_confidence: f32) -> Self {
        Self {
            recognizer,
            min_confidence: min_confidence.max(PRIMARY_MIN_CONFIDENCE),
            pick: CandidatePick::First,
            method: ResolutionMethod::RecognitionPrimary,
        }
    }

    /// Fallback stage: best candidate, confidence >= max(`min_confidence`, 0.5).
    pub fn fallback(recognizer: Box<dyn Recognizer>, min_confidence: f32) -> Self {
        Self {
            recognizer,
            min_confidence: min_confidence.max(FALLBACK_MIN_CONFIDENCE),
            pick: CandidatePick::HighestConfidence,
            method: ResolutionMethod::RecognitionFallback,
        }
    }

    /// Effective confidence threshold.
    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Method recorded when this stage accepts.
    pub fn method(&self) -> ResolutionMethod {
        self.method
    }

    /// Engine name.
    pub fn engine_name(&self) -> &str {
        self.recognizer.name()
    }

    fn attempt(&mut self, bitmap: &GlyphBitmap) -> (StageAttempt, Option<char>) {
        let engine = self.recognizer.name().to_string();
        let candidates = match self.recognizer.recognize(bitmap) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("[{}] U+{:04X}: {}", engine, bitmap.codepoint, e);
                let attempt = StageAttempt {
                    engine,
                    text: None,
                    confidence: 0.0,
                    verdict: Verdict::EngineError,
                };
                return (attempt, None);
            },
        };

        let Some(candidate) = self.pick.pick(&candidates) else {
            let attempt = StageAttempt {
                engine,
                text: None,
                confidence: 0.0,
                verdict: Verdict::NoCandidate,
            };
            return (attempt, None);
        };

        let accepted = single_valid_char(&candidate.text);
        let verdict = if !(candidate.confidence >= self.min_confidence) {
            Verdict::LowConfidence
        } else if accepted.is_none() {
            Verdict::InvalidText
        } else {
            Verdict::Accepted
        };

        let attempt = StageAttempt {
            engine,
            text: Some(candidate.text.clone()),
            confidence: candidate.confidence,
            verdict,
        };
        let resolved = if verdict == Verdict::Accepted { accepted } else { None };
        (attempt, resolved)
    }
}

/// Ordered chain of recognition stages.
#[derive(Default)]
pub struct RecognitionCascade {
    stages: Vec<RecognitionStage>,
}

impl RecognitionCascade {
    /// A cascade with no engines; everything comes out unresolved.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cascade with `recognizer` as its primary engine at the default bar.
    pub fn with_primary(recognizer: impl Recognizer + 'static) -> Self {
        Self {
            stages: vec![RecognitionStage::primary(Box::new(recognizer), PRIMARY_MIN_CONFIDENCE)],
        }
    }

    /// Append a fallback engine at the default bar.
    ///
    /// On an empty cascade the engine becomes the primary stage.
    pub fn with_fallback(mut self, recognizer: impl Recognizer + 'static) -> Self {
        self.push(Box::new(recognizer), PRIMARY_MIN_CONFIDENCE, FALLBACK_MIN_CONFIDENCE);
        self
    }

    /// Build a cascade from boxed engines, primary first, using the
    /// thresholds of `config`.
    pub fn from_engines(engines: Vec<Box<dyn Recognizer>>, config: &ResolverConfig) -> Self {
        let mut cascade = Self::new();
        for engine in engines {
            cascade.push(engine, config.primary_threshold(), config.fallback_threshold());
        }
        cascade
    }

    fn push(&mut self, recognizer: Box<dyn Recognizer>, primary_min: f32, fallback_min: f32) {
        let stage = if self.stages.is_empty() {
            RecognitionStage::primary(recognizer, primary_min)
        } else {
            RecognitionStage::fallback(recognizer, fallback_min)
        };
        self.stages.push(stage);
    }

    /// Stages in order.
    pub fn stages(&self) -> &[RecognitionStage] {
        &self.stages
    }

    /// Whether the cascade has no engines.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the stages in order until one accepts.
    pub fn recognize(&mut self, bitmap: &GlyphBitmap) -> CascadeOutcome {
        let mut attempts = Vec::with_capacity(self.stages.len());
        for stage in &mut self.stages {
            let (attempt, resolved) = stage.attempt(bitmap);
            log::debug!(
                "[{}] U+{:04X}: {:?} score={:.3} -> {:?}",
                attempt.engine,
                bitmap.codepoint,
                attempt.text,
                attempt.confidence,
                attempt.verdict
            );
            let confidence = attempt.confidence;
            attempts.push(attempt);
            if let Some(c) = resolved {
                return CascadeOutcome {
                    resolved: Some(c),
                    method: stage.method,
                    confidence: Some(confidence),
                    attempts,
                };
            }
        }
        CascadeOutcome::unresolved(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    /// Engine that always answers the same thing.
    struct Fixed {
        name: &'static str,
        answer: Vec<Candidate>,
        calls: usize,
    }

    impl Fixed {
        fn new(name: &'static str, answer: Vec<(&str, f32)>) -> Self {
            Self {
                name,
                answer: answer.into_iter().map(|(t, c)| Candidate::new(t, c)).collect(),
                calls: 0,
            }
        }
    }

    impl Recognizer for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn recognize(&mut self, _bitmap: &GlyphBitmap) -> Result<Vec<Candidate>> {
            self.calls += 1;
            Ok(self.answer.clone())
        }
    }

    struct Failing;

    impl Recognizer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn recognize(&mut self, _bitmap: &GlyphBitmap) -> Result<Vec<Candidate>> {
            Err(Error::recognition("failing", "model crashed"))
        }
    }

    fn bitmap() -> GlyphBitmap {
        GlyphBitmap {
            codepoint: 0xE000,
            width: 2,
            height: 1,
            pixels: vec![0, 255],
        }
    }

    #[test]
    fn test_primary_accepts_confident_single_char() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("赤", 0.85)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.resolved, Some('赤'));
        assert_eq!(outcome.method, ResolutionMethod::RecognitionPrimary);
        assert_eq!(outcome.confidence, Some(0.85));
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[test]
    fn test_primary_threshold_is_inclusive() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("a", 0.7)]));
        assert_eq!(cascade.recognize(&bitmap()).resolved, Some('a'));
    }

    #[test]
    fn test_fallback_rescues_low_primary() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("赤", 0.6)]))
            .with_fallback(Fixed::new("f", vec![("x", 0.2), ("赤", 0.55)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.resolved, Some('赤'));
        assert_eq!(outcome.method, ResolutionMethod::RecognitionFallback);
        assert_eq!(outcome.confidence, Some(0.55));
        assert_eq!(outcome.attempts[0].verdict, Verdict::LowConfidence);
        assert_eq!(outcome.attempts[1].verdict, Verdict::Accepted);
    }

    #[test]
    fn test_both_low_is_unresolved() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("赤", 0.4)]))
            .with_fallback(Fixed::new("f", vec![("赤", 0.3)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.resolved, None);
        assert_eq!(outcome.method, ResolutionMethod::Unresolved);
        assert_eq!(outcome.confidence, None);
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn test_primary_uses_first_candidate_not_best() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("a", 0.3), ("b", 0.99)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.method, ResolutionMethod::Unresolved);
        assert_eq!(outcome.attempts[0].text.as_deref(), Some("a"));
    }

    #[test]
    fn test_multi_char_and_symbols_rejected() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("赤色", 0.95)]))
            .with_fallback(Fixed::new("f", vec![("。", 0.9)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.method, ResolutionMethod::Unresolved);
        assert_eq!(outcome.attempts[0].verdict, Verdict::InvalidText);
        assert_eq!(outcome.attempts[1].verdict, Verdict::InvalidText);
    }

    #[test]
    fn test_punctuation_around_char_is_filtered() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("(中)", 0.9)]));
        assert_eq!(cascade.recognize(&bitmap()).resolved, Some('中'));
    }

    #[test]
    fn test_engine_error_falls_through() {
        let mut cascade =
            RecognitionCascade::with_primary(Failing).with_fallback(Fixed::new("f", vec![("7", 0.5)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.attempts[0].verdict, Verdict::EngineError);
        assert_eq!(outcome.resolved, Some('7'));
        assert_eq!(outcome.method, ResolutionMethod::RecognitionFallback);
    }

    #[test]
    fn test_highest_confidence_ignores_nan() {
        let candidates = vec![
            Candidate::new("a", 0.6),
            Candidate::new("b", f32::NAN),
            Candidate::new("c", 0.9),
            Candidate::new("d", 0.2),
        ];
        assert_eq!(CandidatePick::HighestConfidence.pick(&candidates).unwrap().text, "c");
        assert_eq!(CandidatePick::First.pick(&candidates).unwrap().text, "a");
        assert!(CandidatePick::HighestConfidence.pick(&[Candidate::new("x", f32::NAN)]).is_none());
    }

    #[test]
    fn test_empty_result_and_nan() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![]))
            .with_fallback(Fixed::new("f", vec![("a", f32::NAN)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.attempts[0].verdict, Verdict::NoCandidate);
        assert_eq!(outcome.attempts[1].verdict, Verdict::NoCandidate);
        assert_eq!(outcome.method, ResolutionMethod::Unresolved);
    }

    #[test]
    fn test_empty_cascade_is_unresolved() {
        let mut cascade = RecognitionCascade::new();
        assert!(cascade.is_empty());
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.method, ResolutionMethod::Unresolved);
        assert!(outcome.attempts.is_empty());
    }

    #[test]
    fn test_fallback_not_run_when_primary_accepts() {
        let mut cascade = RecognitionCascade::with_primary(Fixed::new("p", vec![("a", 0.9)]))
            .with_fallback(Fixed::new("f", vec![("b", 0.9)]));
        let outcome = cascade.recognize(&bitmap());
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.resolved, Some('a'));
    }

    #[test]
    fn test_thresholds_cannot_be_lowered() {
        let config = ResolverConfig::new().with_thresholds(0.1, 0.1);
        let engines: Vec<Box<dyn Recognizer>> = vec![
            Box::new(Fixed::new("p", vec![("a", 0.6)])),
            Box::new(Fixed::new("f", vec![("a", 0.45)])),
        ];
        let mut cascade = RecognitionCascade::from_engines(engines, &config);
        assert_eq!(cascade.stages()[0].min_confidence(), 0.7);
        assert_eq!(cascade.stages()[1].min_confidence(), 0.5);
        assert_eq!(cascade.stages()[1].method(), ResolutionMethod::RecognitionFallback);
        assert_eq!(cascade.recognize(&bitmap()).method, ResolutionMethod::Unresolved);
    }

    #[test]
    fn test_fallback_on_empty_cascade_becomes_primary() {
        let cascade = RecognitionCascade::new().with_fallback(Fixed::new("only", vec![]));
        assert_eq!(cascade.stages()[0].method(), ResolutionMethod::RecognitionPrimary);
        assert_eq!(cascade.stages()[0].engine_name(), "only");
    }
}
