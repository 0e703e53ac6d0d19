//! Mapping resolution pipeline.
//!
//! For every entry of the font's character map, the first of these that
//! produces a character wins:
//!
//! 1. a reviewer-supplied override (`ManualReview`)
//! 2. the glyph name (`NamingHeuristic`)
//! 3. render + recognition cascade (`RecognitionPrimary` / `RecognitionFallback`)
//!
//! Whatever is left is `Unresolved`. A batch always runs to completion;
//! per-glyph failures only show up in the [`ResolutionReport`].

use std::collections::BTreeMap;
use std::fmt;

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::fonts::{glyph_name_to_char, TrueTypeFont};
use crate::mapping::{FontIdentity, FontMapping, MappingEntry, ResolutionMethod};
use crate::ocr::{EngineFactory, JobOutcome, RecognitionCascade, RecognitionPool};
use crate::rendering::GlyphRenderOptions;

/// Counts from one resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Character map entries
    pub total: usize,
    /// Resolved from glyph names
    pub naming: usize,
    /// Accepted from the primary engine
    pub primary: usize,
    /// Accepted from a fallback engine
    pub fallback: usize,
    /// Taken from overrides
    pub manual: usize,
    /// Left for manual review
    pub unresolved: usize,
    /// Glyphs that could not be rendered
    pub render_failures: usize,
}

impl ResolutionReport {
    fn from_mapping(mapping: &FontMapping, render_failures: usize) -> Self {
        Self {
            total: mapping.len(),
            naming: mapping.count_by_method(ResolutionMethod::NamingHeuristic),
            primary: mapping.count_by_method(ResolutionMethod::RecognitionPrimary),
            fallback: mapping.count_by_method(ResolutionMethod::RecognitionFallback),
            manual: mapping.count_by_method(ResolutionMethod::ManualReview),
            unresolved: mapping.unresolved_count(),
            render_failures,
        }
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} glyphs: {} by name, {} primary, {} fallback, {} manual, {} unresolved ({} render failures)",
            self.total, self.naming, self.primary, self.fallback, self.manual, self.unresolved, self.render_failures
        )
    }
}

/// A resolved font.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Identity of the font binary
    pub identity: FontIdentity,
    /// One entry per character map codepoint
    pub mapping: FontMapping,
    /// Counts
    pub report: ResolutionReport,
}

/// Turns font binaries into mappings.
#[derive(Debug, Clone, Default)]
pub struct FontResolver {
    config: ResolverConfig,
}

impl FontResolver {
    /// Create a resolver.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every character map entry of `font_data`.
    pub fn resolve(&self, font_data: &[u8], factory: &dyn EngineFactory) -> Result<Resolution> {
        self.resolve_with_overrides(font_data, &BTreeMap::new(), factory)
    }

    /// Resolve using glyph names only. Everything else stays unresolved,
    /// though images are still rendered for review when enabled.
    pub fn resolve_naming_only(&self, font_data: &[u8]) -> Result<Resolution> {
        let no_engines = |_worker: usize| -> Result<RecognitionCascade> { Ok(RecognitionCascade::new()) };
        if self.config.write_images {
            self.resolve_inner(font_data, &BTreeMap::new(), Some(&no_engines as &dyn EngineFactory))
        } else {
            self.resolve_inner(font_data, &BTreeMap::new(), None)
        }
    }

    /// Resolve with reviewer overrides (source char -> real string) taking
    /// priority over everything else. Empty override values are ignored.
    pub fn resolve_with_overrides(
        &self,
        font_data: &[u8],
        overrides: &BTreeMap<String, String>,
        factory: &dyn EngineFactory,
    ) -> Result<Resolution> {
        self.resolve_inner(font_data, overrides, Some(factory))
    }

    /// Without a factory, glyphs not resolved by override or name are left
    /// unresolved and never rendered.
    fn resolve_inner(
        &self,
        font_data: &[u8],
        overrides: &BTreeMap<String, String>,
        factory: Option<&dyn EngineFactory>,
    ) -> Result<Resolution> {
        self.config.validate()?;

        let font = TrueTypeFont::parse(font_data)?;
        let identity = FontIdentity::from_font_data(font_data);
        log::info!(
            "Resolving font {} ({}, {} cmap entries)",
            identity,
            font.family_name().unwrap_or_else(|| "Unknown".to_string()),
            font.entries().len()
        );

        let mut mapping = FontMapping::new();
        let mut pending = Vec::new();

        for cmap in font.entries() {
            let Some(source) = cmap.source_char() else {
                log::warn!("Skipping cmap codepoint {:#X}: not a Unicode scalar value", cmap.codepoint);
                continue;
            };
            let entry = MappingEntry::unresolved(source, cmap.glyph_name.clone(), cmap.glyph_index);

            let entry = if let Some(real) = overrides.get(&source.to_string()).filter(|v| !v.is_empty()) {
                entry.resolve(real.clone(), ResolutionMethod::ManualReview, None)
            } else if let Some(real) = glyph_name_to_char(&cmap.glyph_name) {
                log::debug!("U+{:04X} {} -> {} by name", cmap.codepoint, cmap.glyph_name, real);
                entry.resolve(real.to_string(), ResolutionMethod::NamingHeuristic, None)
            } else {
                pending.push(cmap.codepoint);
                entry
            };
            mapping.insert(entry);
        }

        let render_failures = match factory {
            Some(factory) => self.recognize_pending(font_data, &pending, &mut mapping, factory),
            None => {
                log::debug!("Leaving {} glyphs for review without rendering", pending.len());
                0
            },
        };

        let report = ResolutionReport::from_mapping(&mapping, render_failures);
        log::info!("Font {}: {}", identity, report);

        Ok(Resolution {
            identity,
            mapping,
            report,
        })
    }

    /// Run the pool over `pending` and write results into `mapping`.
    /// Returns the number of render failures.
    fn recognize_pending(
        &self,
        font_data: &[u8],
        pending: &[u32],
        mapping: &mut FontMapping,
        factory: &dyn EngineFactory,
    ) -> usize {
        if pending.is_empty() {
            return 0;
        }

        let mut pool = RecognitionPool::new(self.config.workers, GlyphRenderOptions::from(&self.config));
        if self.config.write_images {
            pool = pool.with_image_dir(&self.config.image_dir);
        }
        let outcomes = pool.run(font_data, pending, factory);

        let mut render_failures = 0;
        for &codepoint in pending {
            let Some(source) = char::from_u32(codepoint) else {
                continue;
            };
            let Some(entry) = mapping.get(source).cloned() else {
                continue;
            };
            let resolved = match outcomes.get(&codepoint) {
                Some(JobOutcome::Recognized(outcome)) => match outcome.resolved {
                    Some(c) => entry.resolve(c.to_string(), outcome.method, outcome.confidence),
                    None => entry,
                },
                Some(JobOutcome::RenderFailed(_)) => {
                    render_failures += 1;
                    entry
                },
                Some(JobOutcome::Skipped) => entry,
                None => {
                    log::warn!("U+{:04X} was not processed by any worker", codepoint);
                    entry
                },
            };
            mapping.insert(resolved);
        }
        render_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut mapping = FontMapping::new();
        let e = |c: char| MappingEntry::unresolved(c, "g", 1);
        mapping.insert(e('a').resolve("中", ResolutionMethod::NamingHeuristic, None));
        mapping.insert(e('b').resolve("赤", ResolutionMethod::RecognitionPrimary, Some(0.9)));
        mapping.insert(e('c').resolve("1", ResolutionMethod::RecognitionFallback, Some(0.6)));
        mapping.insert(e('d').resolve("x", ResolutionMethod::ManualReview, None));
        mapping.insert(e('e'));

        let report = ResolutionReport::from_mapping(&mapping, 1);
        assert_eq!(
            report,
            ResolutionReport {
                total: 5,
                naming: 1,
                primary: 1,
                fallback: 1,
                manual: 1,
                unresolved: 1,
                render_failures: 1,
            }
        );
        assert!(report.to_string().starts_with("5 glyphs"));
    }

    #[test]
    fn test_invalid_font_is_fatal() {
        let resolver = FontResolver::default();
        assert!(resolver.resolve_naming_only(b"not a font").is_err());
        assert!(resolver.resolve_naming_only(&[]).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let resolver = FontResolver::new(ResolverConfig::new().with_workers(0));
        assert!(matches!(
            resolver.resolve_naming_only(b"x"),
            Err(crate::error::Error::InvalidConfig(_))
        ));
    }
}
