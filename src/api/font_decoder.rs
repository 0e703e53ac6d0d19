//! Decoding session over a rotating obfuscation font.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::cache::MappingCache;
use crate::config::ResolverConfig;
use crate::decoder::TextDecoder;
use crate::error::{Error, Result};
use crate::fonts::TrueTypeFont;
use crate::locator::local_locator;
use crate::mapping::{FontCacheRecord, FontIdentity, FontMapping, ResolutionMethod};
use crate::ocr::EngineFactory;
use crate::rendering::{refresh_glyph_images, GlyphRenderOptions, GlyphRenderer, ImageCheckReport};
use crate::resolver::{FontResolver, ResolutionReport};

/// What [`FontDecoder::update_from_bytes`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same font as the active one; nothing changed
    Unchanged,
    /// Mapping taken from the cache
    LoadedFromCache,
    /// Mapping resolved from the font and saved
    Resolved(ResolutionReport),
}

struct ActiveFont {
    identity: FontIdentity,
    mapping: FontMapping,
    decoder: TextDecoder,
}

impl ActiveFont {
    fn new(identity: FontIdentity, mapping: FontMapping) -> Self {
        let decoder = TextDecoder::new(&mapping);
        Self {
            identity,
            mapping,
            decoder,
        }
    }
}

/// Keeps the mapping for the font currently in use and decodes with it.
///
/// Fonts are identified by content, so a page that keeps serving the same
/// font costs one hash per update. A new font is looked up in the cache
/// first and only resolved when the cache has nothing for it.
pub struct FontDecoder {
    resolver: FontResolver,
    cache: MappingCache,
    overrides: BTreeMap<String, String>,
    active: Option<ActiveFont>,
}

impl FontDecoder {
    /// Open a session with its cache in `cache_dir`, restoring the most
    /// recently used mapping if there is one.
    pub fn new(config: ResolverConfig, cache_dir: impl Into<PathBuf>) -> Self {
        let cache = MappingCache::open(cache_dir);
        let active = cache.load_current().map(|record| {
            log::info!(
                "Restored mapping for font {} ({} entries)",
                record.font_identity,
                record.mapping.len()
            );
            ActiveFont::new(record.font_identity, record.mapping)
        });
        Self {
            resolver: FontResolver::new(config),
            cache,
            overrides: BTreeMap::new(),
            active,
        }
    }

    /// Reviewer overrides (source char -> real string) applied to fonts
    /// resolved from now on.
    pub fn set_overrides(&mut self, overrides: BTreeMap<String, String>) {
        self.overrides = overrides;
    }

    /// Switch to the font in `font_data`.
    ///
    /// If the cache save fails the new mapping is still active and the error
    /// is returned.
    pub fn update_from_bytes(
        &mut self,
        font_data: &[u8],
        source_locator: &str,
        factory: &dyn EngineFactory,
    ) -> Result<UpdateOutcome> {
        let identity = FontIdentity::from_font_data(font_data);

        if self.identity() == Some(&identity) {
            log::debug!("Font {} unchanged", identity);
            return Ok(UpdateOutcome::Unchanged);
        }

        if let Some(record) = self.cache.load(&identity) {
            log::info!("Using cached mapping for font {}", identity);
            if let Err(e) = self.cache.mark_current(&record) {
                log::warn!("Could not mark font {} as current: {}", identity, e);
            }
            self.active = Some(ActiveFont::new(identity, record.mapping));
            return Ok(UpdateOutcome::LoadedFromCache);
        }

        let overrides = self.overrides.clone();
        let report = self.resolve_and_save(font_data, source_locator, &overrides, factory)?;
        Ok(UpdateOutcome::Resolved(report))
    }

    /// Resolve `font_data` again even if the cache has a mapping for it, and
    /// replace the cached record.
    ///
    /// Manual-review entries of the cached record are kept; session
    /// overrides win over them.
    pub fn regenerate(
        &mut self,
        font_data: &[u8],
        source_locator: &str,
        factory: &dyn EngineFactory,
    ) -> Result<ResolutionReport> {
        let identity = FontIdentity::from_font_data(font_data);
        let mut overrides: BTreeMap<String, String> = self
            .cache
            .load(&identity)
            .map(|record| {
                record
                    .mapping
                    .iter()
                    .filter(|e| e.method == ResolutionMethod::ManualReview)
                    .map(|e| (e.source.to_string(), e.resolved.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if !overrides.is_empty() {
            log::info!("Keeping {} reviewed entries for font {}", overrides.len(), identity);
        }
        overrides.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        log::info!("Regenerating mapping for font {}", identity);
        self.resolve_and_save(font_data, source_locator, &overrides, factory)
    }

    fn resolve_and_save(
        &mut self,
        font_data: &[u8],
        source_locator: &str,
        overrides: &BTreeMap<String, String>,
        factory: &dyn EngineFactory,
    ) -> Result<ResolutionReport> {
        let resolution = self.resolver.resolve_with_overrides(font_data, overrides, factory)?;
        let record = FontCacheRecord::new(resolution.identity.clone(), resolution.mapping.clone(), source_locator);
        self.active = Some(ActiveFont::new(resolution.identity, resolution.mapping));
        self.cache.save(&record)?;
        Ok(resolution.report)
    }

    /// Switch to the font stored at `path`.
    pub fn update_from_path(&mut self, path: impl AsRef<Path>, factory: &dyn EngineFactory) -> Result<UpdateOutcome> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.update_from_bytes(&data, &local_locator(&name), factory)
    }

    /// Identity of the active font.
    pub fn identity(&self) -> Option<&FontIdentity> {
        self.active.as_ref().map(|a| &a.identity)
    }

    /// Mapping of the active font.
    pub fn mapping(&self) -> Option<&FontMapping> {
        self.active.as_ref().map(|a| &a.mapping)
    }

    /// The underlying cache.
    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    /// Decode a string. Without an active font the text is returned as is.
    pub fn decode_text(&self, text: &str) -> String {
        match &self.active {
            Some(active) => active.decoder.decode_str(text),
            None => text.to_string(),
        }
    }

    /// Decode every string in a JSON value.
    pub fn decode_value(&self, value: &Value) -> Value {
        match &self.active {
            Some(active) => active.decoder.decode_value(value),
            None => value.clone(),
        }
    }

    /// Render a review image for every source character of the active
    /// mapping, replacing what the image directory holds for them.
    ///
    /// `font_data` must be the active font.
    pub fn ensure_review_images(&self, font_data: &[u8]) -> Result<ImageCheckReport> {
        let Some(active) = &self.active else {
            return Ok(ImageCheckReport::default());
        };
        let identity = FontIdentity::from_font_data(font_data);
        if identity != active.identity {
            return Err(Error::FontMismatch {
                expected: active.identity.to_string(),
                actual: identity.to_string(),
            });
        }
        let font = TrueTypeFont::parse(font_data)?;
        let config = self.resolver.config();
        let renderer = GlyphRenderer::new(GlyphRenderOptions::from(config));
        refresh_glyph_images(&font, active.mapping.iter().map(|e| e.source), &config.image_dir, &renderer)
    }
}
