//! Font mapping data model.
//!
//! A [`FontMapping`] holds one [`MappingEntry`] per codepoint of a font's
//! character map, ordered by ascending source codepoint. Each entry records
//! the real character it resolved to and how that resolution was made.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::config::{FALLBACK_MIN_CONFIDENCE, PRIMARY_MIN_CONFIDENCE};

/// How a mapping entry's real character was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionMethod {
    /// Decoded from a `uniXXXX` / `uXXXX` glyph name
    NamingHeuristic,
    /// Accepted from the primary recognition engine
    RecognitionPrimary,
    /// Accepted from a fallback recognition engine
    RecognitionFallback,
    /// Supplied or corrected by a human reviewer
    ManualReview,
    /// Nothing trustworthy found; pending manual review
    Unresolved,
}

impl ResolutionMethod {
    /// Whether this method came out of the recognition cascade.
    pub fn is_recognition(self) -> bool {
        matches!(self, Self::RecognitionPrimary | Self::RecognitionFallback)
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NamingHeuristic => "NamingHeuristic",
            Self::RecognitionPrimary => "RecognitionPrimary",
            Self::RecognitionFallback => "RecognitionFallback",
            Self::ManualReview => "ManualReview",
            Self::Unresolved => "Unresolved",
        };
        f.write_str(name)
    }
}

/// One obfuscated codepoint and what it really means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Obfuscated character as it appears in raw text
    pub source: char,
    /// Glyph name from the font
    #[serde(default)]
    pub glyph_name: String,
    /// Glyph index from the font
    #[serde(default)]
    pub glyph_index: u16,
    /// Real character; empty only when unresolved
    pub resolved: String,
    /// How `resolved` was obtained
    pub method: ResolutionMethod,
    /// Engine confidence, only for recognition results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl MappingEntry {
    /// Create an unresolved entry.
    pub fn unresolved(source: char, glyph_name: impl Into<String>, glyph_index: u16) -> Self {
        Self {
            source,
            glyph_name: glyph_name.into(),
            glyph_index,
            resolved: String::new(),
            method: ResolutionMethod::Unresolved,
            confidence: None,
        }
    }

    /// Mark this entry resolved. An empty `resolved` string leaves it unresolved.
    pub fn resolve(
        mut self,
        resolved: impl Into<String>,
        method: ResolutionMethod,
        confidence: Option<f32>,
    ) -> Self {
        let resolved = resolved.into();
        if resolved.is_empty() || method == ResolutionMethod::Unresolved {
            self.resolved.clear();
            self.method = ResolutionMethod::Unresolved;
            self.confidence = None;
        } else {
            self.resolved = resolved;
            self.method = method;
            self.confidence = if method.is_recognition() { confidence } else { None };
        }
        self
    }

    /// Re-check an entry that came from outside the resolver.
    ///
    /// Recognition results without a confidence at or above their method's
    /// floor become `Unresolved`, as does anything with an empty `resolved`.
    /// Confidence is dropped from non-recognition methods.
    pub fn validated(mut self) -> Self {
        let floor = match self.method {
            ResolutionMethod::RecognitionPrimary => Some(PRIMARY_MIN_CONFIDENCE),
            ResolutionMethod::RecognitionFallback => Some(FALLBACK_MIN_CONFIDENCE),
            _ => None,
        };
        if let Some(floor) = floor {
            if !self.confidence.is_some_and(|c| c >= floor) {
                return Self::unresolved(self.source, self.glyph_name, self.glyph_index);
            }
        }
        let resolved = std::mem::take(&mut self.resolved);
        let (method, confidence) = (self.method, self.confidence);
        self.resolve(resolved, method, confidence)
    }

    /// Source codepoint as a number.
    pub fn codepoint(&self) -> u32 {
        self.source as u32
    }

    /// Whether a real character is known.
    pub fn is_resolved(&self) -> bool {
        self.method != ResolutionMethod::Unresolved
    }
}

/// Ordered collection of mapping entries, one per source codepoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MappingEntry>", into = "Vec<MappingEntry>")]
pub struct FontMapping {
    entries: BTreeMap<char, MappingEntry>,
}

impl FontMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing and returning any entry for the same source.
    pub fn insert(&mut self, entry: MappingEntry) -> Option<MappingEntry> {
        self.entries.insert(entry.source, entry)
    }

    /// Look up the entry for `source`.
    pub fn get(&self, source: char) -> Option<&MappingEntry> {
        self.entries.get(&source)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending codepoint order.
    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.values()
    }

    /// Entries still waiting for a real character.
    pub fn unresolved(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.values().filter(|e| !e.is_resolved())
    }

    /// Number of resolved entries.
    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_resolved()).count()
    }

    /// Number of unresolved entries.
    pub fn unresolved_count(&self) -> usize {
        self.len() - self.resolved_count()
    }

    /// Number of entries resolved by `method`.
    pub fn count_by_method(&self, method: ResolutionMethod) -> usize {
        self.entries.values().filter(|e| e.method == method).count()
    }

    /// Character substitution table of all resolved entries.
    pub fn substitution_table(&self) -> HashMap<char, String> {
        self.entries
            .values()
            .filter(|e| e.is_resolved())
            .map(|e| (e.source, e.resolved.clone()))
            .collect()
    }

    /// Plain mapping-file form: every source character to its resolved string
    /// (empty when unresolved), keys in ascending codepoint order.
    ///
    /// UTF-8 byte order of single-character strings equals codepoint order, so
    /// the `BTreeMap` iterates canonically.
    pub fn to_plain(&self) -> BTreeMap<String, String> {
        self.entries
            .values()
            .map(|e| (e.source.to_string(), e.resolved.clone()))
            .collect()
    }

    /// Build a mapping from a plain mapping file with no font at hand.
    ///
    /// Non-empty values become `ManualReview` entries, empty values
    /// `Unresolved`. Keys that are not exactly one character are skipped.
    pub fn from_plain(plain: &BTreeMap<String, String>) -> Self {
        let mut mapping = Self::new();
        for (key, value) in plain {
            let Some(source) = single_char(key) else {
                log::warn!("Skipping mapping key {:?}: not a single character", key);
                continue;
            };
            let entry = MappingEntry::unresolved(source, String::new(), 0).resolve(
                value.clone(),
                ResolutionMethod::ManualReview,
                None,
            );
            mapping.insert(entry);
        }
        mapping
    }

    /// Merge a plain char -> string mapping on top of this one.
    ///
    /// Only sources already present are touched. A different non-empty value
    /// becomes `ManualReview`; an empty value marks the entry `Unresolved`.
    /// Returns the number of entries changed.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) -> usize {
        let mut changed = 0;
        for (key, value) in overrides {
            let Some(source) = single_char(key) else {
                continue;
            };
            let Some(entry) = self.entries.get_mut(&source) else {
                log::debug!("Override for U+{:04X} has no cmap entry, ignored", source as u32);
                continue;
            };
            if entry.resolved == *value {
                continue;
            }
            *entry = entry.clone().resolve(value.clone(), ResolutionMethod::ManualReview, None);
            changed += 1;
        }
        changed
    }
}

impl From<Vec<MappingEntry>> for FontMapping {
    fn from(entries: Vec<MappingEntry>) -> Self {
        let mut mapping = Self::new();
        for entry in entries {
            mapping.insert(entry);
        }
        mapping
    }
}

impl From<FontMapping> for Vec<MappingEntry> {
    fn from(mapping: FontMapping) -> Self {
        mapping.entries.into_values().collect()
    }
}

impl FromIterator<MappingEntry> for FontMapping {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Stable content-derived font identity: the first 16 hex digits of the MD5
/// digest of the font binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontIdentity(String);

impl FontIdentity {
    /// Derive the identity of a font binary.
    pub fn from_font_data(data: &[u8]) -> Self {
        let digest = Md5::digest(data);
        let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    /// Wrap an identity string read from disk.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity is safe to use as a file name stem.
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl fmt::Display for FontIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted mapping for one font identity.
#[derive(Debug, Clone, PartialEq)]
pub struct FontCacheRecord {
    /// Content-derived font identity
    pub font_identity: FontIdentity,
    /// The resolved mapping
    pub mapping: FontMapping,
    /// URL or local path the font was obtained from
    pub source_locator: String,
    /// Unix timestamp (seconds) of the last update
    pub last_updated: f64,
}

impl FontCacheRecord {
    /// Create a record stamped with the current time.
    pub fn new(font_identity: FontIdentity, mapping: FontMapping, source_locator: impl Into<String>) -> Self {
        Self {
            font_identity,
            mapping,
            source_locator: source_locator.into(),
            last_updated: now_timestamp(),
        }
    }
}

/// Current Unix time in fractional seconds.
pub(crate) fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
