//! On-disk mapping cache keyed by font identity.
//!
//! Layout under the cache directory:
//!
//! ```text
//! font_mapping_cache.json          record of the font last in use
//! records/<identity>.json          full record per font
//! mappings/<identity>_mapping.json plain char -> string mapping per font
//! ```
//!
//! The plain mapping files are shared with the manual review service, which
//! may rewrite them between runs. [`MappingCache::load`] overlays such edits
//! on the stored record. Nothing here merges concurrent writers; the last
//! write wins.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::mapping::{FontCacheRecord, FontIdentity, FontMapping, MappingEntry};

/// File holding the record of the font last in use.
pub const CURRENT_RECORD_FILE: &str = "font_mapping_cache.json";

const RECORDS_DIR: &str = "records";
const MAPPINGS_DIR: &str = "mappings";

/// On-disk form of a [`FontCacheRecord`].
#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    last_used_font: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_identity: Option<FontIdentity>,
    mapping: BTreeMap<String, String>,
    timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<MappingEntry>>,
}

impl RecordFile {
    fn from_record(record: &FontCacheRecord) -> Self {
        Self {
            last_used_font: record.source_locator.clone(),
            font_identity: Some(record.font_identity.clone()),
            mapping: record.mapping.to_plain(),
            timestamp: record.last_updated,
            entries: Some(record.mapping.iter().cloned().collect()),
        }
    }

    fn into_record(self, identity: FontIdentity) -> FontCacheRecord {
        let mapping = match self.entries {
            Some(entries) => {
                let checked: Vec<MappingEntry> = entries.iter().cloned().map(MappingEntry::validated).collect();
                let demoted = entries.iter().zip(&checked).filter(|(a, b)| a != b).count();
                if demoted > 0 {
                    log::warn!("Record {}: {} stored entries failed validation", identity, demoted);
                }
                FontMapping::from(checked)
            },
            None => FontMapping::from_plain(&self.mapping),
        };
        FontCacheRecord {
            font_identity: identity,
            mapping,
            source_locator: self.last_used_font,
            last_updated: self.timestamp,
        }
    }
}

/// Persistent store of resolved mappings.
#[derive(Debug)]
pub struct MappingCache {
    dir: PathBuf,
    /// Identity of the current record; held for the whole of a write
    current: Mutex<Option<FontIdentity>>,
}

impl MappingCache {
    /// Open the cache rooted at `dir`.
    ///
    /// The directory need not exist yet. An unreadable current record only
    /// means there is no current identity.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let current = match read_record_file(&dir.join(CURRENT_RECORD_FILE)) {
            Ok(Some(file)) => file.font_identity,
            Ok(None) => None,
            Err(e) => {
                log::warn!("Ignoring unreadable cache record: {}", e);
                None
            },
        };
        if let Some(id) = &current {
            log::debug!("Mapping cache at {}: last font {}", dir.display(), id);
        }
        Self {
            dir,
            current: Mutex::new(current),
        }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Identity of the font most recently saved or marked current.
    pub fn current_identity(&self) -> Option<FontIdentity> {
        self.current.lock().clone()
    }

    /// Path of the full record for `identity`.
    pub fn record_path(&self, identity: &FontIdentity) -> PathBuf {
        self.dir.join(RECORDS_DIR).join(format!("{}.json", identity))
    }

    /// Path of the plain mapping file for `identity`.
    pub fn mapping_path(&self, identity: &FontIdentity) -> PathBuf {
        self.dir.join(MAPPINGS_DIR).join(format!("{}_mapping.json", identity))
    }

    /// Load the record for `identity`.
    ///
    /// Returns `None` when nothing usable is stored. Corrupt or unreadable
    /// files are logged and treated as absent. An externally edited mapping
    /// file is overlaid; changed entries become `ManualReview`. With no
    /// record but a mapping file, the record is rebuilt from the mapping file
    /// alone.
    pub fn load(&self, identity: &FontIdentity) -> Option<FontCacheRecord> {
        if !identity.is_file_safe() {
            log::warn!("Refusing to load cache for unsafe identity {:?}", identity.as_str());
            return None;
        }

        let record = match read_record_file(&self.record_path(identity)) {
            Ok(file) => file.map(|f| f.into_record(identity.clone())),
            Err(e) => {
                log::warn!("Ignoring cache record for {}: {}", identity, e);
                None
            },
        };

        let plain = match read_plain_mapping(&self.mapping_path(identity)) {
            Ok(plain) => plain,
            Err(e) => {
                log::warn!("Ignoring mapping file for {}: {}", identity, e);
                None
            },
        };

        match (record, plain) {
            (Some(mut record), Some(plain)) => {
                let changed = record.mapping.apply_overrides(&plain);
                if changed > 0 {
                    log::info!("Applied {} reviewed entries from {}", changed, identity);
                }
                Some(record)
            },
            (Some(record), None) => Some(record),
            (None, Some(plain)) => {
                log::info!("Rebuilding cache record for {} from its mapping file", identity);
                Some(FontCacheRecord::new(identity.clone(), FontMapping::from_plain(&plain), String::new()))
            },
            (None, None) => None,
        }
    }

    /// Load the most recently saved record.
    pub fn load_current(&self) -> Option<FontCacheRecord> {
        self.current_identity().and_then(|id| self.load(&id))
    }

    /// Persist `record` and make it current.
    ///
    /// Each file is written to a temporary file and renamed into place.
    /// Saves are serialized. On failure nothing the caller holds is touched.
    pub fn save(&self, record: &FontCacheRecord) -> Result<()> {
        let identity = &record.font_identity;
        if !identity.is_file_safe() {
            return Err(Error::cache_io(&self.dir, format!("unsafe font identity {:?}", identity.as_str())));
        }

        let mut current = self.current.lock();

        let file = RecordFile::from_record(record);
        let record_json = serde_json::to_string_pretty(&file)?;
        let mapping_json = serde_json::to_string_pretty(&file.mapping)?;

        write_atomic(&self.record_path(identity), record_json.as_bytes())?;
        write_atomic(&self.mapping_path(identity), mapping_json.as_bytes())?;
        write_atomic(&self.dir.join(CURRENT_RECORD_FILE), record_json.as_bytes())?;

        log::info!(
            "Saved mapping for font {} ({} entries, {} unresolved)",
            identity,
            record.mapping.len(),
            record.mapping.unresolved_count()
        );
        *current = Some(identity.clone());
        Ok(())
    }

    /// Make an already stored `record` current without rewriting its
    /// per-font files.
    ///
    /// Used when a cached mapping is activated, so a restart restores the
    /// font that was last in use rather than the one last resolved.
    pub fn mark_current(&self, record: &FontCacheRecord) -> Result<()> {
        let identity = &record.font_identity;
        if !identity.is_file_safe() {
            return Err(Error::cache_io(&self.dir, format!("unsafe font identity {:?}", identity.as_str())));
        }

        let mut current = self.current.lock();
        if current.as_ref() == Some(identity) {
            return Ok(());
        }

        let record_json = serde_json::to_string_pretty(&RecordFile::from_record(record))?;
        write_atomic(&self.dir.join(CURRENT_RECORD_FILE), record_json.as_bytes())?;

        log::debug!("Font {} is now current", identity);
        *current = Some(identity.clone());
        Ok(())
    }
}

fn read_record_file(path: &Path) -> Result<Option<RecordFile>> {
    let Some(text) = read_optional(path)? else {
        return Ok(None);
    };
    let file = serde_json::from_str(&text).map_err(|e| Error::cache_io(path, e))?;
    Ok(Some(file))
}

fn read_plain_mapping(path: &Path) -> Result<Option<BTreeMap<String, String>>> {
    let Some(text) = read_optional(path)? else {
        return Ok(None);
    };
    let plain = serde_json::from_str(&text).map_err(|e| Error::cache_io(path, e))?;
    Ok(Some(plain))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::cache_io(path, e)),
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| Error::cache_io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::cache_io(path, e))?;
    tmp.write_all(contents).map_err(|e| Error::cache_io(path, e))?;
    tmp.flush().map_err(|e| Error::cache_io(path, e))?;
    tmp.persist(path).map_err(|e| Error::cache_io(path, e.error))?;
    Ok(())
}
