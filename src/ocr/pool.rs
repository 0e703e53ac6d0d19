//! Bounded worker pool for render + recognize.
//!
//! Workers pull codepoints from a shared cursor. Each one parses its own
//! view of the font bytes and builds its own cascade through an
//! [`EngineFactory`], so engines are never shared between threads. Results
//! land in a `BTreeMap` keyed by codepoint; completion order never shows in
//! the output.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::cascade::{CascadeOutcome, RecognitionCascade};
use crate::error::Result;
use crate::fonts::TrueTypeFont;
use crate::rendering::{GlyphRenderOptions, GlyphRenderer};

/// Builds the recognition engines for one worker.
pub trait EngineFactory: Sync {
    /// Build a fresh cascade for worker number `worker`.
    fn build(&self, worker: usize) -> Result<RecognitionCascade>;
}

impl<F> EngineFactory for F
where
    F: Fn(usize) -> Result<RecognitionCascade> + Sync,
{
    fn build(&self, worker: usize) -> Result<RecognitionCascade> {
        self(worker)
    }
}

/// What happened to one codepoint.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Rendered and passed through the cascade
    Recognized(CascadeOutcome),
    /// The glyph could not be rendered
    RenderFailed(String),
    /// Nothing to do: no engines and no image output
    Skipped,
}

/// Runs render + cascade over many codepoints.
#[derive(Debug, Clone)]
pub struct RecognitionPool {
    workers: usize,
    render_options: GlyphRenderOptions,
    image_dir: Option<PathBuf>,
}

impl RecognitionPool {
    /// Create a pool with `workers` threads (at least one).
    pub fn new(workers: usize, render_options: GlyphRenderOptions) -> Self {
        Self {
            workers: workers.max(1),
            render_options,
            image_dir: None,
        }
    }

    /// Also write each rendered bitmap as a PNG into `dir`.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Render and recognize every codepoint in `codepoints`.
    ///
    /// Codepoints that no worker got to (every worker failed to start) are
    /// missing from the result; callers treat them as unresolved.
    pub fn run(&self, font_data: &[u8], codepoints: &[u32], factory: &dyn EngineFactory) -> BTreeMap<u32, JobOutcome> {
        if codepoints.is_empty() {
            return BTreeMap::new();
        }

        if let Some(dir) = &self.image_dir {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("Cannot create image directory {}: {}", dir.display(), e);
            }
        }

        let workers = self.workers.min(codepoints.len());
        let cursor = AtomicUsize::new(0);
        let results = Mutex::new(BTreeMap::new());

        log::info!("Recognizing {} glyphs with {} workers", codepoints.len(), workers);

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let cursor = &cursor;
                let results = &results;
                scope.spawn(move || self.work(worker, font_data, codepoints, factory, cursor, results));
            }
        });

        results.into_inner()
    }

    fn work(
        &self,
        worker: usize,
        font_data: &[u8],
        codepoints: &[u32],
        factory: &dyn EngineFactory,
        cursor: &AtomicUsize,
        results: &Mutex<BTreeMap<u32, JobOutcome>>,
    ) {
        let font = match TrueTypeFont::parse(font_data) {
            Ok(font) => font,
            Err(e) => {
                log::warn!("Worker {}: cannot parse font: {}", worker, e);
                return;
            },
        };
        let mut cascade = match factory.build(worker) {
            Ok(cascade) => cascade,
            Err(e) => {
                log::warn!("Worker {}: engine initialization failed: {}", worker, e);
                return;
            },
        };
        if cascade.is_empty() && self.image_dir.is_none() {
            log::debug!("Worker {}: no engines and no image output, skipping", worker);
            while let Some(&codepoint) = codepoints.get(cursor.fetch_add(1, Ordering::Relaxed)) {
                results.lock().insert(codepoint, JobOutcome::Skipped);
            }
            return;
        }
        let renderer = GlyphRenderer::new(self.render_options);

        loop {
            let i = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(&codepoint) = codepoints.get(i) else {
                break;
            };

            let outcome = match renderer.render(&font, codepoint) {
                Ok(bitmap) => {
                    if let Some(dir) = &self.image_dir {
                        if let Err(e) = bitmap.save_png(dir) {
                            log::warn!("Cannot save {}: {}", bitmap.file_name(), e);
                        }
                    }
                    JobOutcome::Recognized(cascade.recognize(&bitmap))
                },
                Err(e) => {
                    log::warn!("{}", e);
                    JobOutcome::RenderFailed(e.to_string())
                },
            };

            results.lock().insert(codepoint, outcome);
        }
    }
}
