//! CTC text recognizer over ONNX Runtime.
//!
//! Works with PaddleOCR-style recognition models exported to ONNX: input
//! `[1, C, H, W]` normalized to `(x / 255 - mean) / std`, output
//! `[1, T, V]` per-timestep class scores where class `blank_index` is the CTC
//! blank and class `i + dict_offset` is line `i` of the dictionary file.
//!
//! The glyph bitmap is cropped to its ink with a white margin and scaled to
//! the model's input height before inference. Confidence is the mean of the
//! per-character maximum probabilities, as PaddleOCR reports it.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use super::{Candidate, Recognizer};
use crate::error::{Error, Result};
use crate::rendering::GlyphBitmap;

/// Settings for an [`OnnxRecognizer`].
#[derive(Debug, Clone)]
pub struct OnnxRecognizerConfig {
    /// Path to the `.onnx` recognition model
    pub model_path: PathBuf,
    /// Path to the character dictionary (one entry per line)
    pub dict_path: PathBuf,
    /// Model input height in pixels
    pub input_height: u32,
    /// Minimum input width in pixels
    pub min_width: u32,
    /// Input channels (3 for RGB models, 1 for grayscale)
    pub channels: usize,
    /// Normalization mean
    pub mean: f32,
    /// Normalization standard deviation
    pub std: f32,
    /// CTC blank class
    pub blank_index: usize,
    /// Class index of the first dictionary line
    pub dict_offset: usize,
    /// Append a space character to the dictionary
    pub use_space_char: bool,
    /// White margin added around the ink before scaling
    pub padding: u32,
}

impl OnnxRecognizerConfig {
    /// PaddleOCR defaults for the given model and dictionary.
    pub fn new(model_path: impl Into<PathBuf>, dict_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            dict_path: dict_path.into(),
            input_height: 48,
            min_width: 16,
            channels: 3,
            mean: 0.5,
            std: 0.5,
            blank_index: 0,
            dict_offset: 1,
            use_space_char: true,
            padding: 8,
        }
    }
}

/// ONNX Runtime CTC recognizer.
pub struct OnnxRecognizer {
    name: String,
    session: Session,
    vocab: Vec<String>,
    config: OnnxRecognizerConfig,
}

impl OnnxRecognizer {
    /// Load the model and dictionary.
    pub fn new(name: impl Into<String>, config: OnnxRecognizerConfig) -> Result<Self> {
        let name = name.into();
        let vocab = load_dictionary(&config.dict_path, config.use_space_char)?;
        let load_err = |e: &dyn std::fmt::Display| {
            Error::recognition(&name, format!("loading {}: {}", config.model_path.display(), e))
        };
        let session = Session::builder()
            .map_err(|e| load_err(&e))?
            .with_intra_threads(1)
            .map_err(|e| load_err(&e))?
            .commit_from_file(&config.model_path)
            .map_err(|e| load_err(&e))?;

        log::info!(
            "Loaded recognition model '{}' from {} ({} dictionary entries)",
            name,
            config.model_path.display(),
            vocab.len()
        );

        Ok(Self {
            name,
            session,
            vocab,
            config,
        })
    }

    fn preprocess(&self, bitmap: &GlyphBitmap) -> Result<Array4<f32>> {
        let img = GrayImage::from_raw(bitmap.width, bitmap.height, bitmap.pixels.clone())
            .ok_or_else(|| Error::recognition(&self.name, "bitmap size does not match pixel data"))?;

        let (x, y, w, h) = bitmap.ink_bounds().unwrap_or((0, 0, bitmap.width, bitmap.height));
        let ink = imageops::crop_imm(&img, x, y, w, h).to_image();

        let pad = self.config.padding;
        let mut padded = GrayImage::from_pixel(w + 2 * pad, h + 2 * pad, image::Luma([255]));
        imageops::replace(&mut padded, &ink, i64::from(pad), i64::from(pad));

        let height = self.config.input_height;
        let scale = height as f32 / padded.height() as f32;
        let width = ((padded.width() as f32 * scale).ceil() as u32).max(self.config.min_width);
        let resized = imageops::resize(&padded, width, height, FilterType::Triangle);

        let channels = self.config.channels;
        let mut tensor = Array4::<f32>::zeros((1, channels, height as usize, width as usize));
        for (px, py, pixel) in resized.enumerate_pixels() {
            let v = (f32::from(pixel[0]) / 255.0 - self.config.mean) / self.config.std;
            for c in 0..channels {
                tensor[[0, c, py as usize, px as usize]] = v;
            }
        }
        Ok(tensor)
    }

    fn infer(&mut self, tensor: Array4<f32>) -> Result<(Vec<usize>, Vec<f32>)> {
        let name = self.name.clone();
        let err = |e: ort::Error| Error::recognition(&name, e);

        let shape: [usize; 4] = [tensor.shape()[0], tensor.shape()[1], tensor.shape()[2], tensor.shape()[3]];
        let (data, _offset) = tensor.into_raw_vec_and_offset();
        let input = Value::from_array((shape, data)).map_err(err)?;

        let input_name = self
            .session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| Error::recognition(&name, "model has no inputs"))?;

        let outputs = self.session.run(ort::inputs![input_name => input]).map_err(err)?;
        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| Error::recognition(&name, "model produced no outputs"))?;
        let (dims, scores) = outputs[first_key].try_extract_tensor::<f32>().map_err(err)?;

        let dims = dims.iter().map(|&d| d as usize).collect();
        Ok((dims, scores.to_vec()))
    }
}

impl Recognizer for OnnxRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&mut self, bitmap: &GlyphBitmap) -> Result<Vec<Candidate>> {
        let tensor = self.preprocess(bitmap)?;
        let (dims, scores) = self.infer(tensor)?;

        let (steps, classes) = match dims.as_slice() {
            [1, t, v] | [t, 1, v] | [t, v] => (*t, *v),
            other => {
                return Err(Error::recognition(&self.name, format!("unexpected output shape {:?}", other)));
            },
        };
        if scores.len() < steps * classes {
            return Err(Error::recognition(&self.name, "output shorter than its shape"));
        }

        match ctc_greedy_decode(&scores[..steps * classes], classes, self.config.blank_index, |class| {
            class
                .checked_sub(self.config.dict_offset)
                .and_then(|i| self.vocab.get(i))
                .map(String::as_str)
        }) {
            Some((text, confidence)) => Ok(vec![Candidate::new(text, confidence)]),
            None => Ok(Vec::new()),
        }
    }
}

fn load_dictionary(path: &Path, use_space_char: bool) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    let mut vocab: Vec<String> = text
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();
    if use_space_char {
        vocab.push(" ".to_string());
    }
    Ok(vocab)
}

/// Greedy CTC decode over row-major `[steps, classes]` scores.
///
/// Rows that are not already probabilities are softmaxed first. Repeated
/// classes collapse and blanks are dropped. Returns `None` when nothing but
/// blanks was emitted.
fn ctc_greedy_decode<'v>(
    scores: &[f32],
    classes: usize,
    blank_index: usize,
    lookup: impl Fn(usize) -> Option<&'v str>,
) -> Option<(String, f32)> {
    if classes == 0 {
        return None;
    }

    let mut text = String::new();
    let mut probs = Vec::new();
    let mut prev = None;

    for row in scores.chunks_exact(classes) {
        let row = as_probabilities(row);
        let (best, p) = row
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });

        if best != blank_index && prev != Some(best) {
            match lookup(best) {
                Some(s) => {
                    text.push_str(s);
                    probs.push(p);
                },
                None => log::debug!("CTC class {} not in dictionary", best),
            }
        }
        prev = Some(best);
    }

    if probs.is_empty() {
        return None;
    }
    let confidence = probs.iter().sum::<f32>() / probs.len() as f32;
    Some((text, confidence))
}

fn as_probabilities(row: &[f32]) -> Vec<f32> {
    let sum: f32 = row.iter().sum();
    if row.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3 {
        return row.to_vec();
    }
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
