//! Resolve the mapping of an obfuscation font and optionally decode a payload.
//!
//! Usage:
//!   cargo run --release --bin font_mapping -- --font page.otf
//!   cargo run --release --bin font_mapping -- --font page.otf --decode payload.json --output clean.json
//!   cargo run --release --features ocr --bin font_mapping -- --font page.otf \
//!       --primary-model rec.onnx --primary-dict dict.txt
//!
//! Options:
//!   --font <path>          Font file to resolve (required)
//!   --cache-dir <dir>      Mapping cache directory (default: cache)
//!   --image-dir <dir>      Glyph image directory (default: tools/ocr_chars)
//!   --config <path>        JSON resolver configuration
//!   --overrides <path>     JSON object of reviewed source char -> real char
//!   --decode <path>        JSON payload to decode
//!   --output <path>        Write the decoded payload here instead of stdout
//!   --force                Resolve again even if the cache has a mapping
//!   --review-images        Re-render review images for the font
//!   --verbose, -v          Debug logging

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use glyph_oxide::locator::local_locator;
use glyph_oxide::{FontDecoder, RecognitionCascade, ResolverConfig, UpdateOutcome};

#[derive(Default)]
struct CliArgs {
    font: Option<PathBuf>,
    cache_dir: PathBuf,
    image_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    overrides: Option<PathBuf>,
    decode: Option<PathBuf>,
    output: Option<PathBuf>,
    force: bool,
    review_images: bool,
    verbose: bool,
    primary_model: Option<PathBuf>,
    primary_dict: Option<PathBuf>,
    fallback_model: Option<PathBuf>,
    fallback_dict: Option<PathBuf>,
}

impl CliArgs {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut cli = Self {
            cache_dir: PathBuf::from("cache"),
            ..Default::default()
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || -> Result<PathBuf, String> {
                i += 1;
                args.get(i).map(PathBuf::from).ok_or_else(|| format!("{} needs a value", flag))
            };
            match flag {
                "--font" => cli.font = Some(value()?),
                "--cache-dir" => cli.cache_dir = value()?,
                "--image-dir" => cli.image_dir = Some(value()?),
                "--config" => cli.config = Some(value()?),
                "--overrides" => cli.overrides = Some(value()?),
                "--decode" => cli.decode = Some(value()?),
                "--output" => cli.output = Some(value()?),
                "--primary-model" => cli.primary_model = Some(value()?),
                "--primary-dict" => cli.primary_dict = Some(value()?),
                "--fallback-model" => cli.fallback_model = Some(value()?),
                "--fallback-dict" => cli.fallback_dict = Some(value()?),
                "--force" => cli.force = true,
                "--review-images" => cli.review_images = true,
                "--verbose" | "-v" => cli.verbose = true,
                other => return Err(format!("unknown argument: {}", other)),
            }
            i += 1;
        }

        if cli.font.is_none() {
            return Err("--font is required".to_string());
        }
        Ok(cli)
    }
}

#[cfg(feature = "ocr")]
fn engine_paths(model: &Option<PathBuf>, dict: &Option<PathBuf>) -> Option<glyph_oxide::ocr::onnx::OnnxRecognizerConfig> {
    match (model, dict) {
        (Some(m), Some(d)) => Some(glyph_oxide::ocr::onnx::OnnxRecognizerConfig::new(m, d)),
        _ => None,
    }
}

#[cfg(feature = "ocr")]
fn build_cascade(
    cli: &CliArgs,
    config: &ResolverConfig,
) -> impl Fn(usize) -> glyph_oxide::Result<RecognitionCascade> + Sync {
    use glyph_oxide::ocr::onnx::OnnxRecognizer;
    use glyph_oxide::Recognizer;

    let primary = engine_paths(&cli.primary_model, &cli.primary_dict);
    let fallback = engine_paths(&cli.fallback_model, &cli.fallback_dict);
    let config = config.clone();

    move |worker: usize| -> glyph_oxide::Result<RecognitionCascade> {
        let mut engines: Vec<Box<dyn Recognizer>> = Vec::new();
        if let Some(p) = &primary {
            engines.push(Box::new(OnnxRecognizer::new(format!("primary#{}", worker), p.clone())?));
        }
        if let Some(f) = &fallback {
            engines.push(Box::new(OnnxRecognizer::new(format!("fallback#{}", worker), f.clone())?));
        }
        Ok(RecognitionCascade::from_engines(engines, &config))
    }
}

#[cfg(not(feature = "ocr"))]
fn build_cascade(
    cli: &CliArgs,
    _config: &ResolverConfig,
) -> impl Fn(usize) -> glyph_oxide::Result<RecognitionCascade> + Sync {
    if cli.primary_model.is_some() || cli.fallback_model.is_some() {
        log::warn!("Built without the `ocr` feature; recognition models are ignored");
    }
    |_worker: usize| -> glyph_oxide::Result<RecognitionCascade> { Ok(RecognitionCascade::new()) }
}

fn load_config(cli: &CliArgs) -> glyph_oxide::Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::from_json_file(path)?,
        None => ResolverConfig::default(),
    };
    if let Some(dir) = &cli.image_dir {
        config = config.with_image_dir(dir);
    }
    Ok(config)
}

fn run(cli: &CliArgs) -> glyph_oxide::Result<()> {
    let config = load_config(cli)?;
    let factory = build_cascade(cli, &config);

    let mut session = FontDecoder::new(config, &cli.cache_dir);
    if let Some(path) = &cli.overrides {
        let text = std::fs::read_to_string(path)?;
        let overrides: BTreeMap<String, String> = serde_json::from_str(&text)?;
        println!("Loaded {} overrides from {}", overrides.len(), path.display());
        session.set_overrides(overrides);
    }

    let Some(font_path) = &cli.font else {
        return Ok(());
    };

    let update = if cli.force {
        let data = std::fs::read(font_path)?;
        let name = font_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        session
            .regenerate(&data, &local_locator(&name), &factory)
            .map(UpdateOutcome::Resolved)
    } else {
        session.update_from_path(font_path, &factory)
    };

    match update {
        Ok(UpdateOutcome::Resolved(report)) => println!("Resolved {}", report),
        Ok(UpdateOutcome::LoadedFromCache) => println!("Using cached mapping"),
        Ok(UpdateOutcome::Unchanged) => println!("Font unchanged since last run"),
        Err(e) if session.mapping().is_some() => eprintln!("Warning: {}", e),
        Err(e) => return Err(e),
    }

    if let (Some(identity), Some(mapping)) = (session.identity(), session.mapping()) {
        println!(
            "Font {}: {} entries, {} unresolved",
            identity,
            mapping.len(),
            mapping.unresolved_count()
        );
        println!("Mapping file: {}", session.cache().mapping_path(identity).display());
        for entry in mapping.unresolved().take(20) {
            println!("  unresolved U+{:04X} ({})", entry.codepoint(), entry.glyph_name);
        }
    }

    if cli.review_images {
        let data = std::fs::read(font_path)?;
        let report = session.ensure_review_images(&data)?;
        println!(
            "Review images: {} present, {} rendered, {} failed",
            report.existing,
            report.rendered,
            report.failed.len()
        );
    }

    if let Some(input) = &cli.decode {
        let text = std::fs::read_to_string(input)?;
        let payload: serde_json::Value = serde_json::from_str(&text)?;
        let decoded = serde_json::to_string_pretty(&session.decode_value(&payload))?;
        match &cli.output {
            Some(path) => {
                std::fs::write(path, decoded)?;
                println!("Decoded payload written to {}", path.display());
            },
            None => println!("{}", decoded),
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = match CliArgs::from_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: font_mapping --font <path> [--force] [--decode <json>] [--output <path>] [-v]");
            return ExitCode::from(2);
        },
    };

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
