use anyhow::{Context, Result, bail};
use clap::Parser;
use image_insight_wasm::ai::gemini::{GeminiClient, GeminiConfig};
use image_insight_wasm::{AnalysisOptions, ImageSource, VisionModel, analyze};
use std::fs;
use std::path::{Path, PathBuf};

/// Describe images as JSON: metadata, dominant colors, statistics and optional AI annotations.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of dominant colors (power of two)
    #[arg(short = 'k', long, default_value_t = 8)]
    palette_size: usize,

    /// Leave out file metadata
    #[arg(long)]
    no_info: bool,

    /// Leave out the dominant color palette
    #[arg(long)]
    no_colors: bool,

    /// Leave out brightness/contrast statistics
    #[arg(long)]
    no_stats: bool,

    /// Include the image as a base64 data URL
    #[arg(long)]
    base64: bool,

    /// Extract text with the vision model
    #[arg(long)]
    ocr: bool,

    /// Detect objects with the vision model
    #[arg(long)]
    objects: bool,

    /// Detect UI elements with the vision model
    #[arg(long)]
    ui: bool,

    /// Ask the vision model for a design analysis
    #[arg(long)]
    design: bool,

    /// Vision model API key; AI options are ignored without it
    #[arg(long)]
    api_key: Option<String>,

    /// Vision model name
    #[arg(long)]
    model: Option<String>,

    /// Vision model request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Write `<stem>.analysis.json` files here instead of printing to stdout
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            basic_info: !self.no_info,
            colors: !self.no_colors,
            base64: self.base64,
            statistics: !self.no_stats,
            ai_ocr: self.ocr,
            ai_objects: self.objects,
            ai_ui: self.ui,
            ai_design: self.design,
            palette_size: self.palette_size,
        }
    }

    fn vision_model(&self) -> Result<Option<GeminiClient>> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(None);
        };
        let mut config = GeminiConfig {
            timeout_secs: self.timeout,
            ..GeminiConfig::default()
        };
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        Ok(Some(GeminiClient::new(key, config)?))
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        // Let the library sniff the container.
        _ => "",
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let options = args.options();
    let client = args.vision_model().context("vision model setup failed")?;
    let model = client.as_ref().map(|c| c as &dyn VisionModel);
    if model.is_none() && !options.ai_capabilities().is_empty() {
        log::warn!("AI options given without --api-key; they will be skipped");
    }

    let mut failed = 0usize;
    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = ImageSource::new(name, mime_from_extension(input), bytes);

        let analysis = match analyze(&source, &options, model) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("{}: {e}", input.display());
                failed += 1;
                continue;
            }
        };
        if let Some(message) = &analysis.ai_error {
            eprintln!("{}: {message}", input.display());
        }

        let json = analysis.result.to_json(args.pretty)?;
        if let Some(dir) = &args.out_dir {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            let out_path = dir.join(format!("{stem}.analysis.json"));
            fs::create_dir_all(dir)?;
            fs::write(&out_path, json)?;
            println!("Saved → {}", out_path.display());
        } else {
            println!("{json}");
        }
    }

    if failed > 0 {
        bail!("{failed} of {} images could not be analyzed", args.inputs.len());
    }
    Ok(())
}
