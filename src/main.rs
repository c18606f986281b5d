use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use label_extract::{
    ocr::OnnxEngineBuilder,
    pipeline::{self, ImageRun},
    report, OcrAdapter, PatternConfig, PatternExtractor, ReportBuilder,
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Extracts asset IDs and serial numbers from images of equipment labels.
#[derive(Parser, Debug)]
#[command(name = "label-extract", version)]
struct Args {
    /// Directory containing the images (or annotation files with --from-annotations).
    image_dir: PathBuf,

    /// CSV file the results are written to.
    output_file: PathBuf,

    /// Run OCR on the GPU.
    #[arg(long)]
    gpu: bool,

    /// Treat IMAGE_DIR as a directory of annotation JSON files and skip OCR.
    #[arg(long)]
    from_annotations: bool,

    /// Also save every OCR record (and a copy of its image) to this directory.
    #[arg(long, value_name = "DIR")]
    annotations_out: Option<PathBuf>,

    /// Leave the input images at their original size.
    #[arg(long)]
    no_resize: bool,

    /// TOML file replacing the built-in pattern tiers.
    #[arg(long, value_name = "FILE")]
    patterns: Option<PathBuf>,

    /// Text detection model.
    #[arg(long, env = "LABEL_EXTRACT_DET_MODEL", default_value = "models/det.onnx")]
    det_model: PathBuf,

    /// Text recognition model.
    #[arg(long, env = "LABEL_EXTRACT_REC_MODEL", default_value = "models/rec.onnx")]
    rec_model: PathBuf,

    /// Character dictionary for the recognition model, one entry per line.
    #[arg(long, env = "LABEL_EXTRACT_REC_KEYS", default_value = "models/keys.txt")]
    rec_keys: PathBuf,

    /// Inference threads.
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.patterns {
        Some(path) => PatternConfig::load(path)
            .with_context(|| format!("loading patterns from {}", path.display()))?,
        None => PatternConfig::default(),
    };
    let report_builder = ReportBuilder::new(PatternExtractor::new(&config)?)?;

    let rows = if args.from_annotations {
        pipeline::run_annotations(&args.image_dir, &report_builder)?
    } else {
        let engine = OnnxEngineBuilder::new()
            .det_model(&args.det_model)
            .rec_model(&args.rec_model, &args.rec_keys)
            .threads(args.threads)
            .gpu(args.gpu)
            .build()
            .context("loading OCR models")?;
        let options = ImageRun {
            resize: !args.no_resize,
            annotations_out: args.annotations_out.clone(),
        };
        pipeline::run_images(
            &args.image_dir,
            &OcrAdapter::new(engine),
            &report_builder,
            &options,
        )
        .with_context(|| format!("processing {}", args.image_dir.display()))?
    };

    report::write_csv(&args.output_file, &rows)
        .with_context(|| format!("writing {}", args.output_file.display()))?;
    tracing::info!("Wrote {} rows to {}", rows.len(), args.output_file.display());
    Ok(())
}
