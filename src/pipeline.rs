//! Batch runs.
//!
//! Two ways in: straight from a directory of images (resize, OCR, extract),
//! or from a directory of annotation files written by an earlier run. An
//! image that fails aborts the image run; an annotation file that fails to
//! load is skipped.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::instrument;

use crate::{
    images::{self, TARGET_SIDE},
    ocr::{OcrAdapter, TextRecognizer},
    report::{ReportBuilder, ReportRow},
    store, AnnotationRecord, Result,
};

#[derive(Debug, Clone)]
pub struct ImageRun {
    /// Rescale every image in place to [`TARGET_SIDE`] before OCR.
    pub resize: bool,
    /// Save each record (and a copy of its image) here.
    pub annotations_out: Option<PathBuf>,
}

impl Default for ImageRun {
    fn default() -> Self {
        Self {
            resize: true,
            annotations_out: None,
        }
    }
}

fn progress(len: usize, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64).with_message(message);
    if let Ok(style) = ProgressStyle::with_template("{msg}: {wide_bar} {pos}/{len} [{elapsed}]") {
        bar.set_style(style);
    }
    bar
}

/// Resizes, reads and extracts every image in `image_dir`.
#[instrument(skip(adapter, report))]
pub fn run_images<R: TextRecognizer>(
    image_dir: &Path,
    adapter: &OcrAdapter<R>,
    report: &ReportBuilder,
    options: &ImageRun,
) -> Result<Vec<ReportRow>> {
    let paths = images::list_images(image_dir)?;
    tracing::info!("Found {} images in {}", paths.len(), image_dir.display());

    if options.resize {
        let bar = progress(paths.len(), "Resizing images");
        for path in &paths {
            images::resize_in_place(path, TARGET_SIDE)?;
            bar.inc(1);
        }
        bar.finish();
    }

    let bar = progress(paths.len(), "Performing OCR");
    let mut records = Vec::with_capacity(paths.len());
    for path in &paths {
        let record = adapter.recognize(path)?;
        if let Some(out) = &options.annotations_out {
            store::save(&record, path, out)?;
        }
        records.push(record);
        bar.inc(1);
    }
    bar.finish();

    let rows = report.build(&records);
    log_summary(&rows);
    Ok(rows)
}

/// Extracts from previously saved annotation files.
#[instrument(skip(report))]
pub fn run_annotations(annotation_dir: &Path, report: &ReportBuilder) -> Result<Vec<ReportRow>> {
    let records: Vec<AnnotationRecord> = store::load_dir(annotation_dir)?;
    tracing::info!(
        "Loaded {} annotations from {}",
        records.len(),
        annotation_dir.display()
    );
    let rows = report.build(&records);
    log_summary(&rows);
    Ok(rows)
}

fn log_summary(rows: &[ReportRow]) {
    let asset_ids = rows.iter().filter(|row| !row.asset_id.is_empty()).count();
    let serials = rows
        .iter()
        .filter(|row| !row.serial_number.is_empty())
        .count();
    tracing::info!(
        images = rows.len(),
        asset_ids,
        serials,
        "Extraction finished"
    );
}
