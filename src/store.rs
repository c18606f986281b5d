//! Annotation files on disk.
//!
//! Each record is written as `<image stem>.json` next to a copy of its
//! source image. The JSON shape is the interchange format for the
//! standalone extraction run, so nothing is renamed or transformed.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::instrument;

use crate::{images::natural_cmp, AnnotationRecord, Error, Result};

/// Copies the source image into `output_dir` (unless it already lives there)
/// and writes the record beside it. Returns the path of the annotation file.
#[instrument(skip(record), fields(image = record.image_name()))]
pub fn save(record: &AnnotationRecord, image_source: &Path, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(Error::io(output_dir))?;

    let image_name = Path::new(record.image_name());
    let image_copy = output_dir.join(image_name);
    if same_file(image_source, &image_copy) {
        // Copying a file onto itself truncates it.
        tracing::debug!("{} is already in {}", image_name.display(), output_dir.display());
    } else {
        std::fs::copy(image_source, &image_copy).map_err(Error::io(image_source))?;
    }

    let annotation_path = output_dir.join(image_name.with_extension("json"));
    let file = File::create(&annotation_path).map_err(Error::io(&annotation_path))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    record
        .serialize(&mut serializer)
        .map_err(|source| Error::Annotation {
            path: annotation_path.clone(),
            source,
        })?;
    writer.flush().map_err(Error::io(&annotation_path))?;
    Ok(annotation_path)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub fn load(path: &Path) -> Result<AnnotationRecord> {
    let file = File::open(path).map_err(Error::io(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Annotation {
        path: path.to_path_buf(),
        source,
    })
}

/// Annotation files in `dir`, natural-sorted by file name.
pub fn list(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(Error::io(dir))? {
        let path = entry.map_err(Error::io(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(paths)
}

/// Loads every annotation in `dir`. Unreadable or malformed files are logged
/// and skipped; only a missing directory is an error.
#[instrument]
pub fn load_dir(dir: &Path) -> Result<Vec<AnnotationRecord>> {
    let records = list(dir)?
        .into_iter()
        .filter_map(|path| match load(&path) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("Skipping {}: {err}", path.display());
                None
            }
        })
        .collect();
    Ok(records)
}
