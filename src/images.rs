//! Input image discovery and preparation.

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use tracing::instrument;

use crate::{Error, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Longer side every input is scaled to before OCR.
pub const TARGET_SIDE: u32 = 2048;

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Images directly inside `dir`, natural-sorted by path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(Error::io(dir))? {
        let path = entry.map_err(Error::io(dir))?.path();
        if path.is_file() && is_image(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(paths)
}

/// Orders runs of digits by value, so `img2` sorts before `img10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks(a);
    let mut right = Chunks(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let order = match (is_digits(x), is_digits(y)) {
                    (true, true) => {
                        let x = x.trim_start_matches('0');
                        let y = y.trim_start_matches('0');
                        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
                    }
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => x.cmp(y),
                };
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

fn is_digits(chunk: &str) -> bool {
    chunk.starts_with(|c: char| c.is_ascii_digit())
}

/// Alternating digit and non-digit runs of a string.
struct Chunks<'a>(&'a str);

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.0.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .0
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.0.len());
        let (chunk, rest) = self.0.split_at(end);
        self.0 = rest;
        Some(chunk)
    }
}

/// Size that brings the longer side of `(width, height)` to `side`.
pub fn fit_longer_side(width: u32, height: u32, side: u32) -> (u32, u32) {
    let ratio = if width > height {
        side as f64 / width as f64
    } else {
        side as f64 / height as f64
    };
    (
        (width as f64 * ratio) as u32,
        (height as f64 * ratio) as u32,
    )
}

/// Rescales the image at `path` so its longer side is `side` pixels and
/// overwrites the file. Smaller images are scaled up.
#[instrument(level = "debug")]
pub fn resize_in_place(path: &Path, side: u32) -> Result<()> {
    let image = image::open(path).map_err(Error::image(path))?;
    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_longer_side(width, height, side);
    log::debug!("Resizing {width}x{height} -> {new_width}x{new_height}");
    let resized = image.resize_exact(new_width.max(1), new_height.max(1), FilterType::Triangle);
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    let resized = if is_jpeg {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };
    resized.save(path).map_err(Error::image(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order() {
        let mut names = vec!["img10.jpg", "img2.jpg", "img1.jpg", "IMG3.jpg", "img02.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            ["IMG3.jpg", "img1.jpg", "img2.jpg", "img02.png", "img10.jpg"]
        );
    }

    #[test]
    fn longer_side_is_fitted() {
        assert_eq!(fit_longer_side(4096, 3072, 2048), (2048, 1536));
        assert_eq!(fit_longer_side(512, 1024, 2048), (1024, 2048));
        assert_eq!(fit_longer_side(512, 512, 2048), (2048, 2048));
    }

    #[test]
    fn lists_only_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b10.JPG", "b9.png", "notes.txt", "a.jpeg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<_> = list_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpeg", "b9.png", "b10.JPG"]);
    }

    #[test]
    fn resizes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        image::RgbImage::new(64, 32).save(&path).unwrap();
        resize_in_place(&path, 128).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (128, 64));
    }
}
