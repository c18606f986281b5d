//! OCR adapter.
//!
//! [`TextRecognizer`] is the boundary to whatever does the actual reading;
//! [`OcrAdapter`] turns its raw hits into an [`AnnotationRecord`].

pub mod detector;
pub mod engine;
pub mod recognizer;
pub mod util;

use std::path::Path;

use image::DynamicImage;
use tracing::instrument;

pub use detector::DetectionParams;
pub use engine::{Device, OnnxEngine, OnnxEngineBuilder};

use crate::{AnnotationRecord, Detection, Error, FileInfo, Result, WordBox};

/// Something that reads text off an image.
pub trait TextRecognizer {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        (**self).read_text(image)
    }
}

pub struct OcrAdapter<R> {
    recognizer: R,
}

impl<R: TextRecognizer> OcrAdapter<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    /// Reads the image at `image_path` and records every word the recognizer
    /// reports, in the order it reports them.
    #[instrument(skip(self))]
    pub fn recognize(&self, image_path: &Path) -> Result<AnnotationRecord> {
        let image = image::open(image_path).map_err(Error::image(image_path))?;
        let detections = self.recognizer.read_text(&image)?;

        let file_info = FileInfo {
            width: image.width(),
            height: image.height(),
            image_dir_path: image_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            image_name: image_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let words = detections.into_iter().map(WordBox::from).collect();
        Ok(AnnotationRecord::new(file_info, words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    struct Fixed(Vec<Detection>);

    impl TextRecognizer for Fixed {
        fn read_text(&self, _image: &DynamicImage) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    fn detection(text: &str, x: i32) -> Detection {
        Detection {
            polygon: [Point(x, 0), Point(x + 30, 0), Point(x + 30, 10), Point(x, 10)],
            text: text.to_string(),
            confidence: 0.5,
        }
    }

    #[test]
    fn builds_record_from_detections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_20240102_x.png");
        image::RgbImage::new(40, 20).save(&path).unwrap();

        let adapter = OcrAdapter::new(Fixed(vec![detection("SN:", 0), detection("16-50122", 35)]));
        let record = adapter.recognize(&path).unwrap();

        assert_eq!(record.file_info.width, 40);
        assert_eq!(record.file_info.height, 20);
        assert_eq!(record.file_info.image_dir_path, dir.path());
        assert_eq!(record.image_name(), "label_20240102_x.png");
        assert_eq!(record.complete_text(), "SN:\n16-50122\n");
        assert_eq!(record.words()[1].bounding_poly[0], Point(35, 0));
        assert_eq!(record.words()[0].confidence, 0.5);
        assert!(record.words()[0].symbols.is_empty());
    }

    #[test]
    fn unreadable_image_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = OcrAdapter::new(Fixed(Vec::new()));
        let err = adapter.recognize(&dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
