use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Integer pixel coordinate, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point(pub i32, pub i32);

impl Point {
    pub fn x(&self) -> i32 {
        self.0
    }

    pub fn y(&self) -> i32 {
        self.1
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.0) - f64::from(other.0);
        let dy = f64::from(self.1) - f64::from(other.1);
        dx.hypot(dy)
    }
}

/// Quadrilateral ordered top-left, top-right, bottom-right, bottom-left.
pub type Quad = [Point; 4];

/// One raw hit from a [`TextRecognizer`](crate::ocr::TextRecognizer).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub polygon: Quad,
    pub text: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordBox {
    pub confidence: f64,
    #[serde(rename = "description")]
    pub text: String,
    pub bounding_poly: Quad,
    /// Reserved, always empty.
    #[serde(default)]
    pub symbols: Vec<serde_json::Value>,
}

impl WordBox {
    pub fn top_left(&self) -> Point {
        self.bounding_poly[0]
    }

    pub fn top_right(&self) -> Point {
        self.bounding_poly[1]
    }
}

impl From<Detection> for WordBox {
    fn from(detection: Detection) -> Self {
        Self {
            confidence: f64::from(detection.confidence),
            text: detection.text,
            bounding_poly: detection.polygon,
            symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub width: u32,
    pub height: u32,
    pub image_dir_path: PathBuf,
    pub image_name: String,
}

impl FileInfo {
    pub fn image_path(&self) -> PathBuf {
        self.image_dir_path.join(&self.image_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotations {
    pub complete_text: String,
    pub individual_text: Vec<WordBox>,
}

/// Everything recognised on one image. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub file_info: FileInfo,
    pub text_annotations: TextAnnotations,
}

impl AnnotationRecord {
    pub fn new(file_info: FileInfo, words: Vec<WordBox>) -> Self {
        let complete_text = words.iter().fold(String::new(), |mut text, word| {
            text.push_str(&word.text);
            text.push('\n');
            text
        });
        Self {
            file_info,
            text_annotations: TextAnnotations {
                complete_text,
                individual_text: words,
            },
        }
    }

    pub fn words(&self) -> &[WordBox] {
        &self.text_annotations.individual_text
    }

    pub fn complete_text(&self) -> &str {
        &self.text_annotations.complete_text
    }

    pub fn image_name(&self) -> &str {
        &self.file_info.image_name
    }
}
