//! Asset ID and serial number extraction from photographs of equipment labels.
//!
//! Images are read by an OCR backend into [`AnnotationRecord`]s (word text,
//! confidence, and a four-point box per word). The [`extract`] module then
//! scans each record with ranked regex tiers per field, stitching fragments
//! split across neighbouring word boxes, and [`report`] turns the results
//! into one CSV row per image.

pub mod config;
mod error;
pub mod extract;
pub mod images;
pub mod ocr;
pub mod pipeline;
pub mod report;
mod result;
pub mod store;

pub use config::PatternConfig;
pub use error::{Error, Result};
pub use extract::{Extraction, Field, MatchResult, PatternExtractor};
pub use ocr::{OcrAdapter, TextRecognizer};
pub use report::{ReportBuilder, ReportRow};
pub use result::*;

pub use ort as runtime;
