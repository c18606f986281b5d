use std::path::{Path, PathBuf};

use image::DynamicImage;
use ort::{ExecutionProviderDispatch, GraphOptimizationLevel, Session};
use tracing::instrument;

use super::{
    detector::{DetectionParams, TextDetector},
    recognizer::LineRecognizer,
    util::{crop_region, ordered_quad},
    TextRecognizer,
};
use crate::{Detection, Result};

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    /// CUDA when built with the `cuda` feature, CPU otherwise.
    Gpu,
}

fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        Device::Cpu => Vec::new(),
        #[cfg(feature = "cuda")]
        Device::Gpu => vec![ort::CUDAExecutionProvider::default().build()],
        #[cfg(not(feature = "cuda"))]
        Device::Gpu => {
            tracing::warn!("GPU requested but built without the `cuda` feature, using CPU");
            Vec::new()
        }
    }
}

#[instrument(level = "debug")]
pub(crate) fn open_session(path: &Path, threads: usize, device: Device) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_inter_threads(threads)?
        .with_intra_threads(threads)?
        .with_execution_providers(execution_providers(device))?
        .commit_from_file(path)?;
    Ok(session)
}

pub struct OnnxEngineBuilder {
    threads: usize,
    device: Device,
    det_path: PathBuf,
    rec_path: PathBuf,
    keys_path: PathBuf,
    max_side_len: u32,
    params: DetectionParams,
}

impl OnnxEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn gpu(self, enabled: bool) -> Self {
        self.device(if enabled { Device::Gpu } else { Device::Cpu })
    }

    pub fn det_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.det_path = path.into();
        self
    }

    pub fn rec_model(mut self, model: impl Into<PathBuf>, keys: impl Into<PathBuf>) -> Self {
        self.rec_path = model.into();
        self.keys_path = keys.into();
        self
    }

    pub fn max_side_len(mut self, max_side_len: u32) -> Self {
        self.max_side_len = max_side_len;
        self
    }

    pub fn detection_params(mut self, params: DetectionParams) -> Self {
        self.params = params;
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<OnnxEngine> {
        let detector = TextDetector::new(
            &self.det_path,
            self.threads,
            self.max_side_len,
            self.device,
        )?;
        let recognizer =
            LineRecognizer::new(&self.rec_path, &self.keys_path, self.threads, self.device)?;
        Ok(OnnxEngine {
            detector,
            recognizer,
            params: self.params,
        })
    }
}

impl Default for OnnxEngineBuilder {
    fn default() -> Self {
        Self {
            threads: 4,
            device: Device::Cpu,
            det_path: "models/det.onnx".into(),
            rec_path: "models/rec.onnx".into(),
            keys_path: "models/keys.txt".into(),
            max_side_len: 2048,
            params: DetectionParams::default(),
        }
    }
}

/// Detection followed by per-region line recognition.
pub struct OnnxEngine {
    detector: TextDetector,
    recognizer: LineRecognizer,
    params: DetectionParams,
}

impl TextRecognizer for OnnxEngine {
    #[instrument(skip_all)]
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let regions = self.detector.detect(image, self.params)?;
        let mut detections = Vec::with_capacity(regions.len());
        for region in regions {
            let (Some(polygon), Some(crop)) =
                (ordered_quad(&region.rect), crop_region(image, &region.rect))
            else {
                continue;
            };
            let line = self.recognizer.recognize(&crop)?;
            if line.text.is_empty() {
                continue;
            }
            detections.push(Detection {
                polygon,
                confidence: line.confidence(),
                text: line.text,
            });
        }
        // Reading order: top to bottom, then left to right.
        detections.sort_by_key(|d| (d.polygon[0].y(), d.polygon[0].x()));
        log::debug!("Recognized {} text regions", detections.len());
        Ok(detections)
    }
}
