use std::path::Path;

use float_ord::FloatOrd;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis, Ix3};
use ort::{inputs, Session};
use tracing::instrument;

use super::{
    engine::{open_session, Device},
    util::normalize_chw,
};
use crate::{Error, Result};

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

const LINE_HEIGHT: u32 = 48;

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub character_scores: Vec<f32>,
}

impl TextLine {
    /// Mean per-character score, zero for an empty line.
    pub fn confidence(&self) -> f32 {
        if self.character_scores.is_empty() {
            return 0.0;
        }
        self.character_scores.iter().sum::<f32>() / self.character_scores.len() as f32
    }
}

/// CRNN line recognizer with greedy CTC decoding.
pub struct LineRecognizer {
    session: Session,
    keys: Vec<String>,
}

impl LineRecognizer {
    pub fn new(model: &Path, keys: &Path, threads: usize, device: Device) -> Result<Self> {
        let session = open_session(model, threads, device)?;
        let dictionary = std::fs::read_to_string(keys).map_err(Error::io(keys))?;
        log::debug!("Recognizer inputs: {:?}", session.inputs);
        Ok(Self {
            session,
            keys: ctc_keys(&dictionary),
        })
    }

    #[instrument(level = "trace", skip(self, image))]
    pub fn recognize(&self, image: &DynamicImage) -> Result<TextLine> {
        let scale = LINE_HEIGHT as f32 / image.height() as f32;
        let width = ((image.width() as f32 * scale) as u32).clamp(1, u16::MAX as u32);
        let line = image.resize_exact(width, LINE_HEIGHT, FilterType::Triangle);

        let input = normalize_chw(&line, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input]?)?;
        let scores = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ModelOutput("recognizer returned no tensors".into()))?
            .try_extract_tensor::<f32>()?;
        let scores = scores
            .into_dimensionality::<Ix3>()
            .map_err(|err| Error::ModelOutput(format!("recognizer output: {err}")))?;
        log::trace!("Recognizer output shape: {:?}", scores.dim());

        Ok(decode_ctc(scores.index_axis(Axis(0), 0), &self.keys))
    }
}

/// Index 0 is the CTC blank, the dictionary follows, then a space.
fn ctc_keys(dictionary: &str) -> Vec<String> {
    std::iter::once("#".to_string())
        .chain(dictionary.lines().map(str::to_string))
        .chain(std::iter::once(" ".to_string()))
        .collect()
}

/// Best class per time step; blanks and repeats of the previous step are
/// dropped.
fn decode_ctc(scores: ArrayView2<f32>, keys: &[String]) -> TextLine {
    let mut text = String::new();
    let mut character_scores = Vec::new();
    let mut previous = 0;
    for step in scores.outer_iter() {
        let Some((index, score)) = step
            .indexed_iter()
            .max_by_key(|(_, score)| FloatOrd(**score))
            .map(|(index, score)| (index, *score))
        else {
            continue;
        };
        if index != 0 && index != previous {
            if let Some(key) = keys.get(index) {
                text.push_str(key);
                character_scores.push(score);
            }
        }
        previous = index;
    }
    TextLine {
        text,
        character_scores,
    }
}
