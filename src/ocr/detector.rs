use std::path::Path;

use geo::{Coord, MinimumRotatedRect, Polygon, Scale as _};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use imageproc::{
    contours::find_contours,
    contrast::{threshold_mut, ThresholdType},
    distance_transform::Norm,
    morphology::dilate_mut,
};
use ndarray::{ArrayView2, Axis, Ix4};
use ort::{inputs, Session};
use tracing::instrument;

use super::{
    engine::{open_session, Device},
    util::{
        contour_polygon, detector_scale, expand_region, longest_edge, normalize_chw,
        probability_image, region_score, Scale,
    },
};
use crate::{Error, Result};

const MEAN_VALUES: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_VALUES: [f32; 3] = [1.0 / 0.229, 1.0 / 0.224, 1.0 / 0.225];

const MIN_SIDE: f32 = 3.0;
const MAX_CANDIDATES: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    /// Probability above which a pixel counts as text.
    pub box_threshold: f32,
    /// Minimum mean probability of a kept region.
    pub box_score_threshold: f32,
    pub unclip_ratio: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            box_threshold: 0.3,
            box_score_threshold: 0.5,
            unclip_ratio: 1.6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextRegion {
    pub score: f32,
    pub rect: Polygon<f32>,
}

/// DB text detector: segments text pixels, then boxes each connected blob.
pub struct TextDetector {
    session: Session,
    max_side_len: u32,
}

impl TextDetector {
    pub fn new(path: &Path, threads: usize, max_side_len: u32, device: Device) -> Result<Self> {
        Ok(Self {
            session: open_session(path, threads, device)?,
            max_side_len,
        })
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn detect(&self, image: &DynamicImage, params: DetectionParams) -> Result<Vec<TextRegion>> {
        let scale = detector_scale(image, self.max_side_len);
        let resized =
            image.resize_exact(scale.target_width, scale.target_height, FilterType::Triangle);
        let input = normalize_chw(&resized, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input]?)?;
        let prediction = outputs
            .values()
            .next()
            .ok_or_else(|| Error::ModelOutput("detector returned no tensors".into()))?
            .try_extract_tensor::<f32>()?;
        let prediction = prediction
            .into_dimensionality::<Ix4>()
            .map_err(|err| Error::ModelOutput(format!("detector output: {err}")))?;
        let map = prediction.index_axis(Axis(0), 0);
        let map = map.index_axis(Axis(0), 0);

        let mut mask = probability_image(map)
            .ok_or_else(|| Error::ModelOutput("detector map has wrong size".into()))?;
        threshold_mut(
            &mut mask,
            (params.box_threshold * 255.0) as u8,
            ThresholdType::Binary,
        );
        dilate_mut(&mut mask, Norm::L1, 2);

        Ok(collect_regions(map, &mask, scale, params))
    }
}

#[instrument(level = "trace", skip(map, mask))]
fn collect_regions(
    map: ArrayView2<f32>,
    mask: &GrayImage,
    scale: Scale,
    params: DetectionParams,
) -> Vec<TextRegion> {
    find_contours::<i32>(mask)
        .into_iter()
        .take(MAX_CANDIDATES)
        .filter(|contour| contour.points.len() > 2)
        .filter_map(|contour| contour_polygon(&contour.points).minimum_rotated_rect())
        .filter(|rect| longest_edge(rect) >= MIN_SIDE)
        .map(|rect| {
            let score = region_score(&rect, map);
            (rect, score)
        })
        .filter(|(_, score)| *score >= params.box_score_threshold)
        .filter_map(|(rect, score)| Some((expand_region(rect, params.unclip_ratio)?, score)))
        .filter(|(rect, _)| longest_edge(rect) >= MIN_SIDE + 2.0)
        .map(|(rect, score)| TextRegion {
            score,
            rect: rect.scale_around_point(scale.factor_x, scale.factor_y, Coord::zero()),
        })
        .collect()
}
