use geo::{
    point, Area, BoundingRect, Contains, Coord, EuclideanLength, HasDimensions, LineString,
    MinimumRotatedRect, Polygon, Translate,
};
use float_ord::FloatOrd;
use geo_clipper::{Clipper, EndType, JoinType};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, Rgb};
use imageproc::point::Point as ContourPoint;
use ndarray::{s, Array3, ArrayView2, Axis};
use tracing::instrument;

use crate::{Point, Quad};

/// `(pixel * norm) - (mean * norm)` per channel, laid out CHW.
#[instrument(level = "trace", skip(image))]
pub(crate) fn normalize_chw(image: &DynamicImage, mean: &[f32; 3], norm: &[f32; 3]) -> Array3<f32> {
    let image = image.to_rgb32f();
    let norm = Rgb::<f32>(*norm);
    let offset = Rgb::<f32>(*mean).map2(&norm, |m, n| m * n);
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(channel, y, x)| {
            let pixel = image
                .get_pixel(x as u32, y as u32)
                .map2(&norm, |c, n| c * n)
                .map2(&offset, |c, o| c - o);
            pixel.channels()[channel]
        },
    )
}

/// Probability map to an 8-bit mask image.
pub(crate) fn probability_image(map: ArrayView2<f32>) -> Option<GrayImage> {
    let height = map.len_of(Axis(0));
    let width = map.len_of(Axis(1));
    let pixels = map
        .axis_iter(Axis(0))
        .flat_map(|row| row.into_iter())
        .map(|p| (p.clamp(0.0, 1.0) * 255.0) as u8)
        .collect::<Vec<u8>>();
    ImageBuffer::from_raw(width as u32, height as u32, pixels)
}

pub(crate) fn contour_polygon(points: &[ContourPoint<i32>]) -> Polygon<f32> {
    let ring = points
        .iter()
        .map(|p| Coord {
            x: p.x as f32,
            y: p.y as f32,
        })
        .collect();
    Polygon::new(LineString::new(ring), vec![])
}

pub(crate) fn longest_edge(rect: &Polygon<f32>) -> f32 {
    rect.exterior()
        .lines()
        .map(|line| line.euclidean_length())
        .fold(0.0, f32::max)
}

/// Mean probability inside `rect`.
pub(crate) fn region_score(rect: &Polygon<f32>, map: ArrayView2<f32>) -> f32 {
    let Some(bounds) = rect.bounding_rect() else {
        return 0.0;
    };
    let (rows, cols) = map.dim();
    let min = bounds.min();
    let max = bounds.max();
    let x0 = (min.x.max(0.0) as usize).min(cols);
    let y0 = (min.y.max(0.0) as usize).min(rows);
    let x1 = (max.x.max(0.0) as usize).clamp(x0, cols);
    let y1 = (max.y.max(0.0) as usize).clamp(y0, rows);

    let local = rect.translate(-(x0 as f32), -(y0 as f32));
    let (sum, count) = map
        .slice(s![y0..y1, x0..x1])
        .indexed_iter()
        .filter(|((y, x), _)| local.contains(&point![x: *x as f32, y: *y as f32]))
        .fold((0.0f32, 0usize), |(sum, count), (_, value)| (sum + *value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Grows a shrunk text kernel back to the full text extent.
pub(crate) fn expand_region(rect: Polygon<f32>, ratio: f32) -> Option<Polygon<f32>> {
    let perimeter = rect.exterior().euclidean_length();
    if perimeter <= 0.0 {
        return None;
    }
    let distance = rect.unsigned_area() * ratio / perimeter;
    let grown = rect.offset(distance, JoinType::Round(0.25), EndType::ClosedPolygon, 1.0);
    if grown.is_empty() {
        None
    } else {
        grown.minimum_rotated_rect()
    }
}

/// Corners of a rotated rectangle as integer pixels, ordered top-left,
/// top-right, bottom-right, bottom-left.
///
/// Corners are walked clockwise by angle around the centroid, starting from
/// the one with the smallest `x + y` (the upper one on a tie), so each
/// corner fills exactly one role at any rotation.
pub(crate) fn ordered_quad(rect: &Polygon<f32>) -> Option<Quad> {
    let mut corners: Vec<Coord<f32>> = rect.exterior().coords().take(4).copied().collect();
    if corners.len() < 4 {
        return None;
    }
    let cx = corners.iter().map(|c| c.x).sum::<f32>() / 4.0;
    let cy = corners.iter().map(|c| c.y).sum::<f32>() / 4.0;
    corners.sort_by_key(|c| FloatOrd((c.y - cy).atan2(c.x - cx)));
    let start = (0..4)
        .min_by_key(|&i| (FloatOrd(corners[i].x + corners[i].y), FloatOrd(corners[i].y)))?;
    corners.rotate_left(start);
    let point = |c: &Coord<f32>| Point(c.x.round() as i32, c.y.round() as i32);
    Some([
        point(&corners[0]),
        point(&corners[1]),
        point(&corners[2]),
        point(&corners[3]),
    ])
}

/// Model input size and the factors that map model space back to the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub factor_x: f32,
    pub factor_y: f32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Fits `image` inside `max_side` keeping aspect ratio, then floors both
/// sides to a multiple of 32 as the detector requires.
pub fn detector_scale(image: &DynamicImage, max_side: u32) -> Scale {
    let (width, height) = (image.width(), image.height());
    let aspect = width as f32 / height as f32;
    let (w, h) = if aspect >= 1.0 {
        let w = width.min(max_side);
        (w, (w as f32 / aspect) as u32)
    } else {
        let h = height.min(max_side);
        ((h as f32 * aspect) as u32, h)
    };
    let target_width = (w / 32 * 32).max(32);
    let target_height = (h / 32 * 32).max(32);
    log::debug!(
        "Detector input {width}x{height} -> {target_width}x{target_height}"
    );
    Scale {
        factor_x: width as f32 / target_width as f32,
        factor_y: height as f32 / target_height as f32,
        target_width,
        target_height,
    }
}

/// Axis-aligned crop around `region`, clamped to the image.
pub(crate) fn crop_region(image: &DynamicImage, region: &Polygon<f32>) -> Option<DynamicImage> {
    let rect = region.bounding_rect()?;
    let x = (rect.min().x.max(0.0) as u32).min(image.width());
    let y = (rect.min().y.max(0.0) as u32).min(image.height());
    let width = (rect.width() as u32).min(image.width() - x);
    let height = (rect.height() as u32).min(image.height() - y);
    if width == 0 || height == 0 {
        return None;
    }
    log::trace!("Cropping {width}x{height} at ({x}, {y})");
    Some(image.crop_imm(x, y, width, height))
}
