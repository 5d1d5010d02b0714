//! Lit-stroke detection between calibrated anchor points.

use std::collections::BTreeSet;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::glyph::{Catalog, StrokePair, anchor, canonicalize, match_stroke_set};
use crate::vision::preprocess::value_channel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeParams {
    /// Points sampled along each candidate segment, endpoints included.
    pub samples: usize,
    /// Minimum HSV value for a sample to count as lit.
    pub value_threshold: u8,
    /// Fraction of lit samples needed to call a segment drawn.
    pub lit_ratio: f64,
}

impl Default for StrokeParams {
    fn default() -> Self {
        Self {
            samples: 100,
            value_threshold: 200,
            lit_ratio: 0.7,
        }
    }
}

/// Evenly spaced points from `start` to `end`, truncated to pixel coordinates.
pub fn line_samples(start: (i32, i32), end: (i32, i32), count: usize) -> Vec<(i32, i32)> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..count)
            .map(|i| {
                let t = i as f64 / (count - 1) as f64;
                let x = start.0 as f64 + (end.0 - start.0) as f64 * t;
                let y = start.1 as f64 + (end.1 - start.1) as f64 * t;
                (x as i32, y as i32)
            })
            .collect(),
    }
}

/// Whether enough of the segment is bright. Samples outside the frame are dark.
pub fn is_path_activated(
    img: &RgbaImage,
    start: (i32, i32),
    end: (i32, i32),
    params: &StrokeParams,
) -> bool {
    let samples = line_samples(start, end, params.samples);
    if samples.is_empty() {
        return false;
    }

    let (width, height) = img.dimensions();
    let lit = samples
        .iter()
        .filter(|&&(x, y)| {
            x >= 0
                && y >= 0
                && (x as u32) < width
                && (y as u32) < height
                && value_channel(img.get_pixel(x as u32, y as u32)) > params.value_threshold
        })
        .count();

    lit as f64 / samples.len() as f64 > params.lit_ratio
}

/// Every legal anchor pair whose segment is lit, in canonical pair order.
pub fn detect_lines(img: &RgbaImage, calibration: &Calibration, params: &StrokeParams) -> Vec<StrokePair> {
    anchor::legal_pairs()
        .into_iter()
        .filter(|pair| {
            is_path_activated(
                img,
                calibration.point(pair.lo()),
                calibration.point(pair.hi()),
                params,
            )
        })
        .collect()
}

/// Lit strokes reduced to canonical form.
pub fn detect_activated_strokes(
    img: &RgbaImage,
    calibration: &Calibration,
    params: &StrokeParams,
) -> BTreeSet<StrokePair> {
    canonicalize(detect_lines(img, calibration, params))
}

/// All catalog glyphs matching the strokes lit in `img`.
pub fn detect_glyphs(
    img: &RgbaImage,
    calibration: &Calibration,
    params: &StrokeParams,
    catalog: &Catalog,
    min_ratio: f64,
) -> Vec<String> {
    let strokes = detect_activated_strokes(img, calibration, params);
    match_stroke_set(catalog, &strokes, min_ratio)
}
