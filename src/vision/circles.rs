//! Gradient Hough circle detection for the eleven anchor points.

use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::vision::preprocess::{gaussian_blur, to_grayscale};

/// Hough detector parameters.
///
/// `dp` is the inverse accumulator resolution, `param1` the edge gradient
/// threshold and `param2` the minimum number of votes for a centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    pub dp: f64,
    pub min_dist: f64,
    pub param1: f64,
    pub param2: f64,
    pub min_radius: u32,
    pub max_radius: u32,
}

impl Default for CircleParams {
    fn default() -> Self {
        Self {
            dp: 1.2,
            min_dist: 30.0,
            param1: 50.0,
            param2: 30.0,
            min_radius: 25,
            max_radius: 30,
        }
    }
}

struct EdgePoint {
    x: i32,
    y: i32,
    dx: f64,
    dy: f64,
}

/// Finds circle centres, sorted by `y` and then `x`.
pub fn detect_circles(img: &RgbaImage, params: &CircleParams) -> Vec<(i32, i32)> {
    let gray = gaussian_blur(&to_grayscale(img), 9, 2.0);
    let edges = edge_points(&gray, params.param1);

    let dp = params.dp.max(1.0);
    let (width, height) = gray.dimensions();
    let acc_w = (width as f64 / dp).ceil() as usize + 1;
    let acc_h = (height as f64 / dp).ceil() as usize + 1;
    let mut accumulator = vec![0u32; acc_w * acc_h];

    let min_r = params.min_radius.min(params.max_radius);
    let max_r = params.max_radius.max(params.min_radius);

    for edge in &edges {
        for sign in [-1.0, 1.0] {
            for r in min_r..=max_r {
                let cx = edge.x as f64 + sign * r as f64 * edge.dx;
                let cy = edge.y as f64 + sign * r as f64 * edge.dy;
                if cx < 0.0 || cy < 0.0 {
                    continue;
                }
                let ax = (cx / dp).round() as usize;
                let ay = (cy / dp).round() as usize;
                if ax < acc_w && ay < acc_h {
                    accumulator[ay * acc_w + ax] += 1;
                }
            }
        }
    }

    let mut candidates = Vec::new();
    for ay in 0..acc_h {
        for ax in 0..acc_w {
            let votes = accumulator[ay * acc_w + ax];
            if (votes as f64) < params.param2 {
                continue;
            }
            let is_peak = neighbours(ax, ay, acc_w, acc_h)
                .all(|(nx, ny)| accumulator[ny * acc_w + nx] <= votes);
            if is_peak {
                candidates.push((votes, ax, ay));
            }
        }
    }
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.2.cmp(&b.2)).then(a.1.cmp(&b.1)));

    let mut centers: Vec<(f64, f64)> = Vec::new();
    for (_, ax, ay) in candidates {
        let cx = ax as f64 * dp;
        let cy = ay as f64 * dp;
        let too_close = centers
            .iter()
            .any(|(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt() < params.min_dist);
        if !too_close {
            centers.push((cx, cy));
        }
    }
    let centers = centers.into_iter().map(|(cx, cy)| {
        let (ax, ay) = refine_peak(&accumulator, acc_w, acc_h, cx / dp, cy / dp);
        (ax * dp, ay * dp)
    });

    let mut points: Vec<(i32, i32)> = centers
        .map(|(x, y)| (x.round() as i32, y.round() as i32))
        .collect();
    points.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    points
}

/// Vote-weighted centroid around a peak, in accumulator cells.
fn refine_peak(accumulator: &[u32], w: usize, h: usize, px: f64, py: f64) -> (f64, f64) {
    const WINDOW: i64 = 3;
    let (px, py) = (px.round() as i64, py.round() as i64);
    let mut total = 0.0;
    let mut sx = 0.0;
    let mut sy = 0.0;
    for y in (py - WINDOW).max(0)..=(py + WINDOW).min(h as i64 - 1) {
        for x in (px - WINDOW).max(0)..=(px + WINDOW).min(w as i64 - 1) {
            let votes = accumulator[y as usize * w + x as usize] as f64;
            total += votes;
            sx += votes * x as f64;
            sy += votes * y as f64;
        }
    }
    if total == 0.0 {
        (px as f64, py as f64)
    } else {
        (sx / total, sy / total)
    }
}

fn neighbours(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    (-1i64..=1)
        .flat_map(|dy| (-1i64..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            (nx >= 0 && ny >= 0 && (nx as usize) < w && (ny as usize) < h)
                .then_some((nx as usize, ny as usize))
        })
}

/// Sobel edges above `threshold`, thinned by non-maximum suppression.
fn edge_points(gray: &GrayImage, threshold: f64) -> Vec<EdgePoint> {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return Vec::new();
    }
    let w = width as usize;
    let h = height as usize;
    let px = |x: usize, y: usize| gray.get_pixel(x as u32, y as u32)[0] as f64;

    let mut gx = vec![0f64; w * h];
    let mut gy = vec![0f64; w * h];
    let mut mag = vec![0f64; w * h];

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let sx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let sy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            let i = y * w + x;
            gx[i] = sx;
            gy[i] = sy;
            mag[i] = sx.abs() + sy.abs();
        }
    }

    let mut edges = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let m = mag[i];
            if m <= threshold {
                continue;
            }

            // Compare against the two neighbours along the gradient direction.
            let angle = gy[i].atan2(gx[i]).to_degrees().rem_euclid(180.0);
            let (ox, oy): (i64, i64) = if !(22.5..157.5).contains(&angle) {
                (1, 0)
            } else if angle < 67.5 {
                (1, 1)
            } else if angle < 112.5 {
                (0, 1)
            } else {
                (-1, 1)
            };
            let a = mag[((y as i64 + oy) as usize) * w + (x as i64 + ox) as usize];
            let b = mag[((y as i64 - oy) as usize) * w + (x as i64 - ox) as usize];
            if m < a || m < b {
                continue;
            }

            let norm = (gx[i] * gx[i] + gy[i] * gy[i]).sqrt();
            if norm == 0.0 {
                continue;
            }
            edges.push(EdgePoint {
                x: x as i32,
                y: y as i32,
                dx: gx[i] / norm,
                dy: gy[i] / norm,
            });
        }
    }

    edges
}
