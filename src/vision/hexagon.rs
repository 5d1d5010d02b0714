//! Indicator hexagons in the top band of the frame.
//!
//! Each hexagon is one slot of the sequence being drawn. The slot that is
//! currently being drawn is rendered in a different colour from the rest.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::vision::color::{DisplayColor, find_most_distinct_color_index, hue_to_color};
use crate::vision::contours::{approx_poly_dp, arc_length, find_contours};
use crate::vision::preprocess::{crop_top_band, rgb_to_hsv, threshold_binary, to_grayscale};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexagonParams {
    /// The band searched is the top `1/top_band_divisor` of the frame.
    pub top_band_divisor: u32,
    pub binary_threshold: u8,
    /// Polygon approximation tolerance as a fraction of the contour length.
    pub approx_epsilon_ratio: f64,
    pub edge_tolerance: f64,
    pub angle_tolerance_deg: f64,
    pub merge_distance: f64,
}

impl Default for HexagonParams {
    fn default() -> Self {
        Self {
            top_band_divisor: 5,
            binary_threshold: 128,
            approx_epsilon_ratio: 0.02,
            edge_tolerance: 0.15,
            angle_tolerance_deg: 15.0,
            merge_distance: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hexagon {
    pub center: (f64, f64),
    pub vertices: Vec<(i32, i32)>,
    pub color: DisplayColor,
}

/// Result of reading the indicator band of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorReading {
    /// Hexagons ordered left to right.
    pub hexagons: Vec<Hexagon>,
    /// Position of the differently coloured hexagon, when one stands out.
    pub active_slot: Option<usize>,
}

impl IndicatorReading {
    pub fn count(&self) -> usize {
        self.hexagons.len()
    }
}

/// Reads the slot indicators from a full frame.
pub fn read_indicator_band(frame: &RgbaImage, params: &HexagonParams) -> IndicatorReading {
    let band = crop_top_band(frame, params.top_band_divisor);
    let mut hexagons = detect_hexagons(&band, params);
    hexagons.sort_by(|a, b| a.center.0.total_cmp(&b.center.0));

    let colors: Vec<DisplayColor> = hexagons.iter().map(|h| h.color).collect();
    let active_slot = find_most_distinct_color_index(&colors);

    IndicatorReading {
        hexagons,
        active_slot,
    }
}

/// Finds regular hexagons in an image region.
pub fn detect_hexagons(region: &RgbaImage, params: &HexagonParams) -> Vec<Hexagon> {
    let binary = threshold_binary(&to_grayscale(region), params.binary_threshold, 255);

    let mut hexagons = Vec::new();
    for contour in find_contours(&binary) {
        if contour.len() < 6 {
            continue;
        }
        let epsilon = params.approx_epsilon_ratio * arc_length(&contour, true);
        let poly = approx_poly_dp(&contour, epsilon, true);
        if !is_regular_hexagon(&poly, params.edge_tolerance, params.angle_tolerance_deg) {
            continue;
        }

        let n = poly.len() as f64;
        let cx = poly.iter().map(|p| p.0 as f64).sum::<f64>() / n;
        let cy = poly.iter().map(|p| p.1 as f64).sum::<f64>() / n;
        let color = mean_polygon_color(region, &poly);

        hexagons.push(Hexagon {
            center: (cx, cy),
            vertices: poly,
            color,
        });
    }

    filter_overlapping_hexagons(hexagons, params.merge_distance)
}

/// Six vertices, every edge within `edge_tolerance` of the mean edge length
/// and every interior angle within `angle_tolerance_deg` of 120 degrees.
pub fn is_regular_hexagon(poly: &[(i32, i32)], edge_tolerance: f64, angle_tolerance_deg: f64) -> bool {
    if poly.len() != 6 {
        return false;
    }

    let edge = |i: usize| {
        let a = poly[i];
        let b = poly[(i + 1) % 6];
        (((b.0 - a.0) as f64).powi(2) + ((b.1 - a.1) as f64).powi(2)).sqrt()
    };
    let edges: Vec<f64> = (0..6).map(edge).collect();
    let mean = edges.iter().sum::<f64>() / 6.0;
    if mean == 0.0 || edges.iter().any(|e| (e - mean).abs() > mean * edge_tolerance) {
        return false;
    }

    (0..6).all(|i| {
        let prev = poly[(i + 5) % 6];
        let cur = poly[i];
        let next = poly[(i + 1) % 6];
        let v1 = ((prev.0 - cur.0) as f64, (prev.1 - cur.1) as f64);
        let v2 = ((next.0 - cur.0) as f64, (next.1 - cur.1) as f64);
        let norms = (v1.0.hypot(v1.1)) * (v2.0.hypot(v2.1));
        if norms == 0.0 {
            return false;
        }
        let cos = ((v1.0 * v2.0 + v1.1 * v2.1) / norms).clamp(-1.0, 1.0);
        (cos.acos().to_degrees() - 120.0).abs() <= angle_tolerance_deg
    })
}

/// Keeps the first hexagon of every cluster whose centres lie within
/// `min_distance` of an already kept one.
pub fn filter_overlapping_hexagons(hexagons: Vec<Hexagon>, min_distance: f64) -> Vec<Hexagon> {
    let mut kept: Vec<Hexagon> = Vec::with_capacity(hexagons.len());
    for hexagon in hexagons {
        let overlaps = kept.iter().any(|k| {
            let dx = k.center.0 - hexagon.center.0;
            let dy = k.center.1 - hexagon.center.1;
            dx.hypot(dy) < min_distance
        });
        if !overlaps {
            kept.push(hexagon);
        }
    }
    kept
}

fn point_in_polygon(x: f64, y: f64, poly: &[(i32, i32)]) -> bool {
    let mut inside = false;
    let n = poly.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (poly[i].0 as f64, poly[i].1 as f64);
        let (xj, yj) = (poly[j].0 as f64, poly[j].1 as f64);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Mean HSV over the filled polygon, converted back to a display colour.
fn mean_polygon_color(img: &RgbaImage, poly: &[(i32, i32)]) -> DisplayColor {
    let (width, height) = img.dimensions();
    let min_x = poly.iter().map(|p| p.0).min().unwrap_or(0).max(0);
    let max_x = poly.iter().map(|p| p.0).max().unwrap_or(0).min(width as i32 - 1);
    let min_y = poly.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = poly.iter().map(|p| p.1).max().unwrap_or(0).min(height as i32 - 1);

    let mut sums = [0f64; 3];
    let mut count = 0usize;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if !point_in_polygon(x as f64 + 0.5, y as f64 + 0.5, poly) {
                continue;
            }
            let px = img.get_pixel(x as u32, y as u32);
            let hsv = rgb_to_hsv(px[0], px[1], px[2]);
            for (sum, channel) in sums.iter_mut().zip(hsv) {
                *sum += channel as f64;
            }
            count += 1;
        }
    }

    if count == 0 {
        return DisplayColor::new(0.0, 0.0, 0.0);
    }
    let mean = |c: usize| (sums[c] / count as f64) as i32;
    hue_to_color(mean(0), mean(1), mean(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::preview::{fill_polygon, hexagon_vertices};
    use image::Rgba;

    const BACKGROUND: Rgba<u8> = Rgba([20, 20, 30, 255]);
    const RIM: Rgba<u8> = Rgba([250, 250, 250, 255]);
    const IDLE: Rgba<u8> = Rgba([38, 38, 36, 255]);
    const ACTIVE: Rgba<u8> = Rgba([40, 100, 220, 255]);

    fn draw_slot(img: &mut RgbaImage, center: (f64, f64), fill: Rgba<u8>) {
        fill_polygon(img, &hexagon_vertices(center, 30.0), RIM);
        fill_polygon(img, &hexagon_vertices(center, 24.0), fill);
    }

    fn frame_with_slots(count: usize, active: Option<usize>) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(600, 500, BACKGROUND);
        for i in 0..count {
            let fill = if Some(i) == active { ACTIVE } else { IDLE };
            draw_slot(&mut img, (100.0 + 100.0 * i as f64, 50.0), fill);
        }
        img
    }

    #[test]
    fn test_regular_hexagon_shape() {
        let poly: Vec<(i32, i32)> = hexagon_vertices((50.0, 50.0), 30.0)
            .into_iter()
            .map(|(x, y)| (x.round() as i32, y.round() as i32))
            .collect();
        assert!(is_regular_hexagon(&poly, 0.15, 15.0));

        let stretched: Vec<(i32, i32)> = poly.iter().map(|&(x, y)| (x * 2, y)).collect();
        assert!(!is_regular_hexagon(&stretched, 0.15, 15.0));
        assert!(!is_regular_hexagon(&poly[..5], 0.15, 15.0));
    }

    #[test]
    fn test_reads_slots_and_active_one() {
        let frame = frame_with_slots(4, Some(2));
        let reading = read_indicator_band(&frame, &HexagonParams::default());

        assert_eq!(reading.count(), 4, "{reading:?}");
        assert_eq!(reading.active_slot, Some(2));
        for (i, hex) in reading.hexagons.iter().enumerate() {
            let expected_x = 100.0 + 100.0 * i as f64;
            assert!((hex.center.0 - expected_x).abs() < 3.0);
            assert!((hex.center.1 - 50.0).abs() < 3.0);
        }
    }

    #[test]
    fn test_no_active_slot_when_all_idle() {
        let frame = frame_with_slots(3, None);
        let reading = read_indicator_band(&frame, &HexagonParams::default());

        assert_eq!(reading.count(), 3);
        assert_eq!(reading.active_slot, None);
    }

    #[test]
    fn test_hexagons_below_band_are_ignored() {
        let mut frame = RgbaImage::from_pixel(600, 500, BACKGROUND);
        draw_slot(&mut frame, (300.0, 300.0), IDLE);

        let reading = read_indicator_band(&frame, &HexagonParams::default());
        assert_eq!(reading.count(), 0);
    }

    #[test]
    fn test_squares_are_not_hexagons() {
        let mut region = RgbaImage::from_pixel(200, 100, BACKGROUND);
        fill_polygon(
            &mut region,
            &[(50.0, 20.0), (110.0, 20.0), (110.0, 80.0), (50.0, 80.0)],
            RIM,
        );
        assert!(detect_hexagons(&region, &HexagonParams::default()).is_empty());
    }

    #[test]
    fn test_filter_overlapping_keeps_first() {
        let hex = |x: f64, red: f32| Hexagon {
            center: (x, 10.0),
            vertices: Vec::new(),
            color: DisplayColor::new(red, 0.0, 0.0),
        };
        let kept = filter_overlapping_hexagons(
            vec![hex(0.0, 0.1), hex(5.0, 0.2), hex(50.0, 0.3), hex(60.0, 0.4)],
            20.0,
        );

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].color.red, 0.1);
        assert_eq!(kept[1].color.red, 0.3);
    }
}
