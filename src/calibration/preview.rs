//! Preview rendering for calibration and detection results.
//!
//! Draws anchor crosshairs, detected strokes and indicator hexagons over a
//! frame so a calibration can be checked by eye. The same primitives are used
//! to paint synthetic frames.

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba};
use std::path::Path;

use crate::calibration::Calibration;
use crate::glyph::StrokePair;
use crate::vision::hexagon::IndicatorReading;

pub const COLOR_ANCHOR: Rgba<u8> = Rgba([255, 0, 0, 255]); // Red
pub const COLOR_STROKE: Rgba<u8> = Rgba([0, 255, 0, 255]); // Green
pub const COLOR_HEXAGON: Rgba<u8> = Rgba([0, 128, 255, 255]); // Blue
pub const COLOR_ACTIVE_SLOT: Rgba<u8> = Rgba([255, 128, 0, 255]); // Orange
pub const COLOR_EXPECTED: Rgba<u8> = Rgba([255, 0, 255, 255]); // Magenta

/// Renders the calibration, detected strokes and indicator hexagons.
pub fn render_preview(
    frame: &ImageBuffer<Rgba<u8>, Vec<u8>>,
    calibration: Option<&Calibration>,
    strokes: &[StrokePair],
    indicators: &IndicatorReading,
) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let mut img = frame.clone();

    if let Some(calibration) = calibration {
        draw_strokes(&mut img, calibration, strokes, COLOR_STROKE, 3);
        for &(x, y) in calibration.points() {
            if x >= 0 && y >= 0 {
                draw_crosshair(&mut img, x as u32, y as u32, COLOR_ANCHOR, 15);
            }
        }
    }

    for (slot, hexagon) in indicators.hexagons.iter().enumerate() {
        let xs = hexagon.vertices.iter().map(|p| p.0);
        let ys = hexagon.vertices.iter().map(|p| p.1);
        let (Some(min_x), Some(max_x)) = (xs.clone().min(), xs.max()) else {
            continue;
        };
        let (Some(min_y), Some(max_y)) = (ys.clone().min(), ys.max()) else {
            continue;
        };
        let color = if indicators.active_slot == Some(slot) {
            COLOR_ACTIVE_SLOT
        } else {
            COLOR_HEXAGON
        };
        draw_rect(
            &mut img,
            min_x.max(0) as u32,
            min_y.max(0) as u32,
            (max_x - min_x + 1).max(1) as u32,
            (max_y - min_y + 1).max(1) as u32,
            color,
            2,
        );
        // Swatch of the colour the slot was read as
        let centre = (hexagon.center.0.round() as i32, hexagon.center.1.round() as i32);
        fill_circle(&mut img, centre, 4, hexagon.color.to_rgba8());
    }

    img
}

/// Draws each stroke as a line between its calibrated anchors.
pub fn draw_strokes(
    img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    calibration: &Calibration,
    strokes: &[StrokePair],
    color: Rgba<u8>,
    thickness: u32,
) {
    for pair in strokes {
        draw_line(
            img,
            calibration.point(pair.lo()),
            calibration.point(pair.hi()),
            color,
            thickness,
        );
    }
}

/// Saves a preview image as PNG.
pub fn save_preview(img: &ImageBuffer<Rgba<u8>, Vec<u8>>, path: &Path) -> Result<()> {
    img.save(path)
        .with_context(|| format!("Failed to save preview to {}", path.display()))?;
    crate::log(&format!("Preview saved to {}", path.display()));
    Ok(())
}

/// Draws a rectangle border on an image.
pub fn draw_rect(
    img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Rgba<u8>,
    thickness: u32,
) {
    let (img_w, img_h) = img.dimensions();
    let mut put = |px: u32, py: u32| {
        if px < img_w && py < img_h {
            img.put_pixel(px, py, color);
        }
    };

    for t in 0..thickness {
        for dx in 0..w {
            put(x + dx, y + t);
            put(x + dx, (y + h.saturating_sub(1)).saturating_sub(t));
        }
        for dy in 0..h {
            put(x + t, y + dy);
            put((x + w.saturating_sub(1)).saturating_sub(t), y + dy);
        }
    }
}

/// Draws a crosshair at a point.
pub fn draw_crosshair(
    img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    x: u32,
    y: u32,
    color: Rgba<u8>,
    arm_length: u32,
) {
    let (img_w, img_h) = img.dimensions();

    for d in 0..=arm_length * 2 {
        let offset = d as i64 - arm_length as i64;
        for t in -1i64..=1 {
            let points = [
                (x as i64 + offset, y as i64 + t),
                (x as i64 + t, y as i64 + offset),
            ];
            for (px, py) in points {
                if px >= 0 && py >= 0 && (px as u32) < img_w && (py as u32) < img_h {
                    img.put_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}

/// Draws a segment `thickness` pixels wide.
pub fn draw_line(
    img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    from: (i32, i32),
    to: (i32, i32),
    color: Rgba<u8>,
    thickness: u32,
) {
    let (img_w, img_h) = img.dimensions();
    let half = thickness.max(1) as f64 / 2.0;
    let pad = half.ceil() as i32 + 1;

    let (ax, ay) = (from.0 as f64, from.1 as f64);
    let (bx, by) = (to.0 as f64, to.1 as f64);
    let len_sq = (bx - ax).powi(2) + (by - ay).powi(2);

    let min_x = (from.0.min(to.0) - pad).max(0);
    let max_x = (from.0.max(to.0) + pad).min(img_w as i32 - 1);
    let min_y = (from.1.min(to.1) - pad).max(0);
    let max_y = (from.1.max(to.1) + pad).min(img_h as i32 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (px, py) = (x as f64, y as f64);
            let t = if len_sq == 0.0 {
                0.0
            } else {
                (((px - ax) * (bx - ax) + (py - ay) * (by - ay)) / len_sq).clamp(0.0, 1.0)
            };
            let (cx, cy) = (ax + t * (bx - ax), ay + t * (by - ay));
            if (px - cx).hypot(py - cy) <= half {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Fills a polygon, testing pixel centres against its edges.
#[cfg(test)]
pub fn fill_polygon(img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>, vertices: &[(f64, f64)], color: Rgba<u8>) {
    if vertices.len() < 3 {
        return;
    }
    let (img_w, img_h) = img.dimensions();
    let min_x = vertices.iter().map(|v| v.0).fold(f64::MAX, f64::min).floor().max(0.0) as u32;
    let max_x = vertices.iter().map(|v| v.0).fold(f64::MIN, f64::max).ceil().max(0.0) as u32;
    let min_y = vertices.iter().map(|v| v.1).fold(f64::MAX, f64::min).floor().max(0.0) as u32;
    let max_y = vertices.iter().map(|v| v.1).fold(f64::MIN, f64::max).ceil().max(0.0) as u32;

    for y in min_y..=max_y.min(img_h.saturating_sub(1)) {
        for x in min_x..=max_x.min(img_w.saturating_sub(1)) {
            let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
            let mut inside = false;
            let mut j = vertices.len() - 1;
            for i in 0..vertices.len() {
                let (xi, yi) = vertices[i];
                let (xj, yj) = vertices[j];
                if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                    inside = !inside;
                }
                j = i;
            }
            if inside {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Fills a disc.
pub fn fill_circle(img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>, center: (i32, i32), radius: i32, color: Rgba<u8>) {
    let (img_w, img_h) = img.dimensions();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (x, y) = (center.0 + dx, center.1 + dy);
            if x >= 0 && y >= 0 && (x as u32) < img_w && (y as u32) < img_h {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Pointy-top hexagon vertices, clockwise from the top.
#[cfg(test)]
pub fn hexagon_vertices(center: (f64, f64), radius: f64) -> Vec<(f64, f64)> {
    (0..6)
        .map(|i| {
            let angle = (-90.0 + 60.0 * i as f64).to_radians();
            (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
        })
        .collect()
}

/// Paints a glyph's stroke path between the calibrated anchors.
#[cfg(test)]
pub fn draw_glyph(
    img: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    calibration: &Calibration,
    path: &str,
) -> Result<()> {
    let pairs = crate::glyph::anchor::parse_stroke_path(path)?;
    draw_strokes(img, calibration, &pairs, Rgba([255, 255, 255, 255]), 6);
    Ok(())
}

/// Anchor layout used by the synthetic frames in tests: 400x500, centre at (200, 250).
#[cfg(test)]
pub fn test_calibration() -> Calibration {
    Calibration::new(&[
        (200, 50),
        (60, 130),
        (340, 130),
        (130, 190),
        (270, 190),
        (200, 250),
        (130, 310),
        (270, 310),
        (60, 370),
        (340, 370),
        (200, 450),
    ])
    .expect("eleven anchors")
}
