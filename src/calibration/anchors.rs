//! Calibrated anchor positions.

use image::RgbaImage;

use crate::error::ConfigError;
use crate::glyph::{ANCHOR_COUNT, AnchorPoint};
use crate::vision::circles::{CircleParams, detect_circles};

/// Pixel positions of the eleven anchors, indexed by [`AnchorPoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    points: [(i32, i32); ANCHOR_COUNT],
}

impl Calibration {
    /// Takes anchor centres in anchor-id order. Exactly eleven are required.
    pub fn new(points: &[(i32, i32)]) -> Result<Self, ConfigError> {
        let points: [(i32, i32); ANCHOR_COUNT] = points
            .try_into()
            .map_err(|_| ConfigError::InvalidCalibration {
                found: points.len(),
            })?;
        Ok(Self { points })
    }

    /// Reads the `[[x, y], ...]` form stored in the config file.
    pub fn from_config(anchors: &[[i32; 2]]) -> Result<Self, ConfigError> {
        let points: Vec<(i32, i32)> = anchors.iter().map(|p| (p[0], p[1])).collect();
        Self::new(&points)
    }

    pub fn to_config(&self) -> Vec<[i32; 2]> {
        self.points.iter().map(|&(x, y)| [x, y]).collect()
    }

    pub fn point(&self, anchor: AnchorPoint) -> (i32, i32) {
        self.points[anchor.index()]
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }
}

/// Detects the anchor circles in a frame and assigns them in reading order.
pub fn calibrate_from_frame(frame: &RgbaImage, params: &CircleParams) -> Result<Calibration, ConfigError> {
    let centres = detect_circles(frame, params);
    crate::log(&format!("Calibration: found {} circle(s)", centres.len()));
    for (anchor, (x, y)) in AnchorPoint::ALL.iter().zip(&centres) {
        crate::log(&format!("  anchor {} at ({}, {})", anchor, x, y));
    }
    Calibration::new(&centres)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::preview::{fill_circle, test_calibration};
    use image::Rgba;

    #[test]
    fn test_requires_eleven_points() {
        let ten = vec![(0, 0); 10];
        assert_eq!(
            Calibration::new(&ten),
            Err(ConfigError::InvalidCalibration { found: 10 })
        );
        assert!(Calibration::new(&[(0, 0); 12]).is_err());
        assert!(Calibration::new(&[(0, 0); 11]).is_ok());
    }

    #[test]
    fn test_config_round_trip() {
        let calibration = test_calibration();
        let stored = calibration.to_config();
        assert_eq!(stored[5], [200, 250]);
        assert_eq!(Calibration::from_config(&stored).unwrap(), calibration);
    }

    #[test]
    fn test_point_lookup() {
        let calibration = test_calibration();
        assert_eq!(calibration.point(AnchorPoint::P0), (200, 50));
        assert_eq!(calibration.point(AnchorPoint::Pa), (200, 450));
    }

    #[test]
    fn test_calibrate_from_synthetic_frame() {
        let expected = test_calibration();
        let mut frame = RgbaImage::from_pixel(400, 500, Rgba([15, 15, 25, 255]));
        for &centre in expected.points() {
            fill_circle(&mut frame, centre, 27, Rgba([235, 235, 235, 255]));
        }

        let calibration = calibrate_from_frame(&frame, &CircleParams::default()).unwrap();

        for anchor in AnchorPoint::ALL {
            let (x, y) = calibration.point(anchor);
            let (ex, ey) = expected.point(anchor);
            assert!(
                (x - ex).abs() <= 3 && (y - ey).abs() <= 3,
                "anchor {anchor}: got ({x}, {y}), expected ({ex}, {ey})"
            );
        }
    }

    #[test]
    fn test_calibrate_fails_without_enough_circles() {
        let mut frame = RgbaImage::from_pixel(400, 500, Rgba([15, 15, 25, 255]));
        fill_circle(&mut frame, (200, 250), 27, Rgba([235, 235, 235, 255]));

        let err = calibrate_from_frame(&frame, &CircleParams::default()).unwrap_err();
        assert_eq!(err, ConfigError::InvalidCalibration { found: 1 });
    }
}
