//! Image analysis on raw frames.
//!
//! Everything here works on `image` buffers:
//! - Preprocessing (grayscale, blur, threshold, HSV)
//! - Circle detection for anchor calibration
//! - Contour tracing and hexagon detection for the indicator band
//! - Stroke sampling between anchors

pub mod circles;
pub mod color;
pub mod contours;
pub mod hexagon;
pub mod preprocess;
pub mod strokes;
