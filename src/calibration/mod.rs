//! Anchor calibration and visual previews.
//!
//! A calibration maps each anchor id to its pixel centre. It is either read
//! from the config file or detected from a frame showing the empty grid.

pub mod anchors;
pub mod preview;

pub use anchors::{Calibration, calibrate_from_frame};
