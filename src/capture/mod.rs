//! Frame acquisition.
//!
//! This module provides:
//! - The `FrameSource` trait the capture session pulls frames from
//! - A directory-backed source replaying saved screenshots (`DirectoryFrameSource`)
//! - Single image loading (`load_frame`)

pub mod frames;

use image::RgbaImage;

use crate::error::CaptureError;

pub use frames::{DirectoryFrameSource, load_frame};

/// Supplies the current screen content, one frame per call.
///
/// Called concurrently from overlapping capture ticks.
pub trait FrameSource: Send + Sync {
    fn capture_frame(&self) -> Result<RgbaImage, CaptureError>;
}

impl<F> FrameSource for F
where
    F: Fn() -> Result<RgbaImage, CaptureError> + Send + Sync,
{
    fn capture_frame(&self) -> Result<RgbaImage, CaptureError> {
        self()
    }
}
