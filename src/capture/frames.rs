//! Screenshot files as a frame source.

use anyhow::{Context, Result};
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::FrameSource;
use crate::error::CaptureError;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Loads one image file as RGBA. An empty file is a screenshot still being
/// written and counts as no frame.
pub fn load_frame(path: &Path) -> Result<RgbaImage, CaptureError> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Err(CaptureError::NoFrame);
    }
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// Replays the images of a directory in file name order, one per call.
pub struct DirectoryFrameSource {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
}

impl DirectoryFrameSource {
    pub fn new(dir: &Path) -> Result<Self> {
        let mut frames: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        frames.sort();

        crate::log(&format!(
            "Frame source: {} image(s) in {}",
            frames.len(),
            dir.display()
        ));
        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn capture_frame(&self) -> Result<RgbaImage, CaptureError> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let path = self.frames.get(index).ok_or(CaptureError::Exhausted)?;
        load_frame(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbaImage::from_pixel(4, 4, Rgba([shade, shade, shade, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_replays_in_name_order_then_exhausts() {
        let dir = TempDir::new().unwrap();
        write_frame(dir.path(), "frame_002.png", 20);
        write_frame(dir.path(), "frame_001.png", 10);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectoryFrameSource::new(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        assert_eq!(source.capture_frame().unwrap().get_pixel(0, 0)[0], 10);
        assert_eq!(source.capture_frame().unwrap().get_pixel(0, 0)[0], 20);
        assert!(matches!(source.capture_frame(), Err(CaptureError::Exhausted)));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(DirectoryFrameSource::new(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_load_frame_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_frame(&dir.path().join("missing.png")),
            Err(CaptureError::Io(_))
        ));

        let bogus = dir.path().join("bogus.png");
        fs::write(&bogus, b"not an image").unwrap();
        assert!(matches!(load_frame(&bogus), Err(CaptureError::Decode(_))));
    }

    #[test]
    fn test_empty_file_is_no_frame() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("frame_001.png"), b"").unwrap();
        write_frame(dir.path(), "frame_002.png", 30);

        let source = DirectoryFrameSource::new(dir.path()).unwrap();
        assert!(!source.is_empty());
        assert!(matches!(source.capture_frame(), Err(CaptureError::NoFrame)));
        assert_eq!(source.capture_frame().unwrap().get_pixel(0, 0)[0], 30);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let source = DirectoryFrameSource::new(dir.path()).unwrap();
        assert!(source.is_empty());
        assert!(matches!(source.capture_frame(), Err(CaptureError::Exhausted)));
    }

    #[test]
    fn test_closure_source() {
        let source = || -> Result<RgbaImage, CaptureError> { Err(CaptureError::NoFrame) };
        assert!(matches!(source.capture_frame(), Err(CaptureError::NoFrame)));
    }
}
