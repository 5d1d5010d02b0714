//! Single-frame classification.
//!
//! A frame is read twice, concurrently: once for the indicator hexagons above
//! the panel and once for the glyph drawn between the anchors. The two results
//! are joined into one `FrameClassification`.

use image::RgbaImage;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::automation::config::RecorderConfig;
use crate::calibration::Calibration;
use crate::glyph::{Catalog, best_match};
use crate::vision::hexagon::{HexagonParams, read_indicator_band};
use crate::vision::strokes::{StrokeParams, detect_activated_strokes};

/// What one frame shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameClassification {
    pub hexagon_count: usize,
    pub symbol: Option<String>,
    pub slot: Option<usize>,
}

/// Classifies frames against a fixed calibration and catalog.
#[derive(Clone)]
pub struct Classifier {
    catalog: Arc<Catalog>,
    calibration: Option<Arc<Calibration>>,
    hexagon_params: HexagonParams,
    stroke_params: StrokeParams,
    symbol_ratio: f64,
}

impl Classifier {
    pub fn new(catalog: Arc<Catalog>, calibration: Option<Arc<Calibration>>, config: &RecorderConfig) -> Self {
        Self {
            catalog,
            calibration,
            hexagon_params: config.hexagon_detection.clone(),
            stroke_params: config.stroke_detection.clone(),
            symbol_ratio: config.matching.symbol_ratio,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Runs both analyses in parallel and joins them.
    pub fn classify_frame(&self, frame: &RgbaImage) -> FrameClassification {
        let ((hexagon_count, slot), symbol) = thread::scope(|scope| {
            let hexagons = scope.spawn(|| self.read_slots(frame));
            let glyph = scope.spawn(|| self.read_symbol(frame));
            let hexagons = hexagons.join().unwrap_or_else(|_| {
                crate::log("Hexagon analysis panicked, treating frame as empty");
                (0, None)
            });
            let glyph = glyph.join().unwrap_or_else(|_| {
                crate::log("Glyph analysis panicked, treating frame as empty");
                None
            });
            (hexagons, glyph)
        });

        FrameClassification {
            hexagon_count,
            symbol,
            slot,
        }
    }

    /// Hexagon count and the active slot, if one stands out.
    pub fn read_slots(&self, frame: &RgbaImage) -> (usize, Option<usize>) {
        let start = Instant::now();
        let reading = read_indicator_band(frame, &self.hexagon_params);
        crate::log(&format!(
            "Hexagons: {} found, active slot {:?} ({:.1}ms)",
            reading.count(),
            reading.active_slot,
            start.elapsed().as_secs_f64() * 1000.0
        ));
        (reading.count(), reading.active_slot)
    }

    /// The glyph drawn on the panel. Always `None` without a calibration.
    pub fn read_symbol(&self, frame: &RgbaImage) -> Option<String> {
        let calibration = self.calibration.as_deref()?;
        let start = Instant::now();
        let strokes = detect_activated_strokes(frame, calibration, &self.stroke_params);
        let symbol = best_match(&self.catalog, &strokes, self.symbol_ratio);
        crate::log(&format!(
            "Glyph: {} stroke(s), match {:?} ({:.1}ms)",
            strokes.len(),
            symbol,
            start.elapsed().as_secs_f64() * 1000.0
        ));
        symbol
    }
}
