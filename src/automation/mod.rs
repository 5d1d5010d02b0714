//! Glyph capture automation.
//!
//! This module provides:
//! - Recorder configuration loaded from config.json
//! - Per-frame classification (indicator hexagons plus drawn glyph)
//! - The capture session state machine
//! - A background runner polling a frame source on a fixed interval

pub mod classify;
pub mod config;
pub mod queue;
pub mod runner;
pub mod state;

pub use classify::Classifier;
pub use config::{RecorderConfig, get_config, init_config, save_config};
pub use runner::{AutoCapture, LogListener};
