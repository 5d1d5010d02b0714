//! Recorder configuration.
//!
//! Loads settings from config.json at startup. Provides the calibrated anchor
//! positions, detector thresholds, capture timing and optional catalog
//! overrides. Every field has a default, so a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::vision::circles::CircleParams;
use crate::vision::hexagon::HexagonParams;
use crate::vision::strokes::StrokeParams;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<RecorderConfig> = OnceLock::new();

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum fraction of shared strokes for a glyph to match
    pub symbol_ratio: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            symbol_ratio: crate::glyph::DEFAULT_MATCH_RATIO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Delay between polling ticks (milliseconds)
    pub auto_interval_ms: u64,
    /// Ticks without any hexagon before an idle session gives up
    pub idle_tick_limit: u32,
    /// Ticks without a recognised glyph before a capturing session gives up
    pub busy_tick_limit: u32,
    /// Mirror log lines into a per-session file while capturing
    pub session_log: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            auto_interval_ms: 200,
            idle_tick_limit: 50,
            busy_tick_limit: 65,
            session_log: true,
        }
    }
}

/// Complete recorder configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Anchor centres `[x, y]` in anchor-id order; empty until calibrated
    pub anchors: Vec<[i32; 2]>,
    pub circle_detection: CircleParams,
    pub hexagon_detection: HexagonParams,
    pub stroke_detection: StrokeParams,
    pub matching: MatchingConfig,
    pub capture: CaptureConfig,
    /// Glyph catalog file replacing the embedded one
    pub glyph_catalog: Option<PathBuf>,
    /// Sequence catalog file replacing the embedded one
    pub sequence_catalog: Option<PathBuf>,
}

/// Loads configuration from `path`, falling back to defaults.
pub fn load_config(path: &Path) -> RecorderConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    path.display(),
                    e
                ));
            }
        }
    } else {
        crate::log("Config file not found. Using default config.");
    }

    RecorderConfig::default()
}

/// Writes the configuration as pretty JSON.
pub fn save_config(config: &RecorderConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    crate::log(&format!("Config saved to {}", path.display()));
    Ok(())
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config(path: Option<&Path>) {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::paths::get_config_path);
    let _ = CONFIG.set(load_config(&path));
}

/// Returns the global configuration, loading the default file on first use.
pub fn get_config() -> &'static RecorderConfig {
    CONFIG.get_or_init(|| load_config(&crate::paths::get_config_path()))
}
