//! Runtime configuration loaded from `config.json` and the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::detector::DetectorConfig;
use crate::reactions::REACTIONS_FILE;

/// Default path of the JSON configuration file.
pub const CONFIG_PATH: &str = "config.json";

/// Serial device the face controller usually enumerates as.
const FALLBACK_SERIAL_PORT: &str = "/dev/ttyACM1";

/// Baud rate of the face firmware.
const DEFAULT_SERIAL_BAUD: u32 = 9_600;

/// Strongly typed representation of `config.json`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "fallback_serial_port")]
    pub serial_port: String,
    #[serde(default = "fallback_serial_baud")]
    pub serial_baud: u32,
    #[serde(default = "fallback_wave_threshold")]
    pub wave_threshold: f32,
    #[serde(default = "fallback_gun_threshold")]
    pub gun_confidence_threshold: f32,
    #[serde(default = "fallback_target_width")]
    pub target_width: u32,
    #[serde(default = "fallback_reactions_path")]
    pub reactions_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serial_port: fallback_serial_port(),
            serial_baud: fallback_serial_baud(),
            wave_threshold: fallback_wave_threshold(),
            gun_confidence_threshold: fallback_gun_threshold(),
            target_width: fallback_target_width(),
            reactions_path: fallback_reactions_path(),
        }
    }
}

impl AppConfig {
    /// Applies `COMPANION_SERIAL_PORT` and `COMPANION_SERIAL_BAUD`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            env::var("COMPANION_SERIAL_PORT").ok(),
            env::var("COMPANION_SERIAL_BAUD").ok(),
        )
    }

    /// Replaces the serial settings with any supplied override. An
    /// unparsable baud rate is ignored with a warning.
    pub fn with_overrides(mut self, port: Option<String>, baud: Option<String>) -> Self {
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.serial_port = port;
        }
        if let Some(raw) = baud {
            match raw.trim().parse() {
                Ok(baud) => self.serial_baud = baud,
                Err(err) => warn!(value = %raw, %err, "ignoring invalid serial baud override"),
            }
        }
        self
    }

    /// Detector parameters derived from this configuration.
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            wave_threshold: self.wave_threshold,
            gun_confidence_threshold: self.gun_confidence_threshold,
            target_width: self.target_width,
            ..DetectorConfig::default()
        }
    }
}

/// Loads configuration, falling back to baked defaults when the file is
/// missing or invalid.
pub fn load_app_config(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(path = %path.display(), %err, "config parse error, using defaults");
                AppConfig::default()
            }
        },
        Err(err) => {
            warn!(path = %path.display(), %err, "config load error, using defaults");
            AppConfig::default()
        }
    }
}

/// Serial device used when the config names none.
///
/// # Details
/// Serde default for `serial_port`.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `String` - `/dev/ttyACM1`.
fn fallback_serial_port() -> String {
    FALLBACK_SERIAL_PORT.to_string()
}

/// Baud rate used when the config names none.
///
/// # Details
/// Serde default for `serial_baud`.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `u32` - 9600.
fn fallback_serial_baud() -> u32 {
    DEFAULT_SERIAL_BAUD
}

/// Wave threshold used when the config names none.
///
/// # Details
/// Serde default for `wave_threshold`, taken from [`DetectorConfig`].
///
/// # Arguments
/// None.
///
/// # Returns
/// * `f32` - 30 pixels.
fn fallback_wave_threshold() -> f32 {
    DetectorConfig::default().wave_threshold
}

/// Gun confidence threshold used when the config names none.
///
/// # Details
/// Serde default for `gun_confidence_threshold`, taken from [`DetectorConfig`].
///
/// # Arguments
/// None.
///
/// # Returns
/// * `f32` - 0.8.
fn fallback_gun_threshold() -> f32 {
    DetectorConfig::default().gun_confidence_threshold
}

/// Display width used when the config names none.
///
/// # Details
/// Serde default for `target_width`, taken from [`DetectorConfig`].
///
/// # Arguments
/// None.
///
/// # Returns
/// * `u32` - 640 pixels.
fn fallback_target_width() -> u32 {
    DetectorConfig::default().target_width
}

/// Reaction table location used when the config names none.
///
/// # Details
/// Serde default for `reactions_path`.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `PathBuf` - `reactions.json`.
fn fallback_reactions_path() -> PathBuf {
    PathBuf::from(REACTIONS_FILE)
}
