//! Configuration types for the tackline engine.
//!
//! This module defines the tunables the engine needs from its host: the
//! pixel width of one frame (used to quantize drags), the snapping ratio,
//! and the defaults used when tracks, tacks and boards are created.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Width of one frame in pixels.
    #[serde(default = "default_frame_width")]
    pub frame_width: f64,

    /// Fraction of a frame width past which a partial drag snaps to the next frame.
    #[serde(default = "default_snap_ratio")]
    pub snap_ratio: f64,

    /// Title given to newly added tacks.
    #[serde(default = "default_tack_title")]
    pub default_tack_title: String,

    /// Span given to newly added tacks.
    #[serde(default = "default_tack_span")]
    pub default_tack_span: i64,

    /// Title given to newly added tracks.
    #[serde(default = "default_track_title")]
    pub default_track_title: String,

    /// Persisted name of a freshly seeded board.
    #[serde(default = "default_board_id")]
    pub default_board_id: String,

    /// Title of a freshly seeded board.
    #[serde(default = "default_board_title")]
    pub default_board_title: String,
}

fn default_frame_width() -> f64 {
    10.0
}

fn default_snap_ratio() -> f64 {
    0.5
}

fn default_tack_title() -> String {
    "New Tack".into()
}

fn default_tack_span() -> i64 {
    10
}

fn default_track_title() -> String {
    "New Timeline".into()
}

fn default_board_id() -> String {
    "New Score".into()
}

fn default_board_title() -> String {
    "Score".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            snap_ratio: default_snap_ratio(),
            default_tack_title: default_tack_title(),
            default_tack_span: default_tack_span(),
            default_track_title: default_track_title(),
            default_board_id: default_board_id(),
            default_board_title: default_board_title(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Self = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Check that the numeric settings describe a usable frame grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_width.is_finite() && self.frame_width > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "frame_width must be positive, got {}",
                self.frame_width
            )));
        }
        if !(self.snap_ratio > 0.0 && self.snap_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "snap_ratio must be in (0, 1], got {}",
                self.snap_ratio
            )));
        }
        if self.default_tack_span < 1 {
            return Err(ConfigError::Invalid(format!(
                "default_tack_span must be at least 1, got {}",
                self.default_tack_span
            )));
        }
        Ok(())
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Config parsed but holds unusable values.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
