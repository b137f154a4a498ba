//! Session configuration: window size, keyboard geometry, viewport and palette.
//!
//! Values come from `Default`, optionally overlaid by a JSON file, then by
//! command-line flags in the binary. `validate` runs once at setup so that
//! per-frame code never sees a degenerate window.

use crate::error::ConfigError;
use crate::keyboard::KeyRange;
use crate::types::ColorToken;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Target drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        // 52 white keys × 22 px
        Self { width: 1144.0, height: 300.0 }
    }
}

/// Note rectangle widths and colors, split by key color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteStyle {
    pub white_note_width: f64,
    pub black_note_width: f64,
    pub white_note_color: String,
    pub black_note_color: String,
    pub background_color: String,
}

impl Default for NoteStyle {
    fn default() -> Self {
        Self {
            white_note_width: 14.0,
            black_note_width: 10.0,
            white_note_color: "#03d9e5".into(),
            black_note_color: "#00abb4".into(),
            background_color: "#0E2F44".into(),
        }
    }
}

impl NoteStyle {
    pub fn width(&self, is_white: bool) -> f64 {
        if is_white {
            self.white_note_width
        } else {
            self.black_note_width
        }
    }

    pub fn color(&self, token: ColorToken) -> &str {
        match token {
            ColorToken::WhiteKeyNote => &self.white_note_color,
            ColorToken::BlackKeyNote => &self.black_note_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterfallConfig {
    /// Seconds of lookback and of lookahead around the playback time.
    pub window_size_secs: f64,
    /// Horizontal pixels per white key.
    pub key_width: f64,
    pub key_range: KeyRange,
    pub viewport: Viewport,
    pub style: NoteStyle,
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            window_size_secs: 5.0,
            key_width: 22.0,
            key_range: KeyRange::default(),
            viewport: Viewport::default(),
            style: NoteStyle::default(),
        }
    }
}

impl WaterfallConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.window_size_secs.is_finite() && self.window_size_secs > 0.0) {
            return Err(ConfigError::WindowSize(self.window_size_secs));
        }
        if !(self.key_width.is_finite() && self.key_width > 0.0) {
            return Err(ConfigError::KeyWidth(self.key_width));
        }
        let Viewport { width, height } = self.viewport;
        if !(width > 0.0 && height > 0.0) {
            return Err(ConfigError::Viewport { width, height });
        }
        if !self.key_range.is_valid() {
            return Err(ConfigError::KeyRange {
                lowest: self.key_range.lowest,
                highest: self.key_range.highest,
            });
        }
        Ok(())
    }
}
