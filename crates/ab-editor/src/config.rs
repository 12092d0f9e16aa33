//! Editor configuration.
//!
//! Every field has a default matching the hosted editor, so an empty JSON
//! object (or no config file at all) is a valid configuration.

use ab_core::{Color, Document};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period after the last edit before a save is sent.
    pub save_debounce_ms: u64,
    /// How long to wait for the rendering surface before giving up.
    pub surface_timeout_ms: u64,

    pub default_name: String,
    pub default_background: String,
    pub default_width: f32,
    pub default_height: f32,

    /// Where newly inserted objects are placed.
    pub insert_x: f32,
    pub insert_y: f32,
    /// Offset applied to both axes when duplicating.
    pub clone_offset: f32,
    /// Inserted images are scaled so their longer side fits this.
    pub max_image_dimension: f32,

    pub brush_color: String,
    pub brush_width: f32,
    pub eraser_width: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 500,
            surface_timeout_ms: 5000,
            default_name: Document::DEFAULT_NAME.to_string(),
            default_background: "#ffffff".into(),
            default_width: 825.0,
            default_height: 465.0,
            insert_x: 100.0,
            insert_y: 100.0,
            clone_offset: 10.0,
            max_image_dimension: 400.0,
            brush_color: "#000000".into(),
            brush_width: 5.0,
            eraser_width: 20.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn surface_timeout(&self) -> Duration {
        Duration::from_millis(self.surface_timeout_ms)
    }

    pub fn background(&self) -> Color {
        Color::from_hex(&self.default_background).unwrap_or(Color::WHITE)
    }

    pub fn brush(&self) -> Color {
        Color::from_hex(&self.brush_color).unwrap_or(Color::BLACK)
    }

    /// Dimensions used when a stored design has none worth keeping.
    pub fn fallback_dimensions(&self) -> (f32, f32) {
        (self.default_width, self.default_height)
    }
}
