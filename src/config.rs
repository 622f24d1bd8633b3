use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::zoom::{DEFAULT_ZOOM_TABLE, MIN_RASTER_WIDTH, ZOOM_NEUTRAL, ZoomRatio};

/// Largest texture edge ever requested, whatever the device claims to
/// support. Some drivers report limits they cannot honour.
pub const TEXTURE_SIZE_CAP: u32 = 4096;

/// Last Unicode code point.
const MAX_UNICODE: u32 = 0x10FFFF;

// ── ConfigError ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config validation failed:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

// ── GfxConfig ─────────────────────────────────────────────────────────────────

/// Startup configuration for the sprite and glyph pipeline.
///
/// Every field has a default, so a JSON file only needs the keys it wants to
/// override:
///
/// ```json
/// { "base_raster_width": 128, "max_sheets": 64 }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GfxConfig {
    /// Unzoomed tile (raster cell) width in pixels. Also the shelf row height
    /// and the oversized-sprite threshold of the atlas packer.
    pub base_raster_width: u32,
    /// Edge length of every shared texture sheet.
    pub max_texture_size: u32,
    /// Number of shared sheet slots. Running out is fatal.
    pub max_sheets: usize,
    /// Hard maximum of registered images. Running out is fatal.
    pub max_images: usize,
    /// Zoom ratios, indexed by zoom level.
    pub zoom_table: Vec<ZoomRatio>,
    /// Zoom level active at startup.
    pub zoom_level: usize,
    /// Edge length of one glyph atlas cell.
    pub glyph_cell_size: u32,
    /// Glyph atlas cells per row.
    pub glyph_cells_per_row: u32,
    /// Highest code point asked of a font backend.
    pub max_code_point: u32,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            base_raster_width:   64,
            max_texture_size:    TEXTURE_SIZE_CAP,
            max_sheets:          256,
            max_images:          0xFFFE,
            zoom_table:          DEFAULT_ZOOM_TABLE.to_vec(),
            zoom_level:          ZOOM_NEUTRAL,
            glyph_cell_size:     32,
            glyph_cells_per_row: 32,
            max_code_point:      0xFFFF,
        }
    }
}

impl GfxConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.base_raster_width < MIN_RASTER_WIDTH {
            errors.push(format!(
                "base_raster_width {} is below the {MIN_RASTER_WIDTH} px minimum",
                self.base_raster_width
            ));
        }
        if self.max_texture_size == 0 {
            errors.push("max_texture_size must be positive".to_string());
        } else if self.base_raster_width > self.max_texture_size {
            errors.push(format!(
                "base_raster_width {} exceeds max_texture_size {}",
                self.base_raster_width, self.max_texture_size
            ));
        }
        if self.max_sheets == 0 {
            errors.push("max_sheets must be positive".to_string());
        }
        if self.max_images == 0 {
            errors.push("max_images must be positive".to_string());
        }
        if self.zoom_table.is_empty() {
            errors.push("zoom_table must not be empty".to_string());
        }
        for (level, ratio) in self.zoom_table.iter().enumerate() {
            if ratio.num == 0 || ratio.den == 0 {
                errors.push(format!("zoom_table[{level}] has a zero term ({}/{})", ratio.num, ratio.den));
            }
        }
        if self.zoom_level >= self.zoom_table.len() {
            errors.push(format!(
                "zoom_level {} is outside zoom_table (len {})",
                self.zoom_level,
                self.zoom_table.len()
            ));
        }
        if self.glyph_cell_size == 0 || self.glyph_cells_per_row == 0 {
            errors.push("glyph atlas cell size and cells per row must be positive".to_string());
        }
        if self.max_code_point < 0x7F {
            errors.push(format!("max_code_point {:#x} does not cover ASCII", self.max_code_point));
        } else if self.max_code_point > MAX_UNICODE {
            errors.push(format!(
                "max_code_point {:#x} is past the last Unicode code point {MAX_UNICODE:#x}",
                self.max_code_point
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(ConfigError::Validation(errors)) }
    }

    /// Cap `max_texture_size` at the device limit and at [`TEXTURE_SIZE_CAP`].
    pub fn clamp_texture_size(&mut self, device_limit: u32) {
        let capped = self.max_texture_size.min(device_limit).min(TEXTURE_SIZE_CAP);
        if capped != self.max_texture_size {
            log::info!("max texture size clamped from {} to {capped}", self.max_texture_size);
            self.max_texture_size = capped;
        }
    }

    /// Pixel width of the glyph atlas texture.
    pub fn glyph_atlas_width(&self) -> u32 {
        self.glyph_cell_size * self.glyph_cells_per_row
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
