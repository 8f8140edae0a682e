//! Tunable constants for the canvas engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What happens to snapshot strokes whose layer was deleted before a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Strokes of deleted layers are lost.
    #[default]
    Drop,
    /// A placeholder layer is recreated with the old id.
    Recreate,
}

/// An inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Smallest allowed zoom factor.
    pub min_scale: f64,
    /// Largest allowed zoom factor.
    pub max_scale: f64,
    /// Drawing surface size as a multiple of the viewport.
    pub surface_factor: f64,
    /// Lower bound for the surface width.
    pub min_surface_width: f64,
    /// Lower bound for the surface height.
    pub min_surface_height: f64,
    /// Maximum number of undo snapshots kept.
    pub undo_capacity: usize,
    /// Idle time after the last stroke before recognition fires.
    pub pause_threshold_ms: u64,
    /// Per-axis displacement needed before a new point is recorded.
    pub move_threshold: f64,
    /// Base pen width.
    pub pen_size: f64,
    pub pen_size_range: Range,
    /// Eraser width.
    pub eraser_size: f64,
    pub eraser_size_range: Range,
    /// Grab distance for dragging an empty-selection lasso.
    pub lasso_tolerance: f64,
    /// Dilation applied to the lasso outline during hit-testing.
    pub lasso_margin: f64,
    /// Dilation applied to stroke center lines during hit-testing. Strokes
    /// within `lasso_margin + stroke_margin` of a lasso are selected.
    pub stroke_margin: f64,
    /// Cell size of the hit-testing raster, in canvas units.
    pub raster_cell: f64,
    /// Arc-length spacing used when resampling strokes for recognition.
    pub resample_spacing: f64,
    /// Maximum samples per stroke handed to the recognizer.
    pub resample_cap: usize,
    pub font_size_range: Range,
    /// Font size used when no stroke bounds are available.
    pub default_font_size: f64,
    pub orphan_policy: OrphanPolicy,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 5.0,
            surface_factor: 3.0,
            min_surface_width: 3000.0,
            min_surface_height: 4000.0,
            undo_capacity: 20,
            pause_threshold_ms: 1200,
            move_threshold: 4.0,
            pen_size: 6.0,
            pen_size_range: Range::new(1.0, 50.0),
            eraser_size: 20.0,
            eraser_size_range: Range::new(5.0, 100.0),
            lasso_tolerance: 20.0,
            lasso_margin: 2.0,
            stroke_margin: 1.0,
            raster_cell: 1.0,
            resample_spacing: 10.0,
            resample_cap: 1000,
            font_size_range: Range::new(20.0, 200.0),
            default_font_size: 60.0,
            orphan_policy: OrphanPolicy::Drop,
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a config from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            return Err(ConfigError::Invalid {
                field: "min_scale",
                reason: format!("need 0 < min_scale <= max_scale, got {} / {}", self.min_scale, self.max_scale),
            });
        }
        let positive = [
            ("surface_factor", self.surface_factor),
            ("pen_size", self.pen_size),
            ("eraser_size", self.eraser_size),
            ("raster_cell", self.raster_cell),
            ("resample_spacing", self.resample_spacing),
            ("default_font_size", self.default_font_size),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid { field, reason: format!("must be positive, got {value}") });
            }
        }
        if self.lasso_margin < 0.0 {
            return Err(ConfigError::Invalid {
                field: "lasso_margin",
                reason: format!("must not be negative, got {}", self.lasso_margin),
            });
        }
        // A thinner dilation can miss every cell center.
        if self.stroke_margin < self.raster_cell * std::f64::consts::FRAC_1_SQRT_2 {
            return Err(ConfigError::Invalid {
                field: "stroke_margin",
                reason: format!(
                    "must be at least raster_cell / sqrt(2) ({:.3}), got {}",
                    self.raster_cell * std::f64::consts::FRAC_1_SQRT_2,
                    self.stroke_margin
                ),
            });
        }
        let ranges = [
            ("pen_size_range", self.pen_size_range),
            ("eraser_size_range", self.eraser_size_range),
            ("font_size_range", self.font_size_range),
        ];
        for (field, range) in ranges {
            if range.min > range.max {
                return Err(ConfigError::Invalid { field, reason: format!("min {} > max {}", range.min, range.max) });
            }
        }
        if self.undo_capacity == 0 {
            return Err(ConfigError::Invalid { field: "undo_capacity", reason: "must be at least 1".to_string() });
        }
        Ok(())
    }
}
