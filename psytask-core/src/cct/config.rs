//! Contextual cueing task parameters.
use serde::{Deserialize, Serialize};

use crate::cct::layout::MAX_GRID_SIZE;
use crate::error::ConfigError;
use crate::geometry::Point;

/// Immutable parameters for one contextual cueing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CctConfig {
    /// Cells per grid side; the search display has `grid_size²` cells.
    #[serde(default = "CctConfig::default_grid_size")]
    pub grid_size: usize,
    /// Side of one grid cell, in pixels.
    #[serde(default = "CctConfig::default_cell_size")]
    pub cell_size: i32,
    /// Items per configuration: one target plus `item_count - 1` distractors.
    #[serde(default = "CctConfig::default_item_count")]
    pub item_count: usize,
    /// Repeated configurations generated once at setup and replayed.
    #[serde(default = "CctConfig::default_repeated_pool_size")]
    pub repeated_pool_size: usize,
    /// Novel slots per block; with the repeated pool this fixes trials per block.
    #[serde(default = "CctConfig::default_novel_pool_size")]
    pub novel_pool_size: usize,
    #[serde(default = "CctConfig::default_block_count")]
    pub block_count: usize,
    /// Seconds the fixation cross stays up before each trial.
    #[serde(default = "CctConfig::default_fixation_duration")]
    pub fixation_duration: f64,
    /// Rendered item size in pixels; the click radius is half of it.
    #[serde(default = "CctConfig::default_stimulus_size")]
    pub stimulus_size: i32,
    #[serde(default = "CctConfig::default_screen_width")]
    pub screen_width: i32,
    #[serde(default = "CctConfig::default_screen_height")]
    pub screen_height: i32,
    /// Chance of a novel trial while repeated slots remain in the block.
    #[serde(default = "CctConfig::default_novel_probability")]
    pub novel_probability: f64,
}

impl CctConfig {
    #[must_use]
    pub const fn default_grid_size() -> usize {
        6
    }

    #[must_use]
    pub const fn default_cell_size() -> i32 {
        80
    }

    #[must_use]
    pub const fn default_item_count() -> usize {
        12
    }

    #[must_use]
    pub const fn default_repeated_pool_size() -> usize {
        12
    }

    #[must_use]
    pub const fn default_novel_pool_size() -> usize {
        12
    }

    #[must_use]
    pub const fn default_block_count() -> usize {
        5
    }

    #[must_use]
    pub const fn default_fixation_duration() -> f64 {
        0.5
    }

    #[must_use]
    pub const fn default_stimulus_size() -> i32 {
        30
    }

    #[must_use]
    pub const fn default_screen_width() -> i32 {
        800
    }

    #[must_use]
    pub const fn default_screen_height() -> i32 {
        600
    }

    #[must_use]
    pub const fn default_novel_probability() -> f64 {
        0.5
    }

    #[must_use]
    pub const fn trials_per_block(&self) -> usize {
        self.repeated_pool_size + self.novel_pool_size
    }

    #[must_use]
    pub const fn total_trials(&self) -> usize {
        self.trials_per_block() * self.block_count
    }

    /// Top-left corner of the centered grid.
    #[must_use]
    pub fn grid_origin(&self) -> Point {
        let side = self.cell_size * i32::try_from(self.grid_size).unwrap_or(i32::MAX / 2);
        Point::new(
            (self.screen_width - side).div_euclid(2),
            (self.screen_height - side).div_euclid(2),
        )
    }

    /// Screen center of grid cell `(column, row)`.
    #[must_use]
    pub fn cell_center(&self, column: u8, row: u8) -> Point {
        let origin = self.grid_origin();
        let half = self.cell_size / 2;
        Point::new(
            origin.x + i32::from(column) * self.cell_size + half,
            origin.y + i32::from(row) * self.cell_size + half,
        )
    }

    #[must_use]
    pub const fn hit_radius(&self) -> i32 {
        self.stimulus_size / 2
    }

    /// Validate configuration invariants before a session starts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::MinViolation {
                field: "grid_size",
                min: 1,
                value: self.grid_size,
            });
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::GridTooLarge {
                grid: self.grid_size,
                max: MAX_GRID_SIZE,
            });
        }
        if self.item_count == 0 {
            return Err(ConfigError::MinViolation {
                field: "item_count",
                min: 1,
                value: self.item_count,
            });
        }
        let cells = self.grid_size * self.grid_size;
        if self.item_count > cells {
            return Err(ConfigError::TooManyItems {
                items: self.item_count,
                grid: self.grid_size,
                cells,
            });
        }
        if self.repeated_pool_size == 0 {
            return Err(ConfigError::MinViolation {
                field: "repeated_pool_size",
                min: 1,
                value: self.repeated_pool_size,
            });
        }
        if self.block_count == 0 {
            return Err(ConfigError::MinViolation {
                field: "block_count",
                min: 1,
                value: self.block_count,
            });
        }
        if !self.fixation_duration.is_finite() || self.fixation_duration <= 0.0 {
            return Err(ConfigError::NonPositiveDuration {
                field: "fixation_duration",
                value: self.fixation_duration,
            });
        }
        if !(0.0..=1.0).contains(&self.novel_probability) {
            return Err(ConfigError::ProbabilityOutOfRange {
                field: "novel_probability",
                value: self.novel_probability,
            });
        }
        if self.stimulus_size <= 0 || self.stimulus_size > self.cell_size {
            return Err(ConfigError::StimulusTooLarge {
                stimulus: self.stimulus_size,
                cell: self.cell_size,
            });
        }
        Ok(())
    }
}

impl Default for CctConfig {
    fn default() -> Self {
        Self {
            grid_size: Self::default_grid_size(),
            cell_size: Self::default_cell_size(),
            item_count: Self::default_item_count(),
            repeated_pool_size: Self::default_repeated_pool_size(),
            novel_pool_size: Self::default_novel_pool_size(),
            block_count: Self::default_block_count(),
            fixation_duration: Self::default_fixation_duration(),
            stimulus_size: Self::default_stimulus_size(),
            screen_width: Self::default_screen_width(),
            screen_height: Self::default_screen_height(),
            novel_probability: Self::default_novel_probability(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_centered() {
        let cfg = CctConfig::default();
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.trials_per_block(), 24);
        assert_eq!(cfg.total_trials(), 120);
        assert_eq!(cfg.grid_origin(), Point::new(160, 60));
        assert_eq!(cfg.cell_center(0, 0), Point::new(200, 100));
        assert_eq!(cfg.cell_center(5, 5), Point::new(600, 500));
        assert_eq!(cfg.hit_radius(), 15);
    }

    #[test]
    fn rejects_more_items_than_cells() {
        let cfg = CctConfig {
            grid_size: 3,
            item_count: 10,
            ..CctConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooManyItems {
                items: 10,
                grid: 3,
                cells: 9
            })
        );
    }

    #[test]
    fn rejects_bad_probability_and_duration() {
        let cfg = CctConfig {
            novel_probability: 1.5,
            ..CctConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ProbabilityOutOfRange { field, .. }) if field == "novel_probability"
        ));

        let cfg = CctConfig {
            fixation_duration: 0.0,
            ..CctConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn oversized_grid_names_the_ceiling() {
        let cfg = CctConfig {
            grid_size: 300,
            ..CctConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::GridTooLarge {
                grid: 300,
                max: 255
            }
        );
        assert_eq!(err.to_string(), "grid size 300 exceeds the 255x255 maximum");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: CctConfig = serde_json::from_str(r#"{"block_count": 2}"#).expect("deserialize");
        assert_eq!(cfg.block_count, 2);
        assert_eq!(cfg.grid_size, 6);
        assert_eq!(cfg.trials_per_block(), 24);
    }
}
