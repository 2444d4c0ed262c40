//! Engine configuration types
//!
//! The decision rule itself is fixed; these knobs only tune its parameters.
//! Everything here deserializes with sensible defaults so an empty `[engine]`
//! table is a valid configuration.

use crate::estimate::{EstimateKind, TimeSavedEstimate};
use crate::types::{CorridorError, Result};
use serde::{Deserialize, Serialize};

/// Default proximity threshold in meters
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 300.0;

/// Configuration for the priority decision engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Signals strictly closer than this are forced GREEN
    #[serde(default = "default_threshold")]
    pub proximity_threshold_m: f64,

    /// Report the nearest distance rounded to whole meters
    #[serde(default = "default_true")]
    pub round_distance: bool,

    /// Heuristic used for `estimated_time_saved_min`
    #[serde(default)]
    pub time_saved: EstimateKind,
}

fn default_threshold() -> f64 {
    DEFAULT_PROXIMITY_THRESHOLD_M
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: DEFAULT_PROXIMITY_THRESHOLD_M,
            round_distance: true,
            time_saved: EstimateKind::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the proximity threshold
    pub fn with_threshold(mut self, meters: f64) -> Self {
        self.proximity_threshold_m = meters;
        self
    }

    /// Builder method: enable or disable distance rounding
    pub fn with_rounding(mut self, enabled: bool) -> Self {
        self.round_distance = enabled;
        self
    }

    /// Builder method: select the time-saved heuristic
    pub fn with_time_saved(mut self, kind: EstimateKind) -> Self {
        self.time_saved = kind;
        self
    }

    /// Reject values the decision rule cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.proximity_threshold_m.is_finite() || self.proximity_threshold_m <= 0.0 {
            return Err(CorridorError::InvalidConfig(format!(
                "proximity threshold must be a positive number of meters, got {}",
                self.proximity_threshold_m
            )));
        }
        Ok(())
    }

    /// Build the configured time-saved strategy
    pub fn estimator(&self) -> Box<dyn TimeSavedEstimate> {
        self.time_saved.build()
    }
}
