//! Time-saved heuristics
//!
//! The estimate attached to a GREEN decision is not derived from signal timing
//! plans; it is a placeholder heuristic. It sits behind [`TimeSavedEstimate`]
//! so a better model can be dropped in without touching the decision rule.

use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes reported by the local engine when a signal is cleared
pub const DEFAULT_FIXED_MINUTES: f64 = 4.5;

/// Base delay used by the rush-hour heuristic
pub const DEFAULT_BASE_DELAY_MIN: f64 = 2.0;

/// Strategy computing the minutes saved by clearing the nearest signal
///
/// Only consulted when the nearest signal is within the proximity threshold.
pub trait TimeSavedEstimate: Send + Sync {
    /// Estimate in minutes, never negative
    fn estimate(&self, distance_m: f64, speed_kmh: f64) -> f64;
}

/// Constant estimate, independent of distance and speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedEstimate {
    pub minutes: f64,
}

impl Default for FixedEstimate {
    fn default() -> Self {
        Self {
            minutes: DEFAULT_FIXED_MINUTES,
        }
    }
}

impl TimeSavedEstimate for FixedEstimate {
    fn estimate(&self, _distance_m: f64, _speed_kmh: f64) -> f64 {
        self.minutes.max(0.0)
    }
}

/// Base delay plus a traffic factor that doubles during the evening rush
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RushHourEstimate {
    pub base_delay_min: f64,
}

impl Default for RushHourEstimate {
    fn default() -> Self {
        Self {
            base_delay_min: DEFAULT_BASE_DELAY_MIN,
        }
    }
}

impl RushHourEstimate {
    /// Estimate for a given local wall-clock time
    pub fn estimate_at(&self, time: NaiveTime) -> f64 {
        (self.base_delay_min + traffic_factor(time)).max(0.0)
    }
}

impl TimeSavedEstimate for RushHourEstimate {
    fn estimate(&self, _distance_m: f64, _speed_kmh: f64) -> f64 {
        self.estimate_at(Local::now().time())
    }
}

/// 2.0 strictly between 17:00 and 21:00, 1.0 otherwise
pub fn traffic_factor(time: NaiveTime) -> f64 {
    let seconds = time.num_seconds_from_midnight();
    let rush_start = 17 * 3600;
    let rush_end = 21 * 3600;
    let after_start = seconds > rush_start || (seconds == rush_start && time.nanosecond() > 0);
    if after_start && seconds < rush_end {
        2.0
    } else {
        1.0
    }
}

/// Serializable selector for a [`TimeSavedEstimate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateKind {
    Fixed {
        #[serde(default = "default_fixed_minutes")]
        minutes: f64,
    },
    RushHour {
        #[serde(default = "default_base_delay")]
        base_delay_min: f64,
    },
}

fn default_fixed_minutes() -> f64 {
    DEFAULT_FIXED_MINUTES
}

fn default_base_delay() -> f64 {
    DEFAULT_BASE_DELAY_MIN
}

impl Default for EstimateKind {
    fn default() -> Self {
        EstimateKind::Fixed {
            minutes: DEFAULT_FIXED_MINUTES,
        }
    }
}

impl EstimateKind {
    /// Build the strategy this selector names
    pub fn build(&self) -> Box<dyn TimeSavedEstimate> {
        match *self {
            EstimateKind::Fixed { minutes } => Box::new(FixedEstimate { minutes }),
            EstimateKind::RushHour { base_delay_min } => {
                Box::new(RushHourEstimate { base_delay_min })
            }
        }
    }
}
