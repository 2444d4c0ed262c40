//! Priority decision engine
//!
//! Given one location sample and the full signal set, the engine recomputes
//! every signal's status from scratch and reports the decision for the nearest
//! signal. The rule is stateless: a signal is GREEN exactly while the vehicle
//! is strictly inside the proximity threshold, with no hold time and no
//! hysteresis. The only history carried across cycles is the activation
//! timestamp, which is stamped on a RED -> GREEN transition.

use crate::config::EngineConfig;
use crate::estimate::TimeSavedEstimate;
use crate::types::{
    LocationSample, PriorityResponse, ResponseSource, Signal, SignalId, SignalStatus, Timestamp,
};

/// Output of one decision cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Every input signal with its recomputed status, in input order
    pub signals: Vec<Signal>,
    /// Decision for the nearest signal
    pub response: PriorityResponse,
    /// Ids whose status changed this cycle, in input order
    pub transitions: Vec<SignalId>,
}

/// The local decision engine
pub struct PriorityEngine {
    threshold_m: f64,
    round_distance: bool,
    estimator: Box<dyn TimeSavedEstimate>,
}

impl PriorityEngine {
    /// Create an engine from its configuration
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            threshold_m: config.proximity_threshold_m,
            round_distance: config.round_distance,
            estimator: config.estimator(),
        }
    }

    /// Builder method: replace the time-saved strategy
    pub fn with_estimator(mut self, estimator: Box<dyn TimeSavedEstimate>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Run one decision cycle
    ///
    /// Total over any sample and any (possibly empty) signal slice. Ties for
    /// the nearest signal go to the first one in input order.
    ///
    /// # Arguments
    /// * `sample` - Current vehicle position
    /// * `signals` - Full signal collection, in its stored order
    /// * `now` - Timestamp stamped on signals that turn GREEN
    pub fn decide(&self, sample: &LocationSample, signals: &[Signal], now: Timestamp) -> Decision {
        let mut nearest: Option<(SignalId, f64)> = None;
        let mut transitions = Vec::new();

        let updated: Vec<Signal> = signals
            .iter()
            .map(|signal| {
                let distance = sample.distance_to(signal);
                log::trace!("Signal {} at {:.1} m", signal.id, distance);

                if nearest.map_or(true, |(_, min)| distance < min) {
                    nearest = Some((signal.id, distance));
                }

                let status = SignalStatus::for_distance(distance, self.threshold_m);
                let mut next = signal.clone();
                if status != signal.status {
                    transitions.push(signal.id);
                    if status.is_green() {
                        next.last_activated_time = Some(now);
                    }
                }
                next.status = status;
                next
            })
            .collect();

        let response = match nearest {
            None => PriorityResponse::empty(ResponseSource::Local),
            Some((id, min_distance)) => {
                let status = SignalStatus::for_distance(min_distance, self.threshold_m);
                let time_saved = if status.is_green() {
                    self.estimator.estimate(min_distance, sample.speed)
                } else {
                    0.0
                };
                PriorityResponse {
                    nearest_signal_id: Some(id),
                    signal_status: status,
                    distance_m: if self.round_distance {
                        min_distance.round()
                    } else {
                        min_distance
                    },
                    estimated_time_saved_min: time_saved,
                    source: ResponseSource::Local,
                }
            }
        };

        log::debug!(
            "Local decision: nearest={:?} status={} distance={:.1} m, {} transition(s)",
            response.nearest_signal_id,
            response.signal_status,
            response.distance_m,
            transitions.len()
        );

        Decision {
            signals: updated,
            response,
            transitions,
        }
    }
}

impl Default for PriorityEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
