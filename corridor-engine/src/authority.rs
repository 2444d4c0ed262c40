//! In-process stand-in for the authoritative decision service
//!
//! Behaves like the signal service the vehicle talks to: it owns its own copy
//! of the roster, applies the same proximity rule, persists only the signals
//! whose status actually changed and broadcasts each of those as a push
//! message. Its time-saved figure comes from the rush-hour heuristic rather
//! than the local constant.
//!
//! [`Availability`] lets a simulation take the service down, either for good
//! or on every n-th request, to exercise the local fallback path.

use crate::config::EngineConfig;
use crate::estimate::{RushHourEstimate, TimeSavedEstimate};
use crate::resolver::DecisionService;
use crate::roster::RosterSource;
use crate::types::{
    CorridorError, LocationSample, PriorityResponse, ResponseSource, Result, Signal, SignalId,
    SignalStatus, SignalUpdate, Timestamp,
};
use chrono::Utc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

/// Whether the simulated service answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// Every request succeeds
    #[default]
    Online,
    /// Every request fails with a transport error
    Offline,
    /// Every n-th request (1-based) fails; `FailEvery(0)` never fails
    FailEvery(u32),
}

#[derive(Debug, Default)]
struct AuthorityState {
    signals: Vec<Signal>,
    requests: u64,
    last_version: u64,
    push: Option<Sender<String>>,
}

/// Simulated authoritative decision service
pub struct SimulatedAuthority {
    state: Mutex<AuthorityState>,
    threshold_m: f64,
    round_distance: bool,
    estimator: Box<dyn TimeSavedEstimate>,
    availability: Availability,
}

impl SimulatedAuthority {
    /// Create a service holding `roster`, using the threshold from `config`
    pub fn new(roster: Vec<Signal>, config: &EngineConfig) -> Self {
        Self {
            state: Mutex::new(AuthorityState {
                signals: roster,
                ..AuthorityState::default()
            }),
            threshold_m: config.proximity_threshold_m,
            round_distance: config.round_distance,
            estimator: Box::new(RushHourEstimate::default()),
            availability: Availability::Online,
        }
    }

    /// Builder method: set availability
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Builder method: replace the time-saved strategy
    pub fn with_estimator(mut self, estimator: Box<dyn TimeSavedEstimate>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Open the push feed
    ///
    /// Each status change is sent as one JSON message. The feed ends when the
    /// service is dropped. Subscribing again replaces the previous feed.
    pub fn subscribe(&self) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        self.lock().push = Some(tx);
        rx
    }

    /// Copy of the service-side roster
    pub fn signals(&self) -> Vec<Signal> {
        self.lock().signals.clone()
    }

    /// Requests received so far, failed ones included
    pub fn requests(&self) -> u64 {
        self.lock().requests
    }

    fn lock(&self) -> MutexGuard<'_, AuthorityState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self, request: u64) -> Result<()> {
        match self.availability {
            Availability::Online => Ok(()),
            Availability::Offline => Err(CorridorError::TransportFailure(
                "decision service unreachable".to_string(),
            )),
            Availability::FailEvery(n) if n > 0 && request % u64::from(n) == 0 => Err(
                CorridorError::TransportFailure(format!("request {} timed out", request)),
            ),
            Availability::FailEvery(_) => Ok(()),
        }
    }

    /// Handle one location report at an explicit time
    pub fn decide_at(&self, sample: &LocationSample, now: Timestamp) -> Result<PriorityResponse> {
        let mut state = self.lock();
        state.requests += 1;
        self.check_available(state.requests)?;

        let AuthorityState {
            signals,
            last_version,
            push,
            ..
        } = &mut *state;

        let mut nearest: Option<(SignalId, f64)> = None;
        for signal in signals.iter_mut() {
            let distance = sample.distance_to(signal);
            if nearest.map_or(true, |(_, min)| distance < min) {
                nearest = Some((signal.id, distance));
            }

            let status = SignalStatus::for_distance(distance, self.threshold_m);
            if status == signal.status {
                continue;
            }
            if status.is_green() {
                signal.last_activated_time = Some(now);
            }
            signal.status = status;

            *last_version += 1;
            broadcast(push, SignalUpdate::versioned(signal.clone(), *last_version));
        }

        let response = match nearest {
            None => PriorityResponse::empty(ResponseSource::Authoritative),
            Some((id, min_distance)) => {
                let status = SignalStatus::for_distance(min_distance, self.threshold_m);
                PriorityResponse {
                    nearest_signal_id: Some(id),
                    signal_status: status,
                    distance_m: if self.round_distance {
                        min_distance.round()
                    } else {
                        min_distance
                    },
                    estimated_time_saved_min: if status.is_green() {
                        self.estimator.estimate(min_distance, sample.speed)
                    } else {
                        0.0
                    },
                    source: ResponseSource::Authoritative,
                }
            }
        };
        Ok(response)
    }
}

impl DecisionService for SimulatedAuthority {
    fn decide(&self, sample: &LocationSample) -> Result<PriorityResponse> {
        self.decide_at(sample, Utc::now())
    }
}

impl RosterSource for SimulatedAuthority {
    /// Roster fetches are not counted as decision requests
    fn fetch(&self) -> Result<Vec<Signal>> {
        if self.availability == Availability::Offline {
            return Err(CorridorError::RosterFetchFailure(
                "decision service unreachable".to_string(),
            ));
        }
        Ok(self.signals())
    }
}

fn broadcast(push: &mut Option<Sender<String>>, update: SignalUpdate) {
    let Some(sender) = push else {
        return;
    };

    let message = match serde_json::to_string(&update) {
        Ok(message) => message,
        Err(e) => {
            log::warn!("Failed to encode push update for signal {}: {}", update.signal.id, e);
            return;
        }
    };

    log::trace!("Broadcasting {}", message);
    if sender.send(message).is_err() {
        log::warn!("Push subscriber went away; further updates are not broadcast");
        *push = None;
    }
}
