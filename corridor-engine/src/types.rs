//! Core types for the corridor engine
//!
//! This module defines the records exchanged between the engine, the shared
//! signal store and the outside world (authoritative service, push feed,
//! presentation). Field names on the wire follow the JSON shape used by the
//! signal service (`nearestSignalId`, `lastActivatedTime`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the engine
pub type Timestamp = DateTime<Utc>;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CorridorError>;

/// Stable identifier of a traffic signal
pub type SignalId = i64;

/// Display state of a traffic signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStatus {
    /// Normal cycle, no priority held
    #[default]
    Red,
    /// Held green for the approaching vehicle
    Green,
}

impl SignalStatus {
    /// Status for a signal at `distance_m` from the vehicle
    pub fn for_distance(distance_m: f64, threshold_m: f64) -> Self {
        if distance_m < threshold_m {
            SignalStatus::Green
        } else {
            SignalStatus::Red
        }
    }

    pub fn is_green(self) -> bool {
        self == SignalStatus::Green
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStatus::Red => f.pad("RED"),
            SignalStatus::Green => f.pad("GREEN"),
        }
    }
}

/// A traffic signal known to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Unique, stable signal id
    pub id: SignalId,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Current status
    #[serde(default)]
    pub status: SignalStatus,
    /// Last RED -> GREEN transition, if the signal was ever activated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activated_time: Option<Timestamp>,
}

impl Signal {
    /// Create a RED signal that has never been activated
    pub fn new(id: SignalId, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
            status: SignalStatus::Red,
            last_activated_time: None,
        }
    }

    /// Builder method: set the status
    pub fn with_status(mut self, status: SignalStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_green(&self) -> bool {
        self.status.is_green()
    }
}

/// One position fix of the emergency vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Ground speed in km/h
    #[serde(default)]
    pub speed: f64,
}

impl LocationSample {
    pub fn new(lat: f64, lng: f64, speed: f64) -> Self {
        Self { lat, lng, speed }
    }

    /// Great-circle distance in meters from this sample to a signal
    pub fn distance_to(&self, signal: &Signal) -> f64 {
        crate::geo::distance(self.lat, self.lng, signal.latitude, signal.longitude)
    }
}

/// Which path produced a [`PriorityResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseSource {
    /// Returned by the external decision service
    #[default]
    Authoritative,
    /// Computed by the local decision engine
    Local,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSource::Authoritative => f.pad("AUTHORITATIVE"),
            ResponseSource::Local => f.pad("LOCAL"),
        }
    }
}

/// Decision for the nearest signal, recomputed every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityResponse {
    /// Nearest signal, absent only when there are no signals
    pub nearest_signal_id: Option<SignalId>,
    /// GREEN iff the nearest signal is within the proximity threshold
    pub signal_status: SignalStatus,
    /// Distance to the nearest signal in meters
    #[serde(rename = "distance")]
    pub distance_m: f64,
    /// Heuristic estimate of minutes saved by the clearance
    #[serde(rename = "estimatedTimeSaved")]
    pub estimated_time_saved_min: f64,
    /// Not sent by the service; filled in by the resolver
    #[serde(default)]
    pub source: ResponseSource,
}

impl PriorityResponse {
    /// Response for an empty signal collection
    pub fn empty(source: ResponseSource) -> Self {
        Self {
            nearest_signal_id: None,
            signal_status: SignalStatus::Red,
            distance_m: 0.0,
            estimated_time_saved_min: 0.0,
            source,
        }
    }

    /// Builder method: tag the response with the path that produced it
    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }
}

/// A single-signal state change delivered by the push feed
///
/// `version` is optional. When present the store rejects updates that are not
/// newer than the last version applied to the same signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(flatten)]
    pub signal: Signal,
}

impl SignalUpdate {
    /// Unversioned update (last applied wins)
    pub fn new(signal: Signal) -> Self {
        Self { version: None, signal }
    }

    /// Versioned update
    pub fn versioned(signal: Signal, version: u64) -> Self {
        Self {
            version: Some(version),
            signal,
        }
    }
}

/// Errors that can occur in the engine and at its boundaries
#[derive(Debug, thiserror::Error)]
pub enum CorridorError {
    #[error("Positioning unavailable: {0}")]
    PositioningUnavailable(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    #[error("Failed to fetch signal roster: {0}")]
    RosterFetchFailure(String),

    #[error("Duplicate signal id in roster: {0}")]
    DuplicateSignalId(SignalId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
