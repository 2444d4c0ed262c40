//! Signal roster seeding
//!
//! The roster is fetched once at startup. If the fetch fails, or returns a
//! roster the store cannot accept, a fixed three-signal demo roster is used so
//! the engine always has something to decide against.

use crate::store::SignalStore;
use crate::types::{CorridorError, Result, Signal};
use serde::Serialize;
use std::path::PathBuf;

/// Source of the initial signal roster
pub trait RosterSource {
    fn fetch(&self) -> Result<Vec<Signal>>;
}

/// In-memory roster
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    signals: Vec<Signal>,
}

impl StaticRoster {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }
}

impl RosterSource for StaticRoster {
    fn fetch(&self) -> Result<Vec<Signal>> {
        Ok(self.signals.clone())
    }
}

/// Roster stored as a JSON array of signals
#[derive(Debug, Clone)]
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RosterSource for FileRoster {
    fn fetch(&self) -> Result<Vec<Signal>> {
        log::info!("Loading signal roster: {:?}", self.path);

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            CorridorError::RosterFetchFailure(format!("Failed to read {:?}: {}", self.path, e))
        })?;

        let signals: Vec<Signal> = serde_json::from_str(&content).map_err(|e| {
            CorridorError::RosterFetchFailure(format!("Failed to parse {:?}: {}", self.path, e))
        })?;

        log::info!("Loaded {} signal(s) from {:?}", signals.len(), self.path);
        Ok(signals)
    }
}

/// Where the seeded roster came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterOrigin {
    Fetched,
    Demo,
}

/// The fixed fallback roster: three RED signals in central Bengaluru
pub fn demo_roster() -> Vec<Signal> {
    vec![
        Signal::new(1, 12.9716, 77.5946),
        Signal::new(2, 12.9750, 77.5980),
        Signal::new(3, 12.9800, 77.6000),
    ]
}

/// Fetch the roster and build the shared store, falling back to the demo roster
pub fn seed_store(source: &dyn RosterSource) -> (SignalStore, RosterOrigin) {
    let fetched = source.fetch().and_then(|signals| {
        if signals.is_empty() {
            log::warn!("Signal roster is empty; every decision will report no nearest signal");
        }
        SignalStore::new(signals)
    });

    match fetched {
        Ok(store) => (store, RosterOrigin::Fetched),
        Err(e) => {
            log::warn!("{}; using demo roster", e);
            (SignalStore::from_unique(demo_roster()), RosterOrigin::Demo)
        }
    }
}
