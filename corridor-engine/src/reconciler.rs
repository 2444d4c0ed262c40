//! Live state reconciler
//!
//! Applies pushed single-signal updates onto the shared store, one message at
//! a time in arrival order, independent of the sampling tick. A message that
//! fails to parse is dropped without touching prior state; an update for an
//! unknown id is ignored rather than inserted.

use crate::store::{ApplyOutcome, SignalStore};
use crate::types::{CorridorError, Result, Signal, SignalId, SignalStatus, SignalUpdate, Timestamp};
use serde::Deserialize;

/// Replace the entry whose id matches `update`
///
/// Pure form of the merge: returns a new collection and never inserts. If no
/// entry has `update.id`, the result equals `current`.
pub fn apply_update(current: &[Signal], update: &Signal) -> Vec<Signal> {
    current
        .iter()
        .map(|signal| {
            if signal.id == update.id {
                update.clone()
            } else {
                signal.clone()
            }
        })
        .collect()
}

/// Push message as it arrives on the feed
///
/// Unlike roster entries, a push must state the signal's status: a message
/// without one is malformed rather than an implicit RED.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    #[serde(default)]
    version: Option<u64>,
    id: SignalId,
    latitude: f64,
    longitude: f64,
    status: SignalStatus,
    #[serde(default)]
    last_activated_time: Option<Timestamp>,
}

impl From<PushMessage> for SignalUpdate {
    fn from(message: PushMessage) -> Self {
        SignalUpdate {
            version: message.version,
            signal: Signal {
                id: message.id,
                latitude: message.latitude,
                longitude: message.longitude,
                status: message.status,
                last_activated_time: message.last_activated_time,
            },
        }
    }
}

/// Parse one push message body
pub fn parse_update(message: &str) -> Result<SignalUpdate> {
    serde_json::from_str::<PushMessage>(message)
        .map(SignalUpdate::from)
        .map_err(|e| CorridorError::MalformedUpdate(e.to_string()))
}

/// Counters for one reconciler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Updates written to the store
    pub applied: usize,
    /// Updates for ids not in the store
    pub unknown: usize,
    /// Versioned updates older than what the store already holds
    pub stale: usize,
    /// Messages that failed to parse
    pub malformed: usize,
}

impl ReconcileStats {
    /// Total messages seen
    pub fn received(&self) -> usize {
        self.applied + self.unknown + self.stale + self.malformed
    }
}

/// Drains a push feed into a [`SignalStore`]
pub struct LiveReconciler {
    store: SignalStore,
    stats: ReconcileStats,
}

impl LiveReconciler {
    pub fn new(store: SignalStore) -> Self {
        Self {
            store,
            stats: ReconcileStats::default(),
        }
    }

    /// Handle one raw message
    ///
    /// Returns `None` when the message was malformed and dropped.
    pub fn handle_message(&mut self, message: &str) -> Option<ApplyOutcome> {
        let update = match parse_update(message) {
            Ok(update) => update,
            Err(e) => {
                log::warn!("Dropping push message: {}", e);
                self.stats.malformed += 1;
                return None;
            }
        };

        let outcome = self.store.apply_one(&update);
        match outcome {
            ApplyOutcome::Applied => {
                log::debug!(
                    "Push update applied: signal {} -> {}",
                    update.signal.id,
                    update.signal.status
                );
                self.stats.applied += 1;
            }
            ApplyOutcome::UnknownId => {
                log::debug!("Push update for unknown signal {} ignored", update.signal.id);
                self.stats.unknown += 1;
            }
            ApplyOutcome::Stale => {
                log::debug!(
                    "Stale push update for signal {} (version {:?}) ignored",
                    update.signal.id,
                    update.version
                );
                self.stats.stale += 1;
            }
        }
        Some(outcome)
    }

    /// Drain messages until the feed ends
    ///
    /// The feed is consumed lazily, so this blocks for as long as the iterator
    /// does (e.g. `mpsc::Receiver::iter` until every sender is dropped).
    pub fn run<I, S>(mut self, messages: I) -> ReconcileStats
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        log::debug!("Push reconciler started");
        for message in messages {
            self.handle_message(message.as_ref());
        }
        log::info!(
            "Push feed closed after {} message(s): {} applied, {} unknown, {} stale, {} malformed",
            self.stats.received(),
            self.stats.applied,
            self.stats.unknown,
            self.stats.stale,
            self.stats.malformed
        );
        self.stats
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }
}
