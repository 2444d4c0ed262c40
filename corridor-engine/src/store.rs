//! Shared signal store
//!
//! The signal collection is the one piece of mutable state shared between the
//! sampling tick (bulk recompute on fallback) and the push feed (single-id
//! replace). Callers never get mutable access to the collection: they go
//! through [`SignalStore::recompute_all`] or [`SignalStore::apply_one`], each
//! of which runs under a single lock so no half-written cycle is observable.

use crate::reconciler::apply_update;
use crate::types::{CorridorError, Result, Signal, SignalId, SignalUpdate};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Outcome of applying one push update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The entry with the same id was replaced
    Applied,
    /// No signal with that id; nothing changed
    UnknownId,
    /// Versioned update not newer than the last one applied to this id
    Stale,
}

#[derive(Debug, Default)]
struct Inner {
    signals: Vec<Signal>,
    /// Highest push version applied per signal id
    versions: HashMap<SignalId, u64>,
}

/// Cloneable handle to the shared signal collection
#[derive(Debug, Clone, Default)]
pub struct SignalStore {
    inner: Arc<Mutex<Inner>>,
}

impl SignalStore {
    /// Create a store seeded with a roster
    ///
    /// Fails with [`CorridorError::DuplicateSignalId`] if two signals share an
    /// id. Roster order is preserved; it decides nearest-signal ties.
    pub fn new(roster: Vec<Signal>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(roster.len());
        for signal in &roster {
            if !seen.insert(signal.id) {
                return Err(CorridorError::DuplicateSignalId(signal.id));
            }
        }

        Ok(Self::from_unique(roster))
    }

    /// Caller guarantees ids are unique
    pub(crate) fn from_unique(roster: Vec<Signal>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                signals: roster,
                versions: HashMap::new(),
            })),
        }
    }

    // Writes are whole-record overwrites; a poisoned lock still holds whole records
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current collection
    pub fn snapshot(&self) -> Vec<Signal> {
        self.lock().signals.clone()
    }

    /// Current state of one signal
    pub fn get(&self, id: SignalId) -> Option<Signal> {
        self.lock().signals.iter().find(|s| s.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().signals.is_empty()
    }

    /// Replace the whole collection with a recomputed one
    ///
    /// `f` sees the current collection and returns the replacement plus any
    /// value the caller wants back. The replacement must keep the same ids;
    /// if it does not, the store keeps its current contents.
    pub fn recompute_all<R>(&self, f: impl FnOnce(&[Signal]) -> (Vec<Signal>, R)) -> R {
        let mut inner = self.lock();
        let (next, out) = f(&inner.signals);

        let same_ids = next.len() == inner.signals.len()
            && next.iter().zip(inner.signals.iter()).all(|(a, b)| a.id == b.id);
        if same_ids {
            inner.signals = next;
        } else {
            log::warn!("Recompute changed the signal id set; keeping previous collection");
        }
        out
    }

    /// Replace the entry with the update's id
    ///
    /// Never inserts. Unversioned updates always apply (last applied wins);
    /// versioned ones must be newer than the last version seen for that id.
    pub fn apply_one(&self, update: &SignalUpdate) -> ApplyOutcome {
        let mut inner = self.lock();
        let id = update.signal.id;

        if !inner.signals.iter().any(|s| s.id == id) {
            return ApplyOutcome::UnknownId;
        }

        if let Some(version) = update.version {
            if let Some(&last) = inner.versions.get(&id) {
                if version <= last {
                    return ApplyOutcome::Stale;
                }
            }
            inner.versions.insert(id, version);
        }

        let next = apply_update(&inner.signals, &update.signal);
        inner.signals = next;
        ApplyOutcome::Applied
    }
}
