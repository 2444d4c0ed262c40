//! Dual-source resolver
//!
//! Each sampling tick the resolver first asks the authoritative decision
//! service. On success its response is adopted as-is and the signal store is
//! left alone: the service's push feed keeps the store current. On any
//! transport or service failure the local engine runs against the store
//! instead and its recomputed collection replaces the stored one.
//!
//! There is no retry inside a tick. The next tick starts over and prefers the
//! authoritative path again. Every response is tagged with the path that
//! produced it.

use crate::engine::PriorityEngine;
use crate::store::SignalStore;
use crate::types::{LocationSample, PriorityResponse, ResponseSource, Result, Timestamp};
use chrono::Utc;

/// The external decision service
///
/// Implementations own their transport, including the timeout that bounds a
/// call. Any error is treated as a transport failure by the resolver.
pub trait DecisionService {
    fn decide(&self, sample: &LocationSample) -> Result<PriorityResponse>;
}

impl<S: DecisionService + ?Sized> DecisionService for Box<S> {
    fn decide(&self, sample: &LocationSample) -> Result<PriorityResponse> {
        (**self).decide(sample)
    }
}

/// How many ticks each path answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub authoritative: usize,
    pub fallback: usize,
}

impl ResolverStats {
    pub fn total(&self) -> usize {
        self.authoritative + self.fallback
    }
}

/// Resolves one location sample per tick against two sources
pub struct DualSourceResolver<S> {
    service: S,
    engine: PriorityEngine,
    store: SignalStore,
    last_response: Option<PriorityResponse>,
    stats: ResolverStats,
    degraded: bool,
}

impl<S: DecisionService> DualSourceResolver<S> {
    pub fn new(service: S, engine: PriorityEngine, store: SignalStore) -> Self {
        Self {
            service,
            engine,
            store,
            last_response: None,
            stats: ResolverStats::default(),
            degraded: false,
        }
    }

    /// Resolve a sample, stamping activations with the current time
    pub fn resolve(&mut self, sample: &LocationSample) -> PriorityResponse {
        self.resolve_at(sample, Utc::now())
    }

    /// Resolve a sample at an explicit time
    pub fn resolve_at(&mut self, sample: &LocationSample, now: Timestamp) -> PriorityResponse {
        let response = match self.service.decide(sample) {
            Ok(response) => {
                if self.degraded {
                    log::info!("Decision service reachable again");
                    self.degraded = false;
                }
                self.stats.authoritative += 1;
                response.with_source(ResponseSource::Authoritative)
            }
            Err(e) => {
                if self.degraded {
                    log::debug!("Decision service still unavailable: {}", e);
                } else {
                    log::warn!("Decision service unavailable ({}); using local engine", e);
                    self.degraded = true;
                }
                self.stats.fallback += 1;
                self.resolve_locally(sample, now)
            }
        };

        self.last_response = Some(response.clone());
        response
    }

    fn resolve_locally(&self, sample: &LocationSample, now: Timestamp) -> PriorityResponse {
        let engine = &self.engine;
        self.store.recompute_all(|signals| {
            let decision = engine.decide(sample, signals, now);
            for id in &decision.transitions {
                log::debug!("Local engine switched signal {}", id);
            }
            (decision.signals, decision.response)
        })
    }

    /// Most recent response, from either path
    pub fn last_response(&self) -> Option<&PriorityResponse> {
        self.last_response.as_ref()
    }

    /// True while the service has failed since its last success
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Give back the service, e.g. to drop it and close its push feed
    pub fn into_service(self) -> S {
        self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CorridorError, Signal, SignalStatus};
    use chrono::TimeZone;
    use std::cell::Cell;

    struct FixedService(PriorityResponse);

    impl DecisionService for FixedService {
        fn decide(&self, _sample: &LocationSample) -> Result<PriorityResponse> {
            Ok(self.0.clone())
        }
    }

    struct FailingService;

    impl DecisionService for FailingService {
        fn decide(&self, _sample: &LocationSample) -> Result<PriorityResponse> {
            Err(CorridorError::TransportFailure("connection refused".to_string()))
        }
    }

    /// Fails on the first `failures` calls, then answers
    struct RecoveringService {
        failures: Cell<usize>,
    }

    impl DecisionService for RecoveringService {
        fn decide(&self, _sample: &LocationSample) -> Result<PriorityResponse> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(CorridorError::TransportFailure("timeout".to_string()));
            }
            Ok(PriorityResponse::empty(ResponseSource::Local))
        }
    }

    fn store() -> SignalStore {
        SignalStore::new(vec![
            Signal::new(1, 12.9716, 77.5946),
            Signal::new(2, 12.9750, 77.5980),
            Signal::new(3, 12.9800, 77.6000),
        ])
        .unwrap()
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_authoritative_response_adopted_without_touching_store() {
        let served = PriorityResponse {
            nearest_signal_id: Some(3),
            signal_status: SignalStatus::Green,
            distance_m: 120.0,
            estimated_time_saved_min: 3.0,
            source: ResponseSource::Local,
        };
        let store = store();
        let before = store.snapshot();
        let mut resolver =
            DualSourceResolver::new(FixedService(served.clone()), PriorityEngine::default(), store.clone());

        let response = resolver.resolve_at(&LocationSample::new(12.9716, 77.5946, 40.0), now());

        assert_eq!(response.nearest_signal_id, Some(3));
        assert_eq!(response.source, ResponseSource::Authoritative);
        assert_eq!(resolver.last_response(), Some(&response));
        // Push feed owns the store on this path
        assert_eq!(store.snapshot(), before);
        assert_eq!(resolver.stats(), ResolverStats { authoritative: 1, fallback: 0 });
    }

    #[test]
    fn test_fallback_matches_local_engine() {
        let store = store();
        let snapshot = store.snapshot();
        let sample = LocationSample::new(12.9716, 77.5946, 40.0);

        let expected = PriorityEngine::default().decide(&sample, &snapshot, now());

        let mut resolver = DualSourceResolver::new(FailingService, PriorityEngine::default(), store.clone());
        let response = resolver.resolve_at(&sample, now());

        assert_eq!(response, expected.response);
        assert_eq!(response.source, ResponseSource::Local);
        assert_eq!(store.snapshot(), expected.signals);
        assert!(resolver.is_degraded());
        assert_eq!(resolver.stats().fallback, 1);
    }

    #[test]
    fn test_fallback_response_shape_matches_authoritative() {
        let sample = LocationSample::new(12.9716, 77.5946, 40.0);
        let mut local = DualSourceResolver::new(FailingService, PriorityEngine::default(), store());
        let local_response = local.resolve_at(&sample, now());

        let served = serde_json::to_value(&local_response).unwrap();
        for key in ["nearestSignalId", "signalStatus", "distance", "estimatedTimeSaved", "source"] {
            assert!(served.get(key).is_some(), "missing {}", key);
        }
        assert!(served["distance"].is_number());
        assert!(served["nearestSignalId"].is_i64());
        let reparsed: PriorityResponse = serde_json::from_value(served).unwrap();
        assert_eq!(reparsed, local_response);
    }

    #[test]
    fn test_prefers_authoritative_again_after_recovery() {
        let service = RecoveringService {
            failures: Cell::new(2),
        };
        let mut resolver = DualSourceResolver::new(service, PriorityEngine::default(), store());
        let sample = LocationSample::new(13.5, 78.0, 40.0);

        assert_eq!(resolver.resolve_at(&sample, now()).source, ResponseSource::Local);
        assert_eq!(resolver.resolve_at(&sample, now()).source, ResponseSource::Local);
        assert_eq!(resolver.resolve_at(&sample, now()).source, ResponseSource::Authoritative);
        assert!(!resolver.is_degraded());
        assert_eq!(resolver.stats().total(), 3);
    }

    #[test]
    fn test_boxed_service() {
        let service: Box<dyn DecisionService> = Box::new(FailingService);
        let mut resolver = DualSourceResolver::new(service, PriorityEngine::default(), store());
        let response = resolver.resolve_at(&LocationSample::new(12.9750, 77.5980, 40.0), now());
        assert_eq!(response.nearest_signal_id, Some(2));
        assert_eq!(response.signal_status, SignalStatus::Green);
    }
}
