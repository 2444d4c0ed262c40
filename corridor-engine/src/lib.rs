//! Green Corridor Engine
//!
//! Proximity-based traffic signal priority for an emergency vehicle. Given a
//! stream of vehicle location samples and a roster of signal positions, the
//! engine finds the nearest signal, holds GREEN exactly the signals within the
//! proximity threshold, and reconciles that locally derived view with an
//! authoritative service and its push feed whenever they are reachable.
//!
//! # Architecture
//!
//! - [`geo`]: haversine distance
//! - [`engine`]: the stateless decision rule ([`PriorityEngine`])
//! - [`resolver`]: authoritative-first resolution with local fallback
//! - [`reconciler`]: per-signal merge of pushed updates
//! - [`store`]: the shared signal collection both write paths go through
//! - [`roster`]: startup roster fetch with a demo fallback
//! - [`authority`]: an in-process stand-in for the decision service
//!
//! The library does NOT sample positions, own any network transport, or render
//! anything. Those live in the application layer (corridor-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use corridor_engine::{
//!     roster, DualSourceResolver, EngineConfig, LiveReconciler, LocationSample,
//!     PriorityEngine, SimulatedAuthority,
//! };
//!
//! let config = EngineConfig::new();
//! let (store, _origin) = roster::seed_store(&roster::StaticRoster::new(roster::demo_roster()));
//!
//! let authority = SimulatedAuthority::new(store.snapshot(), &config);
//! let feed = authority.subscribe();
//! let reconciler = LiveReconciler::new(store.clone());
//! let push_thread = std::thread::spawn(move || reconciler.run(feed.iter()));
//!
//! let mut resolver = DualSourceResolver::new(authority, PriorityEngine::new(&config), store);
//! let response = resolver.resolve(&LocationSample::new(12.9716, 77.5946, 40.0));
//! println!("Nearest signal {:?} is {}", response.nearest_signal_id, response.signal_status);
//!
//! drop(resolver); // closes the push feed
//! let stats = push_thread.join().unwrap();
//! println!("{} push update(s) applied", stats.applied);
//! ```

// Public modules
pub mod authority;
pub mod config;
pub mod engine;
pub mod estimate;
pub mod geo;
pub mod reconciler;
pub mod resolver;
pub mod roster;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use authority::{Availability, SimulatedAuthority};
pub use config::EngineConfig;
pub use engine::{Decision, PriorityEngine};
pub use estimate::{EstimateKind, FixedEstimate, RushHourEstimate, TimeSavedEstimate};
pub use reconciler::{apply_update, parse_update, LiveReconciler, ReconcileStats};
pub use resolver::{DecisionService, DualSourceResolver, ResolverStats};
pub use roster::{RosterOrigin, RosterSource};
pub use store::{ApplyOutcome, SignalStore};
pub use types::{
    CorridorError, LocationSample, PriorityResponse, ResponseSource, Result, Signal, SignalId,
    SignalStatus, SignalUpdate, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
