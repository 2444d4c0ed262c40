//! Mission loop
//!
//! Wires the engine together the way a vehicle unit would run it: seed the
//! signal store from the decision service (or the demo roster), subscribe to
//! the push feed on its own thread, then resolve one location sample per tick.
//! When the route ends the service is dropped, which closes the push feed and
//! lets the reconciler thread finish.

use crate::config::AppConfig;
use crate::report::Reporter;
use crate::route::Route;
use anyhow::{anyhow, Context, Result};
use corridor_engine::roster::{demo_roster, seed_store, FileRoster, RosterSource};
use corridor_engine::{
    DualSourceResolver, LiveReconciler, LocationSample, PriorityEngine, PriorityResponse,
    ReconcileStats, ResolverStats, RosterOrigin, Signal, SimulatedAuthority,
};
use serde::Serialize;
use std::thread;
use std::time::Duration;

/// One resolved tick, as handed to the reporter
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub tick: usize,
    pub sample: LocationSample,
    pub response: PriorityResponse,
    /// Store contents right after the tick; may lag pushed updates
    pub signals: Vec<Signal>,
}

/// Outcome of a whole mission
#[derive(Debug, Clone, Serialize)]
pub struct MissionSummary {
    pub ticks: usize,
    pub roster_origin: RosterOrigin,
    pub authoritative: usize,
    pub fallback: usize,
    pub push: Option<PushSummary>,
    pub last_response: Option<PriorityResponse>,
    pub final_signals: Vec<Signal>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PushSummary {
    pub applied: usize,
    pub unknown: usize,
    pub stale: usize,
    pub malformed: usize,
}

impl From<ReconcileStats> for PushSummary {
    fn from(stats: ReconcileStats) -> Self {
        Self {
            applied: stats.applied,
            unknown: stats.unknown,
            stale: stats.stale,
            malformed: stats.malformed,
        }
    }
}

/// Run limits that do not belong in the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct MissionOptions {
    pub max_ticks: Option<usize>,
}

/// Run a mission over `route` and report every tick
pub fn run_mission(
    config: &AppConfig,
    route: &Route,
    options: MissionOptions,
    reporter: &mut Reporter,
) -> Result<MissionSummary> {
    let (service_roster, roster_loaded) = match &config.roster.file {
        Some(path) => match FileRoster::new(path).fetch() {
            Ok(signals) => (signals, true),
            Err(e) => {
                log::warn!("{}; decision service falls back to the demo roster", e);
                (demo_roster(), false)
            }
        },
        None => (demo_roster(), true),
    };

    let authority = SimulatedAuthority::new(service_roster, &config.engine)
        .with_availability(config.authority.availability());

    let (store, mut roster_origin) = seed_store(&authority);
    if !roster_loaded {
        roster_origin = RosterOrigin::Demo;
    }
    log::info!(
        "Signal store seeded with {} signal(s) ({:?})",
        store.len(),
        roster_origin
    );

    let push_thread = if config.authority.push {
        let feed = authority.subscribe();
        let reconciler = LiveReconciler::new(store.clone());
        let handle = thread::Builder::new()
            .name("push-reconciler".to_string())
            .spawn(move || reconciler.run(feed.iter()))
            .context("Failed to start push reconciler thread")?;
        Some(handle)
    } else {
        None
    };

    let engine = PriorityEngine::new(&config.engine);
    let mut resolver = DualSourceResolver::new(authority, engine, store.clone());

    let tick_interval = Duration::from_millis(config.route.tick_ms);
    let samples = route.samples();
    let limit = options.max_ticks.unwrap_or(samples.len()).min(samples.len());
    log::info!("Mission started: {} tick(s) every {:?}", limit, tick_interval);

    for (tick, sample) in samples.iter().take(limit).enumerate() {
        if tick > 0 && !tick_interval.is_zero() {
            thread::sleep(tick_interval);
        }

        let response = resolver.resolve(sample);
        reporter.tick(&TickRecord {
            tick: tick + 1,
            sample: *sample,
            response,
            signals: store.snapshot(),
        })?;
    }

    let ResolverStats {
        authoritative,
        fallback,
    } = resolver.stats();
    let last_response = resolver.last_response().cloned();

    // Dropping the service closes the push feed
    drop(resolver.into_service());
    let push: Option<PushSummary> = match push_thread {
        Some(handle) => Some(
            handle
                .join()
                .map_err(|_| anyhow!("Push reconciler thread panicked"))?
                .into(),
        ),
        None => None,
    };

    log::info!(
        "Mission finished: {} authoritative, {} fallback",
        authoritative,
        fallback
    );

    Ok(MissionSummary {
        ticks: limit,
        roster_origin,
        authoritative,
        fallback,
        push,
        last_response,
        final_signals: store.snapshot(),
    })
}
