// End-to-end scenarios across engine, resolver, store and push feed
use chrono::{TimeZone, Utc};
use corridor_engine::roster::{demo_roster, seed_store, StaticRoster};
use corridor_engine::*;
use std::thread;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn two_signals() -> Vec<Signal> {
    vec![
        Signal::new(1, 12.9716, 77.5946),
        Signal::new(2, 12.9800, 77.6000),
    ]
}

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

#[test]
fn sample_on_first_signal_clears_it() {
    let decision = PriorityEngine::default().decide(
        &LocationSample::new(12.9716, 77.5946, 40.0),
        &two_signals(),
        now(),
    );

    assert_eq!(decision.response.nearest_signal_id, Some(1));
    assert!(decision.response.distance_m < 1.0);
    assert_eq!(decision.response.signal_status, SignalStatus::Green);
    assert_eq!(decision.response.estimated_time_saved_min, 4.5);
}

#[test]
fn far_sample_leaves_everything_red() {
    let sample = LocationSample::new(13.5, 78.0, 40.0);
    let signals = two_signals();
    let decision = PriorityEngine::default().decide(&sample, &signals, now());

    let closest = signals
        .iter()
        .min_by(|a, b| sample.distance_to(a).total_cmp(&sample.distance_to(b)))
        .unwrap();
    assert_eq!(decision.response.nearest_signal_id, Some(closest.id));
    assert!(decision.response.distance_m > 300.0);
    assert_eq!(decision.response.signal_status, SignalStatus::Red);
    assert_eq!(decision.response.estimated_time_saved_min, 0.0);
}

#[test]
fn push_update_changes_only_its_signal() {
    init_logging();
    let store = SignalStore::new(demo_roster()).unwrap();
    let before = store.snapshot();

    let mut reconciler = LiveReconciler::new(store.clone());
    let outcome = reconciler
        .handle_message(r#"{"id":2,"latitude":12.975,"longitude":77.598,"status":"GREEN"}"#);
    assert_eq!(outcome, Some(ApplyOutcome::Applied));

    let after = store.snapshot();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1].status, SignalStatus::Green);
    assert_eq!(after[2], before[2]);
}

#[test]
fn push_update_for_unknown_signal_is_ignored() {
    let store = SignalStore::new(demo_roster()).unwrap();
    let before = store.snapshot();

    let mut reconciler = LiveReconciler::new(store.clone());
    let outcome = reconciler
        .handle_message(r#"{"id":99,"latitude":12.975,"longitude":77.598,"status":"GREEN"}"#);

    assert_eq!(outcome, Some(ApplyOutcome::UnknownId));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn unreachable_service_falls_back_to_local_engine() {
    init_logging();
    let config = EngineConfig::default();
    let (store, origin) = seed_store(&StaticRoster::new(demo_roster()));
    assert_eq!(origin, RosterOrigin::Fetched);

    let sample = LocationSample::new(12.9750, 77.5980, 40.0);
    let expected = PriorityEngine::new(&config).decide(&sample, &store.snapshot(), now());

    let authority = SimulatedAuthority::new(demo_roster(), &config)
        .with_availability(Availability::Offline);
    let mut resolver = DualSourceResolver::new(authority, PriorityEngine::new(&config), store.clone());
    let response = resolver.resolve_at(&sample, now());

    assert_eq!(response, expected.response);
    assert_eq!(store.snapshot(), expected.signals);
    assert_eq!(response.source, ResponseSource::Local);
}

#[test]
fn push_feed_keeps_store_in_step_with_service() {
    init_logging();
    let config = EngineConfig::default();
    let store = SignalStore::new(demo_roster()).unwrap();

    let authority = SimulatedAuthority::new(demo_roster(), &config);
    let feed = authority.subscribe();
    let reconciler = LiveReconciler::new(store.clone());
    let push_thread = thread::spawn(move || reconciler.run(feed.iter()));

    let mut resolver = DualSourceResolver::new(authority, PriorityEngine::new(&config), store.clone());
    let route = [
        LocationSample::new(12.9716, 77.5946, 40.0),
        LocationSample::new(12.9750, 77.5980, 40.0),
        LocationSample::new(12.9800, 77.6000, 40.0),
    ];
    for sample in &route {
        let response = resolver.resolve_at(sample, now());
        assert_eq!(response.source, ResponseSource::Authoritative);
        assert_eq!(response.signal_status, SignalStatus::Green);
    }

    let service_view = resolver.service().signals();
    drop(resolver);
    let stats = push_thread.join().unwrap();

    // 1 on, then 1 off + 2 on, then 2 off + 3 on
    assert_eq!(stats.applied, 5);
    assert_eq!(stats.malformed, 0);
    assert_eq!(store.snapshot(), service_view);
    assert!(store.get(3).unwrap().is_green());
}

#[test]
fn flaky_service_alternates_paths() {
    let config = EngineConfig::default();
    let store = SignalStore::new(demo_roster()).unwrap();
    let authority = SimulatedAuthority::new(demo_roster(), &config)
        .with_availability(Availability::FailEvery(2));
    let mut resolver = DualSourceResolver::new(authority, PriorityEngine::new(&config), store);

    let sample = LocationSample::new(12.9716, 77.5946, 40.0);
    let sources: Vec<ResponseSource> = (0..4).map(|_| resolver.resolve_at(&sample, now()).source).collect();
    assert_eq!(
        sources,
        vec![
            ResponseSource::Authoritative,
            ResponseSource::Local,
            ResponseSource::Authoritative,
            ResponseSource::Local,
        ]
    );
    assert_eq!(resolver.stats(), ResolverStats { authoritative: 2, fallback: 2 });
}
