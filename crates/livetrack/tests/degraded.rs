use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livetrack::config::TrackerConfig;
use livetrack::context::TrackerContext;
use livetrack::emitter::{CycleOutcome, Emitter};
use livetrack::envelope::MatchUpdate;
use livetrack::error::TrackerError;
use livetrack::lock::{CoordinationMode, LockBackend};
use livetrack::metrics::TrackerMetrics;
use livetrack::random::{FixedRandom, ScriptedRandom};
use livetrack::storage::memory_tracker::MemoryTrackerStorage;
use livetrack::tracker_storage::TrackerStorage;
use livetrack::types::{LeaderId, Score, Side};

/// Lock backend whose server is down.
struct DownLock;

#[async_trait]
impl LockBackend for DownLock {
    async fn try_acquire(
        &self,
        _key: &str,
        _holder: &LeaderId,
        _ttl: Duration,
    ) -> Result<bool, TrackerError> {
        Err(TrackerError::CoordinationError {
            reason: "connection refused".into(),
            source: None,
        })
    }

    async fn release(&self, _key: &str) -> Result<(), TrackerError> {
        Err(TrackerError::CoordinationError {
            reason: "connection refused".into(),
            source: None,
        })
    }
}

fn emitter(
    lock: Option<Arc<dyn LockBackend>>,
    storage: Arc<MemoryTrackerStorage>,
    rng: ScriptedRandom,
) -> Emitter {
    let config = TrackerConfig {
        leader_id: LeaderId::new("solo"),
        ..Default::default()
    };
    let ctx = TrackerContext::new(
        config,
        lock,
        storage,
        Arc::new(TrackerMetrics::unregistered()),
    )
    .unwrap();
    Emitter::new(Arc::new(ctx), Box::new(rng))
}

/// round start no, kill no, objective no, round end yes, home wins, heartbeat no
fn home_round_win() -> ScriptedRandom {
    ScriptedRandom::new([0.9, 0.9, 0.9, 0.0, 0.0, 0.9], 0.99)
}

#[tokio::test]
async fn unreachable_lock_backend_degrades_to_leading() {
    let storage = Arc::new(MemoryTrackerStorage::new());
    storage.set_selection(Some("m1"), None).await.unwrap();
    let lock: Arc<dyn LockBackend> = Arc::new(DownLock);
    let e = emitter(Some(lock), storage.clone(), home_round_win());
    assert_eq!(e.context().mode(), CoordinationMode::Distributed);

    let CycleOutcome::Emitted(report) = e.run_cycle().await.unwrap() else {
        panic!("expected the cycle to lead");
    };
    assert_eq!(report.score, Score::new(1, 0, 0));

    let queue = &e.context().queue;
    let first = queue.pop("m1").unwrap();
    assert!(matches!(
        first.update,
        MatchUpdate::RoundEnd {
            round: 0,
            home: 1,
            away: 0,
            ..
        }
    ));
    assert!(matches!(
        queue.pop("m1").unwrap().update,
        MatchUpdate::Score { home: 1, away: 0, .. }
    ));
    assert!(queue.pop("m1").is_none());

    let stored = storage.get_state("m1").await.unwrap().unwrap();
    assert_eq!(stored.score(), Score::new(1, 0, 0));
    assert_eq!(stored.leader_id, LeaderId::new("solo"));
    assert_eq!(e.context().metrics.lock_fallbacks.get(), 1);
}

#[tokio::test]
async fn single_instance_always_leads() {
    let storage = Arc::new(MemoryTrackerStorage::new());
    storage.set_selection(Some("m1"), None).await.unwrap();
    let e = emitter(None, storage.clone(), ScriptedRandom::new(Vec::new(), 0.0));
    assert_eq!(e.context().mode(), CoordinationMode::SingleInstance);

    for _ in 0..3 {
        assert!(matches!(
            e.run_cycle().await.unwrap(),
            CycleOutcome::Emitted(_)
        ));
    }
    assert_eq!(
        storage.get_state("m1").await.unwrap().unwrap().score(),
        Score::new(3, 0, 3)
    );
    assert_eq!(e.context().metrics.lock_fallbacks.get(), 0);
}

#[tokio::test]
async fn fixed_draws_emit_every_kind_in_order() {
    let storage = Arc::new(MemoryTrackerStorage::new());
    storage.set_selection(Some("m9"), Some("Team Foo")).await.unwrap();
    let config = TrackerConfig::default();
    let ctx = TrackerContext::new(
        config,
        None,
        storage.clone(),
        Arc::new(TrackerMetrics::unregistered()),
    )
    .unwrap();
    let e = Emitter::new(Arc::new(ctx), Box::new(FixedRandom::new(0.0)));

    let CycleOutcome::Emitted(report) = e.run_cycle().await.unwrap() else {
        panic!("expected the cycle to lead");
    };
    assert_eq!(report.team.as_deref(), Some("Team Foo"));
    assert_eq!(report.envelopes, 6);

    let queue = &e.context().queue;
    let updates: Vec<_> = std::iter::from_fn(|| queue.pop("m9")).map(|e| e.update).collect();
    let timestamp = updates[0].timestamp();
    assert!(updates.iter().all(|u| u.timestamp() == timestamp));
    assert_eq!(
        updates,
        vec![
            MatchUpdate::RoundStart { round: 1, timestamp },
            MatchUpdate::Kill {
                killer: "Player1".into(),
                victim: "Player11".into(),
                team: Side::Home,
                timestamp,
            },
            MatchUpdate::Objective {
                objective: livetrack::envelope::Objective::BombPlanted,
                team: Side::Home,
                timestamp,
            },
            MatchUpdate::RoundEnd {
                round: 1,
                home: 1,
                away: 0,
                timestamp,
            },
            MatchUpdate::Score {
                home: 1,
                away: 0,
                timestamp,
            },
            MatchUpdate::Score {
                home: 1,
                away: 0,
                timestamp,
            },
        ]
    );
}

#[tokio::test]
async fn counters_advance_through_a_storage_write_outage() {
    let storage = Arc::new(MemoryTrackerStorage::new());
    storage.set_selection(Some("m1"), None).await.unwrap();
    let e = emitter(None, storage.clone(), ScriptedRandom::new(Vec::new(), 0.0));

    e.run_cycle().await.unwrap();
    storage.set_writes_failing(true);
    for _ in 0..3 {
        let CycleOutcome::Emitted(report) = e.run_cycle().await.unwrap() else {
            panic!("expected the cycle to lead");
        };
        assert!(!report.persisted);
    }
    storage.set_writes_failing(false);

    let CycleOutcome::Emitted(report) = e.run_cycle().await.unwrap() else {
        panic!("expected the cycle to lead");
    };
    assert!(report.persisted);
    assert_eq!(report.score, Score::new(5, 0, 5));
    assert_eq!(
        storage.get_state("m1").await.unwrap().unwrap().score(),
        Score::new(5, 0, 5)
    );
    assert_eq!(e.context().metrics.persist_failures.get(), 3);
    assert_eq!(e.context().queue.len("m1"), 30);
}
