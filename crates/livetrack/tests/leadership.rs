use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livetrack::config::TrackerConfig;
use livetrack::context::TrackerContext;
use livetrack::emitter::{CycleOutcome, Emitter};
use livetrack::error::TrackerError;
use livetrack::lock::LockBackend;
use livetrack::metrics::TrackerMetrics;
use livetrack::random::{FixedRandom, RandomSource, SeededRandom};
use livetrack::service::TrackerService;
use livetrack::storage::memory_lock::MemoryLockBackend;
use livetrack::storage::memory_tracker::MemoryTrackerStorage;
use livetrack::testing::TestTracker;
use livetrack::tracker_storage::{TrackedSelection, TrackedState, TrackerStorage};
use livetrack::types::{LeaderId, Score};

/// Storage whose writes take a while, so a leader holds the lock long enough
/// for competing instances to observe it.
struct SlowStorage {
    inner: MemoryTrackerStorage,
    write_delay: Duration,
}

#[async_trait]
impl TrackerStorage for SlowStorage {
    async fn get_state(&self, match_id: &str) -> Result<Option<TrackedState>, TrackerError> {
        self.inner.get_state(match_id).await
    }

    async fn put_state(&self, state: &TrackedState) -> Result<(), TrackerError> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.put_state(state).await
    }

    async fn get_selection(&self) -> Result<Option<TrackedSelection>, TrackerError> {
        self.inner.get_selection().await
    }

    async fn set_selection(
        &self,
        match_id: Option<&str>,
        team: Option<&str>,
    ) -> Result<TrackedSelection, TrackerError> {
        self.inner.set_selection(match_id, team).await
    }
}

fn config(leader: &str) -> TrackerConfig {
    TrackerConfig {
        enabled: true,
        interval: Duration::from_secs(3),
        lock_ttl: Duration::from_secs(10),
        leader_id: LeaderId::new(leader),
        ..Default::default()
    }
}

fn context(
    leader: &str,
    lock: &Arc<MemoryLockBackend>,
    storage: Arc<dyn TrackerStorage>,
) -> TrackerContext {
    TrackerContext::new(
        config(leader),
        Some(lock.clone() as Arc<dyn LockBackend>),
        storage,
        Arc::new(TrackerMetrics::unregistered()),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn concurrent_instances_elect_one_leader_per_cycle() {
    let lock = Arc::new(MemoryLockBackend::new());
    let storage: Arc<dyn TrackerStorage> = Arc::new(SlowStorage {
        inner: MemoryTrackerStorage::new(),
        write_delay: Duration::from_millis(200),
    });
    storage.set_selection(Some("m1"), None).await.unwrap();

    let emitters: Vec<_> = (0..5)
        .map(|i| {
            let ctx = Arc::new(context(&format!("node-{i}"), &lock, storage.clone()));
            Emitter::new(ctx, Box::new(FixedRandom::new(0.0)))
        })
        .collect();

    let outcomes = futures::future::join_all(emitters.iter().map(|e| e.run_cycle())).await;
    let led = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(CycleOutcome::Emitted(_))))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(CycleOutcome::Skipped)))
        .count();
    assert_eq!(led, 1);
    assert_eq!(skipped, 4);

    let queued: usize = emitters.iter().map(|e| e.context().queue.len("m1")).sum();
    assert_eq!(queued, 6);
    assert_eq!(
        storage.get_state("m1").await.unwrap().unwrap().score(),
        Score::new(1, 0, 1)
    );

    // The lock was released, so the next round can be led again.
    assert!(lock.holder("esports:tracker:lock").is_none());
}

#[tokio::test]
async fn leadership_handoff_never_moves_counters_backwards() {
    let a = TestTracker::distributed(Box::new(SeededRandom::seeded(1)));
    let b = a.peer("b", Box::new(SeededRandom::seeded(2)));
    a.select("m1").await;

    let mut last = Score::default();
    for i in 0..200 {
        let leader = if i % 3 == 0 { &b } else { &a };
        let CycleOutcome::Emitted(report) = leader.run_cycle().await.unwrap() else {
            panic!("cycle {i} did not lead");
        };
        assert_eq!(report.previous, last, "cycle {i} did not resume stored state");
        assert!(report.score.dominates(&last));

        let stored = a.state("m1").await.unwrap();
        assert_eq!(stored.score(), report.score);
        assert_eq!(&stored.leader_id, leader.leader_id());
        last = stored.score();
    }
    assert!(last.round > 0);
}

#[tokio::test]
async fn panicking_cycle_hands_lock_to_next_instance() {
    struct Faulty;
    impl RandomSource for Faulty {
        fn next_f64(&mut self) -> f64 {
            panic!("rng fault")
        }
        fn next_in_range(&mut self, low: u32, _high: u32) -> u32 {
            low
        }
    }

    let a = TestTracker::distributed(Box::new(Faulty));
    let b = a.peer("b", Box::new(FixedRandom::new(0.0)));
    a.select("m1").await;

    let err = a.run_cycle().await.unwrap_err();
    assert!(matches!(err, TrackerError::CycleAborted { .. }));
    assert!(a.lock_backend.holder(&a.ctx.config.lock_key).is_none());

    // No TTL wait: the next instance leads straight away.
    assert!(matches!(
        b.run_cycle().await.unwrap(),
        CycleOutcome::Emitted(_)
    ));
    assert!(a.drain("m1").is_empty());
    assert_eq!(b.drain("m1").len(), 6);
}

#[tokio::test(start_paused = true)]
async fn crashed_holder_blocks_only_until_expiry() {
    let t = TestTracker::distributed(Box::new(FixedRandom::new(0.0)));
    t.select("m1").await;
    t.hold_lock_as("crashed-node").await;

    assert_eq!(t.run_cycle().await.unwrap(), CycleOutcome::Skipped);
    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(t.run_cycle().await.unwrap(), CycleOutcome::Skipped);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(matches!(
        t.run_cycle().await.unwrap(),
        CycleOutcome::Emitted(_)
    ));
    assert_eq!(t.ctx.metrics.cycles_skipped.get(), 2);
}

#[tokio::test]
async fn no_selection_leaves_everything_untouched() {
    let a = TestTracker::distributed(Box::new(FixedRandom::new(0.0)));
    let b = a.peer("b", Box::new(FixedRandom::new(0.0)));

    for t in [&a, &b, &a] {
        assert_eq!(t.run_cycle().await.unwrap(), CycleOutcome::Idle);
    }
    assert_eq!(a.storage.state_count(), 0);
    assert!(a.ctx.queue.is_empty());
    assert!(b.ctx.queue.is_empty());
    assert_eq!(a.ctx.metrics.cycles_idle.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn scheduled_instances_neither_lose_nor_repeat_rounds() {
    let lock = Arc::new(MemoryLockBackend::new());
    let storage: Arc<dyn TrackerStorage> = Arc::new(MemoryTrackerStorage::new());

    let services: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|leader| {
            TrackerService::with_random(
                context(leader, &lock, storage.clone()),
                Box::new(FixedRandom::new(0.0)),
            )
        })
        .collect();
    services[0].select(Some("m1"), Some("Team Foo")).await;

    for svc in &services {
        assert!(svc.start());
    }
    tokio::time::sleep(Duration::from_secs(31)).await;
    for svc in &services {
        svc.stop().await;
    }

    let final_round = storage.get_state("m1").await.unwrap().unwrap().round;
    let mut round_starts = Vec::new();
    for svc in &services {
        while let Some(env) = svc.queue().pop("m1") {
            if let livetrack::envelope::MatchUpdate::RoundStart { round, .. } = env.update {
                round_starts.push(round);
            }
        }
    }
    round_starts.sort_unstable();
    let expected: Vec<u32> = (1..=final_round).collect();
    assert_eq!(round_starts, expected);
}

#[tokio::test(start_paused = true)]
async fn overlapping_cycles_on_one_emitter_run_in_turn() {
    let storage: Arc<dyn TrackerStorage> = Arc::new(SlowStorage {
        inner: MemoryTrackerStorage::new(),
        write_delay: Duration::from_millis(200),
    });
    storage.set_selection(Some("m1"), None).await.unwrap();
    let ctx = TrackerContext::new(
        config("solo"),
        None,
        storage.clone(),
        Arc::new(TrackerMetrics::unregistered()),
    )
    .unwrap();
    let emitter = Emitter::new(Arc::new(ctx), Box::new(FixedRandom::new(0.0)));

    // Both would lead in single-instance mode; the second must start from the
    // first one's counters instead of racing it.
    let (first, second) = tokio::join!(emitter.run_cycle(), emitter.run_cycle());
    let (Ok(CycleOutcome::Emitted(first)), Ok(CycleOutcome::Emitted(second))) = (first, second)
    else {
        panic!("both cycles should lead");
    };
    assert_eq!(first.previous, Score::default());
    assert_eq!(second.previous, first.score);
    assert_eq!(second.score, Score::new(2, 0, 2));
    assert_eq!(
        storage.get_state("m1").await.unwrap().unwrap().score(),
        Score::new(2, 0, 2)
    );
}
