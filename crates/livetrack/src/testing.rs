//! In-memory tracker harness for unit and integration testing.
//!
//! A [`TestTracker`] owns an emitter wired to an in-memory lock backend and
//! in-memory storage. [`TestTracker::peer`] builds further instances against
//! the same backends, which is how tests model several processes competing
//! for leadership.

use std::sync::Arc;
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::context::TrackerContext;
use crate::emitter::{CycleOutcome, Emitter};
use crate::envelope::Envelope;
use crate::error::TrackerError;
use crate::lock::LockBackend;
use crate::metrics::TrackerMetrics;
use crate::random::RandomSource;
use crate::selection::ResolvedSelection;
use crate::storage::memory_lock::MemoryLockBackend;
use crate::storage::memory_tracker::MemoryTrackerStorage;
use crate::tracker_storage::{TrackedState, TrackerStorage};
use crate::types::LeaderId;

/// One emitter instance plus handles to the shared in-memory backends.
///
/// # Example
///
/// ```ignore
/// let a = TestTracker::distributed(Box::new(FixedRandom::new(0.0)));
/// let b = a.peer("b", Box::new(FixedRandom::new(0.0)));
/// a.select("m1").await;
/// a.emitter.run_cycle().await?;
/// ```
pub struct TestTracker {
    pub ctx: Arc<TrackerContext>,
    pub emitter: Arc<Emitter>,
    pub lock_backend: Arc<MemoryLockBackend>,
    pub storage: Arc<MemoryTrackerStorage>,
    distributed: bool,
}

impl TestTracker {
    /// Instance coordinated through a fresh in-memory lock backend.
    pub fn distributed(rng: Box<dyn RandomSource>) -> Self {
        Self::build(
            test_config("test-leader"),
            Arc::new(MemoryLockBackend::new()),
            Arc::new(MemoryTrackerStorage::new()),
            true,
            rng,
        )
    }

    /// Instance without any lock backend; it always leads.
    pub fn single_instance(rng: Box<dyn RandomSource>) -> Self {
        Self::build(
            test_config("test-leader"),
            Arc::new(MemoryLockBackend::new()),
            Arc::new(MemoryTrackerStorage::new()),
            false,
            rng,
        )
    }

    /// Another instance sharing this one's lock backend and storage, with its
    /// own leader id, delivery queue, metrics and local counter cache.
    pub fn peer(&self, leader_id: &str, rng: Box<dyn RandomSource>) -> Self {
        let config = TrackerConfig {
            leader_id: LeaderId::new(leader_id),
            ..(*self.ctx.config).clone()
        };
        Self::build(
            config,
            Arc::clone(&self.lock_backend),
            Arc::clone(&self.storage),
            self.distributed,
            rng,
        )
    }

    fn build(
        config: TrackerConfig,
        lock_backend: Arc<MemoryLockBackend>,
        storage: Arc<MemoryTrackerStorage>,
        distributed: bool,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let backend: Option<Arc<dyn LockBackend>> = if distributed {
            Some(lock_backend.clone() as Arc<dyn LockBackend>)
        } else {
            None
        };
        let ctx = TrackerContext::new(
            config,
            backend,
            storage.clone(),
            Arc::new(TrackerMetrics::unregistered()),
        )
        .expect("TestTracker config should be valid");
        let ctx = Arc::new(ctx);
        let emitter = Arc::new(Emitter::new(Arc::clone(&ctx), rng));
        Self {
            ctx,
            emitter,
            lock_backend,
            storage,
            distributed,
        }
    }

    pub fn leader_id(&self) -> &LeaderId {
        &self.ctx.config.leader_id
    }

    pub async fn run_cycle(&self) -> Result<CycleOutcome, TrackerError> {
        self.emitter.run_cycle().await
    }

    /// Designate `match_id` through this instance's resolver.
    pub async fn select(&self, match_id: &str) {
        self.ctx.resolver.set_selection(Some(match_id), None).await;
    }

    /// Resolve once so the resolver has a remembered selection.
    pub async fn resolve_once(&self) -> Option<ResolvedSelection> {
        self.ctx.resolver.resolve().await
    }

    /// Stored state for `match_id`, read directly from the shared storage.
    pub async fn state(&self, match_id: &str) -> Option<TrackedState> {
        self.storage
            .get_state(match_id)
            .await
            .expect("memory storage should be readable")
    }

    /// Pop everything queued for `match_id` on this instance.
    pub fn drain(&self, match_id: &str) -> Vec<Envelope> {
        std::iter::from_fn(|| self.ctx.queue.pop(match_id)).collect()
    }

    /// Take the leadership lock directly, as another process would.
    pub async fn try_lock_as(&self, holder: &str) -> bool {
        self.lock_backend
            .try_acquire(
                &self.ctx.config.lock_key,
                &LeaderId::new(holder),
                self.ctx.config.lock_ttl,
            )
            .await
            .expect("memory lock should not fail")
    }

    /// Take the leadership lock as `holder`, panicking if it is held.
    pub async fn hold_lock_as(&self, holder: &str) {
        assert!(
            self.try_lock_as(holder).await,
            "lock already held by {:?}",
            self.lock_backend.holder(&self.ctx.config.lock_key)
        );
    }
}

fn test_config(leader_id: &str) -> TrackerConfig {
    TrackerConfig {
        enabled: true,
        interval: Duration::from_secs(3),
        lock_ttl: Duration::from_secs(10),
        leader_id: LeaderId::new(leader_id),
        ..Default::default()
    }
}
