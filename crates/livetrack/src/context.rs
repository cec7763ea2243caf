//! Shared resources for one tracker process.
//!
//! Built once at startup and handed to the emitter and scheduler, then
//! dropped at shutdown. Nothing in the crate reaches for process globals.

use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::delivery::DeliveryQueue;
use crate::error::TrackerError;
use crate::lock::{CoordinationMode, DistributedLock, LockBackend};
use crate::metrics::TrackerMetrics;
use crate::selection::SelectionResolver;
use crate::tracker_storage::TrackerStorage;

pub struct TrackerContext {
    pub config: Arc<TrackerConfig>,
    pub lock: DistributedLock,
    pub storage: Arc<dyn TrackerStorage>,
    pub resolver: Arc<SelectionResolver>,
    pub queue: Arc<DeliveryQueue>,
    pub metrics: Arc<TrackerMetrics>,
}

impl TrackerContext {
    /// Validate `config` and wire the components together.
    ///
    /// Passing `None` for `lock_backend` selects
    /// [`CoordinationMode::SingleInstance`].
    pub fn new(
        config: TrackerConfig,
        lock_backend: Option<Arc<dyn LockBackend>>,
        storage: Arc<dyn TrackerStorage>,
        metrics: Arc<TrackerMetrics>,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let lock = match lock_backend {
            Some(backend) => DistributedLock::distributed(backend, config.leader_id.clone()),
            None => DistributedLock::single_instance(config.leader_id.clone()),
        };
        tracing::info!(
            leader_id = %config.leader_id,
            mode = ?lock.mode(),
            "tracker context created"
        );
        Ok(Self {
            config: Arc::new(config),
            lock,
            resolver: Arc::new(SelectionResolver::new(Arc::clone(&storage))),
            storage,
            queue: Arc::new(DeliveryQueue::new()),
            metrics,
        })
    }

    /// Replace the delivery queue, e.g. with one already handed to transports.
    pub fn with_queue(mut self, queue: Arc<DeliveryQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn mode(&self) -> CoordinationMode {
        self.lock.mode()
    }
}
