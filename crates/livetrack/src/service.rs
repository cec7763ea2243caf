//! Process-level entry point: wires the emitter into a scheduler and exposes
//! the administrative surface.

use std::sync::Arc;

use crate::context::TrackerContext;
use crate::delivery::DeliveryQueue;
use crate::emitter::{CycleOutcome, Emitter};
use crate::error::TrackerError;
use crate::lock::CoordinationMode;
use crate::random::RandomSource;
use crate::scheduler::Scheduler;
use crate::selection::SelectionResolver;
use crate::tracker_storage::TrackedSelection;

const SCHEDULER_NAME: &str = "match-tracker";

pub struct TrackerService {
    ctx: Arc<TrackerContext>,
    emitter: Arc<Emitter>,
    scheduler: Scheduler,
}

impl TrackerService {
    pub fn new(ctx: TrackerContext) -> Self {
        let ctx = Arc::new(ctx);
        Self::with_emitter(Arc::new(Emitter::with_entropy(Arc::clone(&ctx))))
    }

    /// Service drawing from the given random source.
    pub fn with_random(ctx: TrackerContext, rng: Box<dyn RandomSource>) -> Self {
        Self::with_emitter(Arc::new(Emitter::new(Arc::new(ctx), rng)))
    }

    fn with_emitter(emitter: Arc<Emitter>) -> Self {
        let ctx = Arc::clone(emitter.context());
        let scheduler = Scheduler::new(SCHEDULER_NAME, Arc::clone(&emitter).into_job());
        Self {
            ctx,
            emitter,
            scheduler,
        }
    }

    /// Start the periodic emitter. Does nothing and returns `false` when the
    /// tracker is disabled in config or already running.
    pub fn start(&self) -> bool {
        if !self.ctx.config.enabled {
            tracing::info!("tracker disabled, not starting scheduler");
            return false;
        }
        self.scheduler.start(self.ctx.config.interval)
    }

    /// Stop the periodic emitter, waiting for an in-flight cycle.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Run a single cycle outside the schedule.
    pub async fn run_once(&self) -> Result<CycleOutcome, TrackerError> {
        self.emitter.run_cycle().await
    }

    /// Designate the match to track. `None` or an empty id clears it.
    pub async fn select(&self, match_id: Option<&str>, team: Option<&str>) -> TrackedSelection {
        self.ctx.resolver.set_selection(match_id, team).await
    }

    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.ctx.queue
    }

    pub fn resolver(&self) -> &Arc<SelectionResolver> {
        &self.ctx.resolver
    }

    pub fn context(&self) -> &Arc<TrackerContext> {
        &self.ctx
    }

    pub fn mode(&self) -> CoordinationMode {
        self.ctx.mode()
    }
}
