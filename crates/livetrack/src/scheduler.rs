//! Fixed-interval ticker.
//!
//! Runs a job every `interval` on a background task. At most one invocation of
//! the job runs at a time: a tick that falls due while the job is still running
//! is delayed until it returns. The first invocation happens one interval after
//! [`Scheduler::start`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::TrackerError;

/// A boxed job function, reusable across ticks.
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, Result<(), TrackerError>> + Send + Sync>;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Scheduler {
    name: String,
    job: Job,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>, job: Job) -> Self {
        Self {
            name: name.into(),
            job,
            running: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start ticking. Returns `false` without doing anything if already
    /// running.
    pub fn start(&self, interval: Duration) -> bool {
        let mut running = self.running.lock();
        if running.is_some() {
            tracing::debug!(scheduler = %self.name, "scheduler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            self.name.clone(),
            Arc::clone(&self.job),
            interval,
            cancel.clone(),
        ));
        *running = Some(Running { cancel, handle });
        tracing::info!(scheduler = %self.name, interval_ms = interval.as_millis() as u64, "scheduler started");
        true
    }

    /// Stop ticking. An in-flight job is allowed to finish; this returns once
    /// it has. Calling `stop` on a stopped scheduler is a no-op.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            tracing::warn!(scheduler = %self.name, error = %e, "scheduler task ended abnormally");
        }
        tracing::info!(scheduler = %self.name, "scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

async fn tick_loop(name: String, job: Job, interval: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Run outside the select so cancellation never interrupts a job.
        match AssertUnwindSafe(job()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(scheduler = %name, error = %e, "scheduled job failed");
            }
            Err(_) => {
                tracing::error!(scheduler = %name, "scheduled job panicked");
            }
        }
    }
}
