//! The scheduled job body.
//!
//! One cycle: `LockAttempt → {Skipped | Leading} → Released`. While leading,
//! the emitter resolves the tracked match, loads its counters, synthesizes
//! events, pushes them to the delivery queue and persists the new counters.
//! The lock is released on every path out of `Leading`, including errors and
//! panics.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use crate::context::TrackerContext;
use crate::envelope::Envelope;
use crate::error::TrackerError;
use crate::lock::{Acquisition, CoordinationMode};
use crate::random::{RandomSource, SeededRandom};
use crate::scheduler::Job;
use crate::synthesis::synthesize;
use crate::tracker_storage::TrackedState;
use crate::types::Score;

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another instance holds the lock. Nothing was touched.
    Skipped,
    /// Led, but no match is tracked. The lock was released.
    Idle,
    /// Led and advanced the tracked match.
    Emitted(CycleReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub match_id: String,
    pub team: Option<String>,
    /// Counters the cycle started from.
    pub previous: Score,
    /// Counters after the cycle.
    pub score: Score,
    /// Envelopes pushed to the delivery queue.
    pub envelopes: usize,
    /// Whether the new counters reached the store.
    pub persisted: bool,
}

pub struct Emitter {
    ctx: Arc<TrackerContext>,
    rng: Mutex<Box<dyn RandomSource>>,
    /// Counters this process last computed per match. Merged with the stored
    /// record on load so a failed write does not roll counters back.
    local: DashMap<String, Score>,
    leading: AtomicBool,
    /// Serializes cycles of this emitter, so a manual run and a scheduled tick
    /// never write the same match out of order.
    cycle: tokio::sync::Mutex<()>,
}

impl Emitter {
    pub fn new(ctx: Arc<TrackerContext>, rng: Box<dyn RandomSource>) -> Self {
        Self {
            ctx,
            rng: Mutex::new(rng),
            local: DashMap::new(),
            leading: AtomicBool::new(false),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Emitter drawing from an entropy-seeded generator.
    pub fn with_entropy(ctx: Arc<TrackerContext>) -> Self {
        Self::new(ctx, Box::new(SeededRandom::from_entropy()))
    }

    pub fn context(&self) -> &Arc<TrackerContext> {
        &self.ctx
    }

    /// Run one cycle.
    ///
    /// Lock contention and a missing selection are reported as outcomes, not
    /// errors. An `Err` means the cycle led but aborted; the lock has already
    /// been released when this returns. Concurrent calls on one emitter run
    /// one after the other.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, TrackerError> {
        let _cycle = self.cycle.lock().await;
        let key = self.ctx.config.lock_key.as_str();
        let ttl = self.ctx.config.lock_ttl;

        match self.ctx.lock.try_lead(key, ttl).await {
            Acquisition::Contended => {
                if self.leading.swap(false, Ordering::AcqRel) {
                    tracing::info!(leader_id = %self.ctx.config.leader_id, "lost tracker leadership");
                }
                self.ctx.metrics.cycles_skipped.inc();
                tracing::debug!(key, "lock held by another instance, skipping cycle");
                return Ok(CycleOutcome::Skipped);
            }
            Acquisition::Assumed if self.ctx.mode() == CoordinationMode::Distributed => {
                self.ctx.metrics.lock_fallbacks.inc();
            }
            Acquisition::Assumed | Acquisition::Acquired => {}
        }

        if !self.leading.swap(true, Ordering::AcqRel) {
            tracing::info!(leader_id = %self.ctx.config.leader_id, "acquired tracker leadership");
        }
        self.ctx.metrics.cycles_led.inc();

        let result = AssertUnwindSafe(self.lead()).catch_unwind().await;
        self.ctx.lock.release(key).await;

        match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                self.ctx.metrics.cycles_failed.inc();
                Err(e)
            }
            Err(panic) => {
                self.ctx.metrics.cycles_failed.inc();
                Err(TrackerError::CycleAborted {
                    reason: panic_reason(panic.as_ref()),
                })
            }
        }
    }

    /// Body of the `Leading` state. Runs with the lock held.
    async fn lead(&self) -> Result<CycleOutcome, TrackerError> {
        let Some(selection) = self.ctx.resolver.resolve().await else {
            self.ctx.metrics.cycles_idle.inc();
            tracing::debug!("no tracked match, nothing to emit");
            return Ok(CycleOutcome::Idle);
        };
        let match_id = selection.match_id;

        // A failed read aborts the cycle: starting from zero would move a
        // persisted record backwards.
        let stored = self.ctx.storage.get_state(&match_id).await?;
        if let Some(stored) = &stored {
            if stored.leader_id != self.ctx.config.leader_id {
                tracing::debug!(
                    match_id = %match_id,
                    previous_leader = %stored.leader_id,
                    home = stored.home,
                    away = stored.away,
                    round = stored.round,
                    "resuming state written by another leader"
                );
            }
        }
        let stored_score = stored.map(|s| s.score()).unwrap_or_default();
        let previous = match self.local.get(&match_id) {
            Some(local) => stored_score.merge(*local),
            None => stored_score,
        };

        let now = Utc::now();
        let timestamp = now.timestamp_micros() as f64 / 1_000_000.0;
        let synthesis = {
            let mut rng = self.rng.lock();
            synthesize(previous, rng.as_mut(), timestamp)
        };

        let envelopes = synthesis.updates.len();
        for update in synthesis.updates {
            self.ctx
                .queue
                .push(&match_id, Envelope::new(match_id.clone(), update));
        }
        self.ctx.metrics.envelopes_emitted.inc_by(envelopes as u64);
        self.local.insert(match_id.clone(), synthesis.score);

        let state = TrackedState {
            match_id: match_id.clone(),
            home: synthesis.score.home,
            away: synthesis.score.away,
            round: synthesis.score.round,
            last_run: now.to_rfc3339(),
            leader_id: self.ctx.config.leader_id.clone(),
        };
        let persisted = match self.ctx.storage.put_state(&state).await {
            Ok(()) => true,
            Err(e) => {
                self.ctx.metrics.persist_failures.inc();
                tracing::warn!(
                    match_id = %match_id,
                    error = %e,
                    "failed to persist tracked state, counters kept in memory"
                );
                false
            }
        };

        tracing::trace!(
            match_id = %match_id,
            envelopes,
            home = synthesis.score.home,
            away = synthesis.score.away,
            round = synthesis.score.round,
            "emitter cycle complete"
        );

        Ok(CycleOutcome::Emitted(CycleReport {
            match_id,
            team: selection.team,
            previous,
            score: synthesis.score,
            envelopes,
            persisted,
        }))
    }

    /// Wrap this emitter as a scheduler job.
    pub fn into_job(self: Arc<Self>) -> Job {
        Arc::new(move || -> BoxFuture<'static, Result<(), TrackerError>> {
            let emitter = Arc::clone(&self);
            Box::pin(async move { emitter.run_cycle().await.map(|_| ()) })
        })
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
