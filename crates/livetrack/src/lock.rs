//! Leadership lock around emitter cycles.
//!
//! A [`LockBackend`] provides the atomic primitives (set-if-absent with expiry,
//! unconditional delete). [`DistributedLock`] wraps an optional backend and
//! applies the availability policy: without a backend, or when the backend
//! fails, the caller is assumed to be the leader so the job keeps running.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TrackerError;
use crate::types::LeaderId;

/// Storage backend for the leadership lock.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Atomically create `key` with the given expiry if it does not exist or
    /// has expired. Returns `true` only when this call created it.
    async fn try_acquire(
        &self,
        key: &str,
        holder: &LeaderId,
        ttl: Duration,
    ) -> Result<bool, TrackerError>;

    /// Delete `key` regardless of who holds it. Deleting a missing key is not
    /// an error.
    async fn release(&self, key: &str) -> Result<(), TrackerError>;
}

/// How this process coordinates with other instances. Computed once at
/// startup from whether a lock backend was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationMode {
    /// A lock backend serializes leaders across processes.
    Distributed,
    /// No backend: this process always leads.
    SingleInstance,
}

/// Result of a single lock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// The backend granted the lock to this caller.
    Acquired,
    /// Another holder has the lock.
    Contended,
    /// Leadership assumed without coordination, either because no backend is
    /// configured or because the backend could not be reached.
    Assumed,
}

impl Acquisition {
    pub fn is_leader(&self) -> bool {
        !matches!(self, Acquisition::Contended)
    }
}

/// Leadership lock with the degrade-to-single-instance policy applied.
#[derive(Clone)]
pub struct DistributedLock {
    backend: Option<Arc<dyn LockBackend>>,
    holder: LeaderId,
}

impl DistributedLock {
    /// Lock coordinated through `backend`.
    pub fn distributed(backend: Arc<dyn LockBackend>, holder: LeaderId) -> Self {
        Self {
            backend: Some(backend),
            holder,
        }
    }

    /// Lock for a process running without any coordination backend.
    pub fn single_instance(holder: LeaderId) -> Self {
        Self {
            backend: None,
            holder,
        }
    }

    pub fn mode(&self) -> CoordinationMode {
        match self.backend {
            Some(_) => CoordinationMode::Distributed,
            None => CoordinationMode::SingleInstance,
        }
    }

    pub fn holder(&self) -> &LeaderId {
        &self.holder
    }

    /// Returns `true` if this process may lead for the next `ttl`.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> bool {
        self.try_lead(key, ttl).await.is_leader()
    }

    /// Like [`acquire`](Self::acquire), but reports why leadership was granted.
    pub async fn try_lead(&self, key: &str, ttl: Duration) -> Acquisition {
        let Some(backend) = &self.backend else {
            return Acquisition::Assumed;
        };
        match backend.try_acquire(key, &self.holder, ttl).await {
            Ok(true) => Acquisition::Acquired,
            Ok(false) => Acquisition::Contended,
            Err(e) => {
                tracing::warn!(
                    key,
                    leader_id = %self.holder,
                    error = %e,
                    "lock backend unavailable, assuming leadership"
                );
                Acquisition::Assumed
            }
        }
    }

    /// Delete the lock key. Failures are logged; the key expires on its own.
    pub async fn release(&self, key: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.release(key).await {
            tracing::warn!(
                key,
                leader_id = %self.holder,
                error = %e,
                "failed to release lock, it will expire via TTL"
            );
        }
    }
}
