use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::TrackerError;
use crate::lock::LockBackend;
use crate::types::LeaderId;

/// In-memory lock backend for tests and single-process simulations.
///
/// Share one instance (behind an `Arc`) between several emitters to simulate
/// multiple processes contending for the same key. Expiry uses tokio's clock,
/// so paused-time tests can advance past a TTL.
pub struct MemoryLockBackend {
    locks: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    holder: LeaderId,
    expires_at: Instant,
}

impl MemoryLockBackend {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Current unexpired holder of `key`, if any.
    pub fn holder(&self, key: &str) -> Option<LeaderId> {
        let locks = self.locks.lock();
        locks
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.holder.clone())
    }
}

impl Default for MemoryLockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &LeaderId,
        ttl: Duration,
    ) -> Result<bool, TrackerError> {
        let now = Instant::now();
        let mut locks = self.locks.lock();
        if let Some(existing) = locks.get(key) {
            if existing.expires_at > now {
                return Ok(false);
            }
        }
        locks.insert(
            key.to_string(),
            Entry {
                holder: holder.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<(), TrackerError> {
        self.locks.lock().remove(key);
        Ok(())
    }
}
