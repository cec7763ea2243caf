use crate::error::TrackerError;
use crate::types::LeaderId;
use std::time::Duration;

/// Lock key shared by every emitter instance.
pub const DEFAULT_LOCK_KEY: &str = "esports:tracker:lock";

/// Configuration for the tracker emitter.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Whether the scheduled emitter runs at all. Default: false.
    pub enabled: bool,
    /// Time between emitter cycles. Default: 3s.
    pub interval: Duration,
    /// Expiry of the leadership lock. Bounds how long a crashed leader can
    /// block other instances. Default: 10s.
    pub lock_ttl: Duration,
    /// Key contended for by all instances. Default: `esports:tracker:lock`.
    pub lock_key: String,
    /// Identifier written into `TrackedState::leader_id` by this process.
    pub leader_id: LeaderId,
}

impl TrackerConfig {
    /// Validate configuration values.
    ///
    /// Checks:
    /// - `interval > 0` (a zero period would spin the scheduler)
    /// - `lock_ttl > 0` (a zero TTL never excludes anyone)
    /// - `lock_key` and `leader_id` are non-empty
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.interval.is_zero() {
            return Err(TrackerError::InvalidConfig {
                reason: "interval must be > 0".to_string(),
            });
        }
        if self.lock_ttl.is_zero() {
            return Err(TrackerError::InvalidConfig {
                reason: "lock_ttl must be > 0".to_string(),
            });
        }
        if self.lock_key.trim().is_empty() {
            return Err(TrackerError::InvalidConfig {
                reason: "lock_key must not be empty".to_string(),
            });
        }
        if self.leader_id.as_ref().is_empty() {
            return Err(TrackerError::InvalidConfig {
                reason: "leader_id must not be empty".to_string(),
            });
        }
        if self.lock_ttl < self.interval {
            tracing::warn!(
                lock_ttl = ?self.lock_ttl,
                interval = ?self.interval,
                "lock_ttl is shorter than the interval; a crashed leader is only detected by expiry"
            );
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(3),
            lock_ttl: Duration::from_secs(10),
            lock_key: DEFAULT_LOCK_KEY.to_string(),
            leader_id: LeaderId::generate(),
        }
    }
}
