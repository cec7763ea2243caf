//! PostgreSQL lock backend.
//!
//! Each key is a row in `tracker_locks` with an expiry. Acquisition is a
//! single upsert that only overwrites an expired row, so the database
//! serializes concurrent contenders. Useful when a deployment already has
//! PostgreSQL but no etcd.
//!
//! This module is only available when the `sql` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::error::TrackerError;
use crate::lock::LockBackend;
use crate::types::LeaderId;

/// Lock backend storing expiring rows in PostgreSQL.
///
/// Expects the schema created by
/// [`SqlTrackerStorage::migrate`](super::sql_tracker::SqlTrackerStorage::migrate).
pub struct SqlLockBackend {
    pool: PgPool,
}

impl SqlLockBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_err(op: &str, e: sqlx::Error) -> TrackerError {
        TrackerError::CoordinationError {
            reason: format!("sql lock {op} failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl LockBackend for SqlLockBackend {
    async fn try_acquire(
        &self,
        key: &str,
        holder: &LeaderId,
        ttl: Duration,
    ) -> Result<bool, TrackerError> {
        let result = sqlx::query(
            "INSERT INTO tracker_locks (key, holder, expires_at)
             VALUES ($1, $2, NOW() + make_interval(secs => $3))
             ON CONFLICT (key) DO UPDATE SET
                holder = EXCLUDED.holder,
                expires_at = EXCLUDED.expires_at
             WHERE tracker_locks.expires_at <= NOW()",
        )
        .bind(key)
        .bind(holder.as_ref())
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_err("acquire", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, key: &str) -> Result<(), TrackerError> {
        sqlx::query("DELETE FROM tracker_locks WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_err("release", e))?;
        Ok(())
    }
}
