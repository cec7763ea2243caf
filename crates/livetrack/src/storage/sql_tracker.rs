//! SQL-backed tracker storage using PostgreSQL via sqlx.
//!
//! Persists the tracked selection history and one state row per match so
//! that a new leader resumes from the counters its predecessor wrote.
//!
//! This module is only available when the `sql` feature is enabled.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::error::TrackerError;
use crate::tracker_storage::{TrackedSelection, TrackedState, TrackerStorage};
use crate::types::LeaderId;

/// PostgreSQL-backed tracker storage.
pub struct SqlTrackerStorage {
    pool: PgPool,
}

impl SqlTrackerStorage {
    /// Create a new SQL tracker storage with the given connection pool.
    ///
    /// **Important:** call [`migrate()`](Self::migrate) before use.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `tracked_selection`, `tracked_state` and `tracker_locks`
    /// tables. Safe to call repeatedly.
    pub async fn migrate(&self) -> Result<(), TrackerError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| TrackerError::persistence(format!("tracker migration failed: {e}"), e))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn counter(row: &PgRow, column: &str) -> Result<u32, TrackerError> {
    let raw: i64 = row.try_get(column).map_err(|e| {
        TrackerError::persistence(format!("failed to read '{column}' column: {e}"), e)
    })?;
    u32::try_from(raw).map_err(|e| TrackerError::MalformedRecord {
        reason: format!("column '{column}' holds out-of-range counter {raw}"),
        source: Some(Box::new(e)),
    })
}

fn text(row: &PgRow, column: &str) -> Result<String, TrackerError> {
    row.try_get(column)
        .map_err(|e| TrackerError::persistence(format!("failed to read '{column}' column: {e}"), e))
}

fn optional_text(row: &PgRow, column: &str) -> Result<Option<String>, TrackerError> {
    row.try_get(column)
        .map_err(|e| TrackerError::persistence(format!("failed to read '{column}' column: {e}"), e))
}

#[async_trait]
impl TrackerStorage for SqlTrackerStorage {
    async fn get_state(&self, match_id: &str) -> Result<Option<TrackedState>, TrackerError> {
        let row = sqlx::query(
            "SELECT match_id, home, away, round, last_run, leader_id
             FROM tracked_state WHERE match_id = $1",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TrackerError::persistence(format!("get_state failed: {e}"), e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(TrackedState {
            match_id: text(&row, "match_id")?,
            home: counter(&row, "home")?,
            away: counter(&row, "away")?,
            round: counter(&row, "round")?,
            last_run: text(&row, "last_run")?,
            leader_id: LeaderId::new(text(&row, "leader_id")?),
        }))
    }

    async fn put_state(&self, state: &TrackedState) -> Result<(), TrackerError> {
        sqlx::query(
            "INSERT INTO tracked_state (match_id, home, away, round, last_run, leader_id, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             ON CONFLICT (match_id) DO UPDATE SET
                home = $2, away = $3, round = $4, last_run = $5, leader_id = $6, updated_at = NOW()",
        )
        .bind(&state.match_id)
        .bind(i64::from(state.home))
        .bind(i64::from(state.away))
        .bind(i64::from(state.round))
        .bind(&state.last_run)
        .bind(state.leader_id.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| TrackerError::persistence(format!("put_state failed: {e}"), e))?;

        Ok(())
    }

    async fn get_selection(&self) -> Result<Option<TrackedSelection>, TrackerError> {
        let row = sqlx::query(
            "SELECT match_id, team FROM tracked_selection ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TrackerError::persistence(format!("get_selection failed: {e}"), e))?;

        match row {
            Some(row) => Ok(Some(TrackedSelection {
                match_id: optional_text(&row, "match_id")?,
                team: optional_text(&row, "team")?,
            })),
            None => Ok(None),
        }
    }

    async fn set_selection(
        &self,
        match_id: Option<&str>,
        team: Option<&str>,
    ) -> Result<TrackedSelection, TrackerError> {
        let row = sqlx::query(
            "INSERT INTO tracked_selection (match_id, team) VALUES ($1, $2)
             RETURNING match_id, team",
        )
        .bind(match_id)
        .bind(team)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TrackerError::persistence(format!("set_selection failed: {e}"), e))?;

        Ok(TrackedSelection {
            match_id: optional_text(&row, "match_id")?,
            team: optional_text(&row, "team")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_tracker_storage_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqlTrackerStorage>();
    }
}
