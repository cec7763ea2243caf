use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::types::{LeaderId, Score};

/// The match (and optionally team) an administrator designated for tracking.
/// The most recent write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSelection {
    pub match_id: Option<String>,
    pub team: Option<String>,
}

impl TrackedSelection {
    pub fn new(match_id: Option<impl Into<String>>, team: Option<impl Into<String>>) -> Self {
        Self {
            match_id: match_id.map(Into::into),
            team: team.map(Into::into),
        }
    }
}

/// Durable per-match counters plus the metadata of the last writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedState {
    pub match_id: String,
    pub home: u32,
    pub away: u32,
    pub round: u32,
    /// RFC 3339 time of the cycle that wrote this record.
    pub last_run: String,
    pub leader_id: LeaderId,
}

impl TrackedState {
    pub fn score(&self) -> Score {
        Score::new(self.home, self.away, self.round)
    }
}

/// Storage backend for tracked selections and per-match state.
#[async_trait]
pub trait TrackerStorage: Send + Sync {
    /// Load the state record for `match_id`, or `None` if none exists yet.
    async fn get_state(&self, match_id: &str) -> Result<Option<TrackedState>, TrackerError>;

    /// Overwrite the state record for `state.match_id`. Callers must already
    /// have merged with the previously loaded record.
    async fn put_state(&self, state: &TrackedState) -> Result<(), TrackerError>;

    /// The newest tracked selection, if one was ever written.
    async fn get_selection(&self) -> Result<Option<TrackedSelection>, TrackerError>;

    /// Record a new tracked selection and return it.
    async fn set_selection(
        &self,
        match_id: Option<&str>,
        team: Option<&str>,
    ) -> Result<TrackedSelection, TrackerError>;
}
