use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TrackerError;
use crate::types::Side;

/// Objectives a synthetic team can complete.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    BombPlanted,
    TowerDestroyed,
    FlagCaptured,
}

impl Objective {
    pub const ALL: [Objective; 3] = [
        Objective::BombPlanted,
        Objective::TowerDestroyed,
        Objective::FlagCaptured,
    ];
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Objective::BombPlanted => "bomb_planted",
            Objective::TowerDestroyed => "tower_destroyed",
            Objective::FlagCaptured => "flag_captured",
        };
        f.write_str(name)
    }
}

/// A single live update. `timestamp` is seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchUpdate {
    RoundStart {
        round: u32,
        timestamp: f64,
    },
    Kill {
        killer: String,
        victim: String,
        team: Side,
        timestamp: f64,
    },
    Objective {
        objective: Objective,
        team: Side,
        timestamp: f64,
    },
    RoundEnd {
        round: u32,
        home: u32,
        away: u32,
        timestamp: f64,
    },
    Score {
        home: u32,
        away: u32,
        timestamp: f64,
    },
}

impl MatchUpdate {
    /// Wire name of the update type.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchUpdate::RoundStart { .. } => "round_start",
            MatchUpdate::Kill { .. } => "kill",
            MatchUpdate::Objective { .. } => "objective",
            MatchUpdate::RoundEnd { .. } => "round_end",
            MatchUpdate::Score { .. } => "score",
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            MatchUpdate::RoundStart { timestamp, .. }
            | MatchUpdate::Kill { timestamp, .. }
            | MatchUpdate::Objective { timestamp, .. }
            | MatchUpdate::RoundEnd { timestamp, .. }
            | MatchUpdate::Score { timestamp, .. } => *timestamp,
        }
    }
}

/// An update addressed to one match's delivery queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub match_id: String,
    pub update: MatchUpdate,
}

impl Envelope {
    pub fn new(match_id: impl Into<String>, update: MatchUpdate) -> Self {
        Self {
            match_id: match_id.into(),
            update,
        }
    }

    /// Encode as the JSON object transports forward to subscribers.
    pub fn to_json(&self) -> Result<String, TrackerError> {
        serde_json::to_string(self).map_err(|e| TrackerError::MalformedRecord {
            reason: format!("failed to encode envelope for match {}: {e}", self.match_id),
            source: Some(Box::new(e)),
        })
    }
}
