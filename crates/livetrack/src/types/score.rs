use serde::{Deserialize, Serialize};

/// Cumulative counters for a tracked match.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
    pub round: u32,
}

impl Score {
    pub fn new(home: u32, away: u32, round: u32) -> Self {
        Self { home, away, round }
    }

    /// Component-wise maximum. Merging two observations of the same match
    /// never moves a counter backwards.
    pub fn merge(self, other: Score) -> Score {
        Score {
            home: self.home.max(other.home),
            away: self.away.max(other.away),
            round: self.round.max(other.round),
        }
    }

    /// True when no counter in `self` is below the matching counter in `earlier`.
    pub fn dominates(&self, earlier: &Score) -> bool {
        self.home >= earlier.home && self.away >= earlier.away && self.round >= earlier.round
    }
}
