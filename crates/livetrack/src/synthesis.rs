//! Synthetic match activity.
//!
//! Each cycle makes five independent Bernoulli draws; any subset may fire.
//! A branch fires when `draw < p`.

use crate::envelope::{MatchUpdate, Objective};
use crate::random::RandomSource;
use crate::types::{Score, Side};

pub const ROUND_START_PROBABILITY: f64 = 0.30;
pub const KILL_PROBABILITY: f64 = 0.70;
pub const OBJECTIVE_PROBABILITY: f64 = 0.20;
pub const ROUND_END_PROBABILITY: f64 = 0.15;
pub const HEARTBEAT_PROBABILITY: f64 = 0.25;

/// Probability that the home side takes a concluded round.
pub const HOME_ROUND_WIN_PROBABILITY: f64 = 0.55;

const KILLERS: (u32, u32) = (1, 10);
const VICTIMS: (u32, u32) = (11, 20);

/// Counters after one cycle and the updates it produced, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub score: Score,
    pub updates: Vec<MatchUpdate>,
}

fn coin(rng: &mut dyn RandomSource) -> Side {
    if rng.next_f64() < 0.5 {
        Side::Home
    } else {
        Side::Away
    }
}

/// Advance `previous` by one cycle of synthetic play.
///
/// Counters only ever increase: `round` by at most one, and at most one of
/// `home`/`away` by one.
pub fn synthesize(previous: Score, rng: &mut dyn RandomSource, timestamp: f64) -> Synthesis {
    let mut score = previous;
    let mut updates = Vec::new();

    if rng.next_f64() < ROUND_START_PROBABILITY {
        score.round += 1;
        updates.push(MatchUpdate::RoundStart {
            round: score.round,
            timestamp,
        });
    }

    if rng.next_f64() < KILL_PROBABILITY {
        let killer = format!("Player{}", rng.next_in_range(KILLERS.0, KILLERS.1));
        let victim = format!("Player{}", rng.next_in_range(VICTIMS.0, VICTIMS.1));
        let team = coin(rng);
        updates.push(MatchUpdate::Kill {
            killer,
            victim,
            team,
            timestamp,
        });
    }

    if rng.next_f64() < OBJECTIVE_PROBABILITY {
        let last = (Objective::ALL.len() - 1) as u32;
        let objective = Objective::ALL[rng.next_in_range(0, last) as usize];
        let team = coin(rng);
        updates.push(MatchUpdate::Objective {
            objective,
            team,
            timestamp,
        });
    }

    if rng.next_f64() < ROUND_END_PROBABILITY {
        if rng.next_f64() < HOME_ROUND_WIN_PROBABILITY {
            score.home += 1;
        } else {
            score.away += 1;
        }
        updates.push(MatchUpdate::RoundEnd {
            round: score.round,
            home: score.home,
            away: score.away,
            timestamp,
        });
        updates.push(MatchUpdate::Score {
            home: score.home,
            away: score.away,
            timestamp,
        });
    }

    if rng.next_f64() < HEARTBEAT_PROBABILITY {
        updates.push(MatchUpdate::Score {
            home: score.home,
            away: score.away,
            timestamp,
        });
    }

    Synthesis { score, updates }
}
