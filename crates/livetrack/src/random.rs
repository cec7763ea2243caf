//! Injectable randomness for event synthesis.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws used by the emitter.
pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform integer in `[low, high]`.
    fn next_in_range(&mut self, low: u32, high: u32) -> u32;
}

/// Production source backed by a seedable [`StdRng`].
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_in_range(&mut self, low: u32, high: u32) -> u32 {
        self.rng.gen_range(low..=high)
    }
}

/// Returns the same draw every time. `FixedRandom::new(0.0)` satisfies every
/// `draw < p` check; `FixedRandom::new(0.99)` fails all of them.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    draw: f64,
}

impl FixedRandom {
    pub fn new(draw: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&draw),
            "FixedRandom draw must be in [0, 1), got {draw}"
        );
        Self { draw }
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&mut self) -> f64 {
        self.draw
    }

    fn next_in_range(&mut self, low: u32, high: u32) -> u32 {
        let span = f64::from(high - low + 1);
        low + (self.draw * span) as u32
    }
}

/// Replays a scripted list of `[0, 1)` draws, then falls back to `fallback`.
/// Integer draws consume from the same script.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        self.draws.pop_front().unwrap_or(self.fallback)
    }

    fn next_in_range(&mut self, low: u32, high: u32) -> u32 {
        let span = f64::from(high - low + 1);
        let draw = self.next_f64();
        (low + (draw * span) as u32).min(high)
    }
}
