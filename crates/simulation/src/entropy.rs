//! Entropy sources for probabilistic trials.
//!
//! All randomness in a batch flows through one [`EntropySource`], so a run
//! is fully determined by (topology, requests, strategy, seed). Tests that
//! need a specific failure pattern inject a [`ScriptedEntropy`] instead of
//! hunting for a seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// A stream of uniform draws in `[0, 1)` driving Bernoulli trials.
pub trait EntropySource: Send {
    /// The next uniform draw.
    fn sample(&mut self) -> f64;

    /// One Bernoulli trial: succeeds when the draw lands within `p`.
    fn bernoulli(&mut self, p: f64) -> bool {
        self.sample() <= p
    }
}

/// Seeded ChaCha8 entropy; identical seeds replay identical draws.
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: ChaCha8Rng,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl EntropySource for SeededEntropy {
    fn sample(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Pre-scripted draws for forced-outcome tests.
///
/// A draw of `0.0` forces a trial to succeed, `1.0` forces failure for any
/// `p < 1`. Once the script runs out, every further draw is `1.0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEntropy {
    draws: VecDeque<f64>,
}

impl ScriptedEntropy {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self { draws: draws.into_iter().collect() }
    }
}

impl EntropySource for ScriptedEntropy {
    fn sample(&mut self) -> f64 {
        self.draws.pop_front().unwrap_or(1.0)
    }
}
