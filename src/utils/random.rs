//! Randomness sources for the queue disciplines
//!
//! Every random decision the engine makes (shuffles, bucket picks) goes
//! through a [`RandomSource`], so tests can substitute a deterministic one.

use std::sync::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Uniform index generator
pub trait RandomSource: Send + Sync {
    /// Return an index uniformly distributed in `0..upper`. `upper` is never zero.
    fn index(&self, upper: usize) -> usize;
}

/// Thread-local OS-seeded generator, used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Reproducible generator seeded from a fixed value
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, upper: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..upper)
    }
}
