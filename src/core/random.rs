//! Seedable random source handed explicitly to every sampling component.
//!
//! No component reaches for an ambient generator: the sampler, the trainer,
//! and the booster all receive a `RandomSource` (or a seed to build one), so
//! runs are reproducible and parallel rounds never share generator state.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A wrapper for a seedable random generator
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Create a generator with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from the operating system
    pub fn from_entropy() -> Self {
        RandomSource {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform index in `[0, upper)`. `upper` must be positive.
    pub fn next_index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }

    /// Uniform float in `[0.0, 1.0)`
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Raw 64-bit value, used to derive child seeds
    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen::<u64>()
    }

    /// Derive `count` independent seeds, in order.
    ///
    /// Deriving all seeds before dispatch keeps parallel and sequential
    /// execution bit-identical.
    pub fn derive_seeds(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.next_u64()).collect()
    }

    /// Sample `k` distinct indices from `[0, n)` without replacement, sorted.
    pub fn sample_without_replacement(&mut self, n: usize, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        if k >= n {
            return (0..n).collect();
        }

        let mut indices: Vec<usize> = (0..n).collect();
        indices.partial_shuffle(&mut self.rng, k);
        let mut chosen: Vec<usize> = indices.into_iter().take(k).collect();
        chosen.sort_unstable();
        chosen
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
