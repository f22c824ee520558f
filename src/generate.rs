//! Synthetic weight populations for tests and benchmarks.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Fixed seed behind [`Distribution::PseudoRandomUniform`].
pub const PSEUDO_RANDOM_SEED: u64 = 13_500_993_188_786_726_366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Every weight is `1.0`.
    Uniform,
    /// Uniform in `(0, 1]`, same sequence on every call.
    PseudoRandomUniform,
    /// Uniform in `(0, 1]` from the thread-local generator.
    RandomUniform,
    /// Uniform in `(0, 1]` from the given seed.
    Seeded(u64),
}

pub fn generate_weights(distribution: Distribution, count: usize) -> Vec<f64> {
    match distribution {
        Distribution::Uniform => vec![1.0; count],
        Distribution::PseudoRandomUniform => {
            open_unit(&mut Pcg64::seed_from_u64(PSEUDO_RANDOM_SEED), count)
        }
        Distribution::RandomUniform => open_unit(&mut rand::rng(), count),
        Distribution::Seeded(seed) => open_unit(&mut Pcg64::seed_from_u64(seed), count),
    }
}

fn open_unit<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<f64> {
    (0..count).map(|_| 1.0 - rng.random::<f64>()).collect()
}
