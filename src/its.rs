//! Inverse transform sampling over the cumulative mass function.
//!
//! O(log N) per draw instead of O(1), but built from nothing more than one prefix sum, which
//! makes it a useful second opinion on the alias tables.

use rand::Rng;

use crate::error::{ProbError, check_weights};
use crate::prefix::prefix_sum;

/// Cumulative mass function of a weight population.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeTable {
    cmf: Vec<f64>,
}

impl CumulativeTable {
    /// # Errors
    /// The usual weight contract, plus [`ProbError::ZeroSum`] if the weights add up to zero.
    pub fn new(weights: &[f64]) -> Result<Self, ProbError> {
        check_weights(weights)?;
        let cmf = prefix_sum(weights);
        match cmf.last() {
            Some(&total) if total.is_finite() && total > 0.0 => Ok(Self { cmf }),
            _ => Err(ProbError::ZeroSum),
        }
    }

    pub fn total(&self) -> f64 {
        self.cmf[self.cmf.len() - 1]
    }

    pub fn cmf(&self) -> &[f64] {
        &self.cmf
    }

    pub fn len(&self) -> usize {
        self.cmf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmf.is_empty()
    }

    /// Index whose cumulative interval contains `u · total`, for `u ∈ [0, 1)`.
    pub fn sample(&self, u: f64) -> usize {
        let x = u * self.total();
        self.cmf.partition_point(|&c| c <= x).min(self.cmf.len() - 1)
    }

    pub fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.sample(rng.random())
    }
}
