//! Numerically stable reductions over weight slices.
//!
//! A plain left-to-right fold accumulates rounding error linearly in `N`; every reducer here
//! keeps it at `O(log N · ε)` (tree, block) or `O(ε)` (compensated). [`naive_reduction`] is
//! kept only as the baseline the others are measured against.

use crate::config::Reduction;
use crate::error::ProbError;

/// Below this many elements a tree node is summed directly.
const LEAF: usize = 8;

/// Above this many elements [`par_tree_reduction`] forks both halves onto the rayon pool.
const PAR_THRESHOLD: usize = 1 << 14;

/// Left-to-right accumulation. Error grows as `O(N · ε)`.
pub fn naive_reduction(weights: &[f64]) -> f64 {
    weights.iter().fold(0.0, |acc, &w| acc + w)
}

/// Neumaier-compensated summation (Kahan with the large-addend fix).
pub fn kahan_reduction(weights: &[f64]) -> f64 {
    let mut sum = 0.0f64;
    let mut c = 0.0f64;
    for &w in weights {
        let t = sum + w;
        if sum.abs() >= w.abs() {
            c += (sum - t) + w;
        } else {
            c += (w - t) + sum;
        }
        sum = t;
    }
    sum + c
}

/// Pairwise (tree) reduction: every `+` combines two partial sums over roughly the same number
/// of elements, which avoids `a + b == a` when `a` has grown much larger than `b`.
pub fn tree_reduction(weights: &[f64]) -> f64 {
    if weights.len() <= LEAF {
        return naive_reduction(weights);
    }
    let (lo, hi) = weights.split_at(weights.len() / 2);
    tree_reduction(lo) + tree_reduction(hi)
}

/// Same tree as [`tree_reduction`], with the upper levels evaluated on the rayon pool.
///
/// The association order is identical, so the result is bit-for-bit equal to the sequential one.
pub fn par_tree_reduction(weights: &[f64]) -> f64 {
    if weights.len() <= PAR_THRESHOLD {
        return tree_reduction(weights);
    }
    let (lo, hi) = weights.split_at(weights.len() / 2);
    let (a, b) = rayon::join(|| par_tree_reduction(lo), || par_tree_reduction(hi));
    a + b
}

/// Windowed reduction: sum fixed-size blocks, then reduce the block sums the same way until a
/// single block is left.
///
/// This is the sequential model of a GPU block-reduce followed by an inter-block combine; each
/// block is summed left to right, as one workgroup would.
pub fn block_reduction(weights: &[f64], block_size: usize) -> Result<f64, ProbError> {
    if block_size < 2 {
        return Err(ProbError::InvalidBlockSize { block_size });
    }
    if weights.len() <= block_size {
        return Ok(naive_reduction(weights));
    }
    let mut sums: Vec<f64> = weights.chunks(block_size).map(naive_reduction).collect();
    while sums.len() > block_size {
        sums = sums.chunks(block_size).map(naive_reduction).collect();
    }
    Ok(naive_reduction(&sums))
}

/// Reduce with the strategy selected in the build configuration.
pub fn reduce(weights: &[f64], reduction: Reduction) -> Result<f64, ProbError> {
    match reduction {
        Reduction::Naive => Ok(naive_reduction(weights)),
        Reduction::Kahan => Ok(kahan_reduction(weights)),
        Reduction::Tree => Ok(par_tree_reduction(weights)),
        Reduction::Block { block_size } => block_reduction(weights, block_size),
        Reduction::DecoupledLookback { block_size, depth } => {
            crate::lookback::decoupled_reduce(weights, block_size, depth)
        }
    }
}

/// Arithmetic mean via [`tree_reduction`]. `NaN` for an empty slice.
pub fn mean(weights: &[f64]) -> f64 {
    tree_reduction(weights) / weights.len() as f64
}
