//! K-way split of the combined heavy/light prefix mass.
//!
//! Packing the first `n` table slots consumes `i` light and `j` heavy buckets with `i + j == n`
//! and leaves heavy bucket `j` partially drained. With
//! `sigma(i, j) = lightPrefix[i - 1] + heavyPrefix[j - 1]` and `target = mean · n`, that state is
//! the unique `j` with `sigma(n - j, j) <= target < sigma(n - j, j + 1)`, and the residual left
//! in bucket `j` is `sigma(n - j, j + 1) - target`.
//!
//! `sigma(n - j, j)` grows with `j` (a light bucket, at most the mean, is swapped for a heavy
//! one, above the mean), so the state is found by binary search, independently for every `k`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ProbError;

/// Boundary after which a pack segment ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Light buckets consumed.
    pub i: usize,
    /// Heavy buckets fully consumed; bucket `j` is the one being drained.
    pub j: usize,
    /// Mass left in heavy bucket `j`.
    pub spill: f64,
}

impl Split {
    pub const fn new(i: usize, j: usize, spill: f64) -> Self {
        Self { i, j, spill }
    }
}

/// Slots covered by the first `k` of `segments` segments: `ceil(n · k / segments)`.
pub fn boundary(n: usize, k: usize, segments: usize) -> usize {
    ((n as u128 * k as u128).div_ceil(segments as u128)) as usize
}

/// Sum of the first `count` entries of a sequence, read off its inclusive prefix array.
#[inline]
pub(crate) fn prefix_mass(prefix: &[f64], count: usize) -> f64 {
    if count == 0 { 0.0 } else { prefix[count - 1] }
}

/// The split after the first `n` slots.
///
/// `n` must be smaller than the population size. `sigma(j)` grows with `j`, so the result is the
/// largest `j` whose mass `sigma(j)` does not exceed `mean * n`; ties land on the larger `j`. The
/// search never leaves `[max(0, n - lightCount), min(n, heavyCount - 1)]`.
pub fn split(heavy_prefix: &[f64], light_prefix: &[f64], mean: f64, n: usize) -> Split {
    let heavy_count = heavy_prefix.len();
    let light_count = light_prefix.len();
    debug_assert!(n < heavy_count + light_count);

    if heavy_count == 0 {
        return Split::new(n, 0, 0.0);
    }

    let target = mean * n as f64;
    let lo = n.saturating_sub(light_count);
    let hi = n.min(heavy_count - 1);
    let sigma = |j: usize| prefix_mass(light_prefix, n - j) + prefix_mass(heavy_prefix, j);

    // First j in [lo, hi] with sigma(j) > target, hi + 1 if none.
    let (mut a, mut b) = (lo, hi + 1);
    while a < b {
        let mid = a + (b - a) / 2;
        if sigma(mid) <= target {
            a = mid + 1;
        } else {
            b = mid;
        }
    }
    let j = a.saturating_sub(1).max(lo);
    let i = n - j;
    let spill = prefix_mass(light_prefix, i) + heavy_prefix[j] - target;
    log::trace!("split n={n}: i={i} j={j} spill={spill}");
    Split::new(i, j, spill)
}

/// All `k` splits. The last one is fixed to `(lightCount, heavyCount, 0)`.
pub fn split_k(
    heavy_prefix: &[f64],
    light_prefix: &[f64],
    mean: f64,
    k: usize,
) -> Result<Vec<Split>, ProbError> {
    let mut out = Vec::new();
    split_k_into(heavy_prefix, light_prefix, mean, k, false, &mut out)?;
    Ok(out)
}

/// [`split_k`] with the `k - 1` searches mapped over the rayon pool.
pub fn par_split_k(
    heavy_prefix: &[f64],
    light_prefix: &[f64],
    mean: f64,
    k: usize,
) -> Result<Vec<Split>, ProbError> {
    let mut out = Vec::new();
    split_k_into(heavy_prefix, light_prefix, mean, k, true, &mut out)?;
    Ok(out)
}

pub(crate) fn split_k_into(
    heavy_prefix: &[f64],
    light_prefix: &[f64],
    mean: f64,
    k: usize,
    parallel: bool,
    out: &mut Vec<Split>,
) -> Result<(), ProbError> {
    let n = heavy_prefix.len() + light_prefix.len();
    if k == 0 || k > n {
        return Err(ProbError::InvalidSplitCount { k, n });
    }
    out.clear();
    let search = |s: usize| split(heavy_prefix, light_prefix, mean, boundary(n, s, k));
    if parallel {
        (1..k).into_par_iter().map(search).collect_into_vec(out);
    } else {
        out.extend((1..k).map(search));
    }
    out.push(Split::new(light_prefix.len(), heavy_prefix.len(), 0.0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{gather, stable_partition};
    use crate::prefix::prefix_sum;
    use crate::validate::is_split;

    fn prefixes(weights: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
        let mean = weights.iter().sum::<f64>() / weights.len() as f64;
        let p = stable_partition(weights, mean);
        (
            prefix_sum(&gather(weights, p.heavy())),
            prefix_sum(&gather(weights, p.light())),
            mean,
        )
    }

    #[test]
    fn boundaries_round_up() {
        assert_eq!(boundary(10, 1, 3), 4);
        assert_eq!(boundary(10, 2, 3), 7);
        assert_eq!(boundary(10, 3, 3), 10);
        assert_eq!(boundary(usize::MAX, 1, 1), usize::MAX);
    }

    #[test]
    fn two_heavy_two_light() {
        // mean 2.5: heavy [4, 5], light [1, 0]
        let (hp, lp, mean) = prefixes(&[4.0, 1.0, 5.0, 0.0]);
        let s = split(&hp, &lp, mean, 2);
        // sigma(1,1) = 1 + 4 = 5 <= 5 < 1 + 9
        assert_eq!((s.i, s.j), (1, 1));
        assert!((s.spill - 5.0).abs() < 1e-12);
    }

    #[test]
    fn j_zero_and_i_zero_edges() {
        // One heavy bucket carrying almost everything.
        let (hp, lp, mean) = prefixes(&[0.0, 0.0, 0.0, 8.0]);
        for n in 1..4 {
            let s = split(&hp, &lp, mean, n);
            assert_eq!(s.j, 0, "n={n}");
            assert_eq!(s.i, n);
            assert!((s.spill - (8.0 - 2.0 * n as f64)).abs() < 1e-12);
        }
        // Everything heavy except one empty bucket: i reaches 0 early.
        let (hp, lp, mean) = prefixes(&[3.0, 3.0, 3.0, 0.0]);
        let s = split(&hp, &lp, mean, 1);
        assert_eq!(s.i + s.j, 1);
    }

    #[test]
    fn all_equal_weights_have_no_heavy_side() {
        let (hp, lp, mean) = prefixes(&[2.0; 6]);
        assert!(hp.is_empty());
        let splits = split_k(&hp, &lp, mean, 3).unwrap();
        assert_eq!(splits[0], Split::new(2, 0, 0.0));
        assert_eq!(splits[1], Split::new(4, 0, 0.0));
        assert_eq!(splits[2], Split::new(6, 0, 0.0));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let weights: Vec<f64> = (0..5000).map(|i| ((i * 7919) % 101) as f64 + 0.5).collect();
        let (hp, lp, mean) = prefixes(&weights);
        let a = split_k(&hp, &lp, mean, 97).unwrap();
        let b = par_split_k(&hp, &lp, mean, 97).unwrap();
        assert_eq!(a, b);
        assert!(is_split(&a, 97, &hp, &lp, mean, 1e-9).is_ok());
    }

    #[test]
    fn rejects_bad_k() {
        let (hp, lp, mean) = prefixes(&[1.0, 2.0]);
        assert!(matches!(
            split_k(&hp, &lp, mean, 0),
            Err(ProbError::InvalidSplitCount { k: 0, n: 2 })
        ));
        assert!(matches!(
            split_k(&hp, &lp, mean, 3),
            Err(ProbError::InvalidSplitCount { k: 3, n: 2 })
        ));
    }
}
