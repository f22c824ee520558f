use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::table::{AliasEntry, AliasTable};
use crate::{IndexSampler, its::CumulativeTable};

/// Draw from alias entries given a uniform slot `u1 ∈ [0, N)` and a uniform `u2 ∈ [0, 1)`:
/// `u1` if `u2 <= p[u1]`, else `a[u1]`.
///
/// Pure, O(1), no shared mutable state.
#[inline]
pub fn sample(entries: &[AliasEntry], u1: usize, u2: f64) -> usize {
    let e = entries[u1];
    if u2 <= f64::from(e.p) { u1 } else { e.a as usize }
}

/// Count `draws` samples spread over the rayon pool.
///
/// Every chunk of `chunk` draws gets its own `Pcg64` stream derived from `seed`, so the result
/// depends on `seed` and `chunk` only, not on the pool size.
pub fn par_sample_counts<S>(sampler: &S, seed: u64, draws: usize, chunk: usize) -> Vec<usize>
where
    S: IndexSampler + Sync,
{
    let n = sampler.len();
    let chunk = chunk.max(1);
    let chunks = draws.div_ceil(chunk);
    (0..chunks)
        .into_par_iter()
        .map(|c| {
            let mut rng = Pcg64::seed_from_u64(seed.wrapping_add(c as u64));
            let mut counts = vec![0usize; n];
            let this = chunk.min(draws - c * chunk);
            for _ in 0..this {
                counts[sampler.sample_index(&mut rng)] += 1;
            }
            counts
        })
        .reduce(
            || vec![0usize; n],
            |mut a, b| {
                a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                a
            },
        )
}

impl IndexSampler for AliasTable {
    #[inline]
    fn len(&self) -> usize {
        // call the inherent method explicitly to avoid trait-recursion
        AliasTable::len(self)
    }
    #[inline]
    fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        AliasTable::sample_index(self, rng)
    }
}

impl IndexSampler for CumulativeTable {
    #[inline]
    fn len(&self) -> usize {
        CumulativeTable::len(self)
    }
    #[inline]
    fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        CumulativeTable::sample_index(self, rng)
    }
}
