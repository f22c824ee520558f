//! Sampling-quality measures.

use crate::reduce::kahan_reduction;
use crate::table::AliasEntry;

/// Occurrences of every index in `0..population` among `samples`.
///
/// Samples outside the population are ignored.
pub fn histogram(samples: &[u32], population: usize) -> Vec<usize> {
    let mut counts = vec![0usize; population];
    for &s in samples {
        if let Some(c) = counts.get_mut(s as usize) {
            *c += 1;
        }
    }
    counts
}

/// Root-mean-square error between observed counts and the counts `weights` predicts for the
/// same number of draws.
pub fn rmse(weights: &[f64], counts: &[usize]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    let total = kahan_reduction(weights);
    let draws = counts.iter().sum::<usize>() as f64;
    let squared: f64 = weights
        .iter()
        .zip(counts)
        .map(|(&w, &c)| {
            let expected = w / total * draws;
            (c as f64 - expected).powi(2)
        })
        .sum();
    (squared / weights.len() as f64).sqrt()
}

/// Per-index sampling mass of a table in units of the mean weight: `1.0` for an index drawn
/// exactly as often as the average. Inverse of the construction up to `f32` rounding.
pub fn alias_table_to_normalized_weights(entries: &[AliasEntry]) -> Vec<f64> {
    let mut mass = vec![0.0f64; entries.len()];
    for (i, e) in entries.iter().enumerate() {
        let p = f64::from(e.p).clamp(0.0, 1.0);
        mass[i] += p;
        if let Some(m) = mass.get_mut(e.a as usize) {
            *m += 1.0 - p;
        }
    }
    mass
}

/// `weights` divided by their (compensated) sum.
pub fn weights_to_probabilities(weights: &[f64]) -> Vec<f64> {
    let total = kahan_reduction(weights);
    weights.iter().map(|&w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AliasTable;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn counts_samples() {
        assert_eq!(histogram(&[0, 2, 2, 9], 3), vec![1, 0, 2]);
    }

    #[test]
    fn rmse_of_exact_counts_is_zero() {
        assert_eq!(rmse(&[1.0, 3.0], &[25, 75]), 0.0);
        assert!((rmse(&[1.0, 1.0], &[4, 6]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalized_weights_invert_the_table() {
        let w = [4.0, 1.0, 2.0, 1.0];
        let t = AliasTable::new(&w).unwrap();
        let norm = alias_table_to_normalized_weights(t.entries());
        for (n, p) in norm.iter().zip(weights_to_probabilities(&w)) {
            assert!((n / 4.0 - p).abs() < 1e-6);
        }
    }

    #[test]
    fn sampling_error_shrinks_with_draws() {
        let w: Vec<f64> = (1..=64).map(f64::from).collect();
        let t = AliasTable::new(&w).unwrap();
        let mut rng = Pcg64::seed_from_u64(5);
        let few = rmse(&w, &t.sample_counts(&mut rng, 1_000)) / 1_000.0;
        let many = rmse(&w, &t.sample_counts(&mut rng, 1_000_000)) / 1_000_000.0;
        assert!(many < few);
    }
}
