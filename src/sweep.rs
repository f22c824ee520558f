//! Single-pass sweeping construction.
//!
//! Two cursors walk the weights in source order: `i` over light buckets, `j` over heavy ones.
//! The heavy bucket under `j` keeps a residual `w`; light buckets are redirected into it until
//! it drops to the mean, then it is closed and its remainder rolls into the next heavy bucket.
//! No partition, no prefix sums, no parallel decomposition; this is the reference the split/pack
//! path is cross-checked against.

use crate::error::{ProbError, check_weights};
use crate::table::{AliasEntry, AliasTable};

/// First index `>= from` that is light (at most `mean`), or `weights.len()`.
fn next_light(weights: &[f64], from: usize, mean: f64) -> usize {
    weights
        .get(from..)
        .and_then(|rest| rest.iter().position(|&w| w <= mean))
        .map_or(weights.len(), |p| from + p)
}

/// First index `>= from` that is heavy (above `mean`), or `weights.len()`.
fn next_heavy(weights: &[f64], from: usize, mean: f64) -> usize {
    weights
        .get(from..)
        .and_then(|rest| rest.iter().position(|&w| w > mean))
        .map_or(weights.len(), |p| from + p)
}

/// Build a table in one sweep. `total` is the (stably reduced) sum of `weights`.
///
/// # Errors
/// The weight contract of [`check_weights`], plus [`ProbError::ZeroSum`] when `total` is not a
/// positive finite number.
pub fn sweeping_alias_table(weights: &[f64], total: f64) -> Result<AliasTable, ProbError> {
    check_weights(weights)?;
    if !total.is_finite() || total <= 0.0 {
        return Err(ProbError::ZeroSum);
    }
    let n = weights.len();
    let mean = total / n as f64;

    let mut i = next_light(weights, 0, mean);
    let mut j = next_heavy(weights, 0, mean);
    if j == n {
        log::debug!("sweep: no heavy buckets among {n}, every slot keeps itself");
        return Ok(AliasTable::from_entries(
            (0..n).map(AliasEntry::own).collect(),
        ));
    }

    let mut entries = vec![AliasEntry::UNSET; n];
    let mut w = weights[j];
    loop {
        if w > mean {
            if i >= n {
                // Out of light buckets; whatever is left of `w` is rounding.
                entries[j] = AliasEntry::own(j);
                fill_own_heavy(weights, &mut entries, j + 1, mean);
                break;
            }
            entries[i] = AliasEntry::new(weights[i] / mean, j);
            w = (w + weights[i]) - mean;
            i = next_light(weights, i + 1, mean);
        } else {
            let next = next_heavy(weights, j + 1, mean);
            if next == n {
                entries[j] = AliasEntry::own(j);
                while i < n {
                    entries[i] = AliasEntry::own(i);
                    i = next_light(weights, i + 1, mean);
                }
                break;
            }
            entries[j] = AliasEntry::new(w / mean, next);
            j = next;
            w = (w + weights[j]) - mean;
        }
    }
    Ok(AliasTable::from_entries(entries))
}

/// Close every heavy bucket from `from` on as a self-alias.
fn fill_own_heavy(weights: &[f64], entries: &mut [AliasEntry], from: usize, mean: f64) {
    let mut j = next_heavy(weights, from, mean);
    while j < weights.len() {
        entries[j] = AliasEntry::own(j);
        j = next_heavy(weights, j + 1, mean);
    }
}
