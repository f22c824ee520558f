//! Turns split boundaries into alias-table entries.
//!
//! Within one segment this is the two-pointer Vose loop over the partitioned order: `w` is
//! what is left of the heavy bucket being drained. While `w` exceeds the mean, the next light
//! slot is topped up from it; otherwise the heavy slot itself is closed with `p = w / mean`,
//! redirecting to the next heavy bucket, which inherits the remainder.
//!
//! A segment only needs its two bounding splits and read access to the weights and index
//! permutations. Segments write disjoint slots, so they run independently once all splits
//! are known.

use rayon::prelude::*;

use crate::error::ProbError;
use crate::split::Split;
use crate::table::{AliasEntry, AliasTable};

/// Heavy and light index permutations plus the weights they point into.
#[derive(Debug, Clone, Copy)]
pub struct PackInput<'a> {
    pub heavy: &'a [usize],
    pub light: &'a [usize],
    pub weights: &'a [f64],
    pub mean: f64,
}

impl PackInput<'_> {
    /// State before the first slot is packed: nothing consumed, heavy bucket 0 untouched.
    pub fn origin(&self) -> Split {
        let spill = self.heavy.first().map_or(0.0, |&h| self.weights[h]);
        Split::new(0, 0, spill)
    }

    /// Pack the slots between `from` and `to`, handing each `(slot, entry)` to `emit`.
    ///
    /// Light slots `[from.i, to.i)` and heavy slots `[from.j, to.j)` are written, each exactly
    /// once. Returns the residual of the heavy bucket left open and the number of slots written.
    pub fn segment<F>(&self, from: Split, to: Split, mut emit: F) -> (f64, usize)
    where
        F: FnMut(usize, AliasEntry),
    {
        let heavy_count = self.heavy.len();
        let (mut i, mut j, mut w) = (from.i, from.j, from.spill);
        let mut written = 0usize;
        loop {
            if i < to.i && (w > self.mean || j >= to.j) {
                let l = self.light[i];
                if heavy_count == 0 {
                    emit(l, AliasEntry::own(l));
                } else {
                    let h = self.heavy[j.min(heavy_count - 1)];
                    emit(l, AliasEntry::new(self.weights[l] / self.mean, h));
                    w = (w + self.weights[l]) - self.mean;
                }
                i += 1;
            } else if j < to.j {
                let h = self.heavy[j];
                if j + 1 < heavy_count {
                    let next = self.heavy[j + 1];
                    emit(h, AliasEntry::new(w / self.mean, next));
                    w = (w + self.weights[next]) - self.mean;
                } else {
                    // last heavy bucket
                    emit(h, AliasEntry::own(h));
                    w -= self.mean;
                }
                j += 1;
            } else {
                break;
            }
            written += 1;
        }
        (w, written)
    }

    /// Start state of every segment: the origin, then each split but the last.
    fn starts(&self, splits: &[Split]) -> Vec<Split> {
        std::iter::once(self.origin())
            .chain(splits.iter().take(splits.len().saturating_sub(1)).copied())
            .collect()
    }
}

/// Pack all segments in order into a fresh table.
pub fn pack_splits(input: PackInput<'_>, splits: &[Split]) -> Result<AliasTable, ProbError> {
    let n = input.weights.len();
    let mut entries = vec![AliasEntry::UNSET; n];
    let mut filled = 0;
    for (k, (from, to)) in input.starts(splits).into_iter().zip(splits).enumerate() {
        let (residual, written) = input.segment(from, *to, |slot, e| entries[slot] = e);
        note_residual(k, residual, to.spill);
        filled += written;
    }
    finish(entries, filled)
}

/// [`pack_splits`] with one rayon task per segment. Each task collects its own
/// `(slot, entry)` pairs; they are scattered into the table after all tasks finish.
pub fn par_pack_splits(input: PackInput<'_>, splits: &[Split]) -> Result<AliasTable, ProbError> {
    let n = input.weights.len();
    let starts = input.starts(splits);
    let packed: Vec<Vec<(usize, AliasEntry)>> = starts
        .par_iter()
        .zip(splits.par_iter())
        .enumerate()
        .map(|(k, (from, to))| {
            let mut local = Vec::with_capacity((to.i + to.j).saturating_sub(from.i + from.j) + 1);
            let (residual, _) = input.segment(*from, *to, |slot, e| local.push((slot, e)));
            note_residual(k, residual, to.spill);
            local
        })
        .collect();

    let mut entries = vec![AliasEntry::UNSET; n];
    let mut filled = 0;
    for (slot, e) in packed.into_iter().flatten() {
        entries[slot] = e;
        filled += 1;
    }
    finish(entries, filled)
}

fn note_residual(k: usize, residual: f64, expected: f64) {
    if (residual - expected).abs() > 1e-6 * expected.abs().max(1.0) {
        log::debug!("segment {k}: residual {residual} differs from split spill {expected}");
    }
}

fn finish(entries: Vec<AliasEntry>, filled: usize) -> Result<AliasTable, ProbError> {
    let len = entries.len();
    if filled != len || entries.iter().any(|e| *e == AliasEntry::UNSET) {
        return Err(ProbError::PackIncomplete { filled, len });
    }
    Ok(AliasTable::from_entries(entries))
}
