//! Invariant oracles for every construction stage.
//!
//! Each checker returns `Ok(())` or a [`Report`] tagged with the fault kinds it saw, the worst
//! magnitude, and the first few offending indices. None of them panic; the caller decides what a
//! failure means.

use std::fmt;

use crate::split::{Split, boundary, prefix_mass};
use crate::table::AliasEntry;

/// A single failed check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offence<K> {
    pub index: usize,
    pub kind: K,
    pub magnitude: f64,
}

/// Outcome of one oracle run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report<K> {
    /// Number of elements (or splits) inspected.
    pub checked: usize,
    /// Number of failed checks, including those not recorded.
    pub count: usize,
    /// Largest magnitude among the failed checks.
    pub worst: f64,
    /// The first [`Report::MAX_RECORDED`] offences in index order.
    pub offences: Vec<Offence<K>>,
    kinds: Vec<K>,
}

impl<K: Copy + PartialEq> Report<K> {
    pub const MAX_RECORDED: usize = 16;

    fn new(checked: usize) -> Self {
        Self {
            checked,
            count: 0,
            worst: 0.0,
            offences: Vec::new(),
            kinds: Vec::new(),
        }
    }

    fn record(&mut self, index: usize, kind: K, magnitude: f64) {
        self.count += 1;
        if magnitude > self.worst {
            self.worst = magnitude;
        }
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        if self.offences.len() < Self::MAX_RECORDED {
            self.offences.push(Offence {
                index,
                kind,
                magnitude,
            });
        }
    }

    fn finish(self) -> Result<(), Self> {
        if self.count == 0 { Ok(()) } else { Err(self) }
    }

    /// Whether any offence of this kind was seen.
    pub fn contains(&self, kind: K) -> bool {
        self.kinds.contains(&kind)
    }

    /// Distinct fault kinds in order of first appearance.
    pub fn kinds(&self) -> &[K] {
        &self.kinds
    }
}

impl<K: fmt::Debug> fmt::Display for Report<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} checks failed ({:?}), worst {:e}",
            self.count, self.checked, self.kinds, self.worst
        )?;
        for o in &self.offences {
            write!(f, "; [{}] {:?} {:e}", o.index, o.kind, o.magnitude)?;
        }
        if self.count > self.offences.len() {
            write!(f, "; ...")?;
        }
        Ok(())
    }
}

impl<K: fmt::Debug> std::error::Error for Report<K> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionFault {
    /// Heavy and light together do not cover the population.
    InvalidSizes,
    /// An element sits on the wrong side of the pivot.
    InvalidPartition,
    /// An index is out of range or repeated, or the values are not a permutation.
    InvalidElement,
    /// Relative order inside a group was not preserved.
    Unstable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixFault {
    UnequalSize,
    /// The prefix moved against the sign of the element.
    NotMonotone,
    /// Residual above the tolerance but within ten times of it.
    Unstable,
    /// Residual beyond ten times the tolerance.
    NotAPrefixSum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitFault {
    InvalidCount,
    IOutOfBound,
    JOutOfBound,
    /// `i + j != ceil(N·k/K)`.
    BrokenSize,
    /// `sigma(i, j) <= target < sigma(i, j + 1)` does not hold.
    BrokenSigma,
    BrokenSpill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasFault {
    InvalidSize,
    InvalidAlias,
    /// Reconstructed mass above the weight.
    Oversampled,
    /// Reconstructed mass below the weight.
    Undersampled,
}

pub type PartitionReport = Report<PartitionFault>;
pub type PrefixReport = Report<PrefixFault>;
pub type SplitReport = Report<SplitFault>;
pub type AliasTableReport = Report<AliasFault>;

/// Index partition check: `heavy ++ light` is a permutation of `0..N`, heavy elements lie
/// strictly above `pivot`, light ones at or below it.
pub fn is_partition(
    weights: &[f64],
    heavy: &[usize],
    light: &[usize],
    pivot: f64,
) -> Result<(), PartitionReport> {
    let n = weights.len();
    let mut report = Report::new(n);
    if heavy.len() + light.len() != n {
        let missing = n.abs_diff(heavy.len() + light.len());
        report.record(0, PartitionFault::InvalidSizes, missing as f64);
        return report.finish();
    }

    let mut seen = vec![false; n];
    let sides = heavy
        .iter()
        .map(|&x| (x, true))
        .chain(light.iter().map(|&x| (x, false)));
    for (pos, (index, is_heavy)) in sides.enumerate() {
        if index >= n || seen[index] {
            report.record(pos, PartitionFault::InvalidElement, index as f64);
            continue;
        }
        seen[index] = true;
        let w = weights[index];
        if is_heavy && w <= pivot {
            report.record(pos, PartitionFault::InvalidPartition, pivot - w);
        } else if !is_heavy && w > pivot {
            report.record(pos, PartitionFault::InvalidPartition, w - pivot);
        }
    }
    report.finish()
}

/// [`is_partition`] plus strictly increasing indices within each group.
pub fn is_stable_partition(
    weights: &[f64],
    heavy: &[usize],
    light: &[usize],
    pivot: f64,
) -> Result<(), PartitionReport> {
    let mut report = match is_partition(weights, heavy, light, pivot) {
        Ok(()) => Report::new(weights.len()),
        Err(r) if r.contains(PartitionFault::InvalidSizes) => return Err(r),
        Err(r) => r,
    };
    for (offset, group) in [(0, heavy), (heavy.len(), light)] {
        for (pos, pair) in group.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                report.record(offset + pos + 1, PartitionFault::Unstable, 1.0);
            }
        }
    }
    report.finish()
}

/// Value partition check: `values` is a permutation of `weights`, its first `heavy_count`
/// entries lie strictly above `pivot` and the rest at or below it.
pub fn is_value_partition(
    weights: &[f64],
    values: &[f64],
    heavy_count: usize,
    pivot: f64,
) -> Result<(), PartitionReport> {
    let mut report = Report::new(weights.len());
    if values.len() != weights.len() || heavy_count > values.len() {
        report.record(0, PartitionFault::InvalidSizes, values.len() as f64);
        return report.finish();
    }
    for (pos, &v) in values.iter().enumerate() {
        let heavy = pos < heavy_count;
        if heavy && v <= pivot {
            report.record(pos, PartitionFault::InvalidPartition, pivot - v);
        } else if !heavy && v > pivot {
            report.record(pos, PartitionFault::InvalidPartition, v - pivot);
        }
    }
    let mut expected = weights.to_vec();
    let mut got = values.to_vec();
    expected.sort_by(f64::total_cmp);
    got.sort_by(f64::total_cmp);
    if let Some(pos) = expected.iter().zip(&got).position(|(a, b)| a != b) {
        report.record(pos, PartitionFault::InvalidElement, (expected[pos] - got[pos]).abs());
    }
    report.finish()
}

/// Inclusive prefix check with an absolute `tolerance` on `prefix[i] - prefix[i-1] - element[i]`.
pub fn is_prefix(elements: &[f64], prefix: &[f64], tolerance: f64) -> Result<(), PrefixReport> {
    let mut report = Report::new(elements.len());
    if elements.len() != prefix.len() {
        report.record(
            0,
            PrefixFault::UnequalSize,
            elements.len().abs_diff(prefix.len()) as f64,
        );
        return report.finish();
    }
    let mut prev = 0.0f64;
    for (i, (&e, &p)) in elements.iter().zip(prefix).enumerate() {
        let step = p - prev;
        if i > 0 && ((e > 0.0 && step < 0.0) || (e < 0.0 && step > 0.0)) {
            report.record(i, PrefixFault::NotMonotone, step.abs());
        }
        let residual = (step - e).abs();
        if residual > 10.0 * tolerance {
            report.record(i, PrefixFault::NotAPrefixSum, residual);
        } else if residual > tolerance {
            report.record(i, PrefixFault::Unstable, residual);
        }
        prev = p;
    }
    report.finish()
}

/// Split check against the heavy and light prefix arrays.
///
/// Interior splits must satisfy the size, sigma and spill invariants, the sigma bounds and the
/// spill compared with an absolute `margin`. The last split must be
/// `(lightCount, heavyCount, 0)`.
pub fn is_split(
    splits: &[Split],
    k: usize,
    heavy_prefix: &[f64],
    light_prefix: &[f64],
    mean: f64,
    margin: f64,
) -> Result<(), SplitReport> {
    let heavy_count = heavy_prefix.len();
    let light_count = light_prefix.len();
    let n_total = heavy_count + light_count;
    let mut report = Report::new(k);
    if splits.len() != k || k == 0 {
        report.record(0, SplitFault::InvalidCount, splits.len().abs_diff(k) as f64);
        return report.finish();
    }

    for (s, split) in splits[..k - 1].iter().enumerate() {
        let n = boundary(n_total, s + 1, k);
        if split.i + split.j != n {
            report.record(s, SplitFault::BrokenSize, split.i.abs_diff(n - split.j.min(n)) as f64);
        }
        if split.i > light_count {
            report.record(s, SplitFault::IOutOfBound, (split.i - light_count) as f64);
            continue;
        }
        if heavy_count == 0 {
            // Nothing to drain: every boundary sits on the light side.
            if split.j != 0 {
                report.record(s, SplitFault::JOutOfBound, split.j as f64);
            }
            if split.spill.abs() > margin {
                report.record(s, SplitFault::BrokenSpill, split.spill.abs());
            }
            continue;
        }
        if split.j >= heavy_count {
            report.record(s, SplitFault::JOutOfBound, (split.j + 1 - heavy_count) as f64);
            continue;
        }

        let target = mean * n as f64;
        let light = prefix_mass(light_prefix, split.i);
        let sigma = light + prefix_mass(heavy_prefix, split.j);
        let sigma_next = light + heavy_prefix[split.j];
        if sigma - target > margin {
            report.record(s, SplitFault::BrokenSigma, sigma - target);
        } else if target - sigma_next >= margin {
            report.record(s, SplitFault::BrokenSigma, target - sigma_next);
        }
        let spill_error = (split.spill - (sigma_next - target)).abs();
        if spill_error > margin {
            report.record(s, SplitFault::BrokenSpill, spill_error);
        }
    }

    let last = splits[k - 1];
    if last.i != light_count {
        report.record(k - 1, SplitFault::IOutOfBound, last.i.abs_diff(light_count) as f64);
    }
    if last.j != heavy_count {
        report.record(k - 1, SplitFault::JOutOfBound, last.j.abs_diff(heavy_count) as f64);
    }
    if last.spill.abs() > margin {
        report.record(k - 1, SplitFault::BrokenSpill, last.spill.abs());
    }
    report.finish()
}

/// Alias table check.
///
/// Reconstructs the expected sampled mass `p[r] + Σ{a[s] = r} (1 - p[s])` of every index,
/// rescales it by `total / N`, and compares against the weight with an absolute `margin`.
///
/// `margin` is in weight units and does not scale with the input. For a bound relative to the
/// total weight pass `relative * total`.
///
/// Aliases outside the table are reported as [`AliasFault::InvalidAlias`] and left out of the
/// reconstruction.
pub fn is_alias_table(
    weights: &[f64],
    entries: &[AliasEntry],
    total: f64,
    margin: f64,
) -> Result<(), AliasTableReport> {
    let n = weights.len();
    let mut report = Report::new(n);
    if entries.len() != n {
        report.record(0, AliasFault::InvalidSize, entries.len().abs_diff(n) as f64);
        return report.finish();
    }

    let mut mass: Vec<f64> = entries.iter().map(|e| f64::from(e.p)).collect();
    for (s, e) in entries.iter().enumerate() {
        let a = e.a as usize;
        if a >= n {
            report.record(s, AliasFault::InvalidAlias, e.a as f64);
            continue;
        }
        mass[a] += 1.0 - f64::from(e.p);
    }

    let scale = total / n as f64;
    for (r, (&m, &w)) in mass.iter().zip(weights).enumerate() {
        let diff = m * scale - w;
        if diff > margin {
            report.record(r, AliasFault::Oversampled, diff);
        } else if diff < -margin {
            report.record(r, AliasFault::Undersampled, -diff);
        }
    }
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Partition, stable_partition, stable_partition_values};
    use crate::prefix::prefix_sum;

    #[test]
    fn accepts_stable_partition() {
        let w = [5.0, 1.0, 4.0, 0.5, 2.5];
        let p = stable_partition(&w, 2.6);
        assert!(is_stable_partition(&w, p.heavy(), p.light(), 2.6).is_ok());
        let (values, hc) = stable_partition_values(&w, 2.6);
        assert!(is_value_partition(&w, &values, hc, 2.6).is_ok());
    }

    #[test]
    fn swapped_elements_are_caught() {
        let w = [5.0, 1.0, 4.0, 0.5];
        // 1.0 marked heavy, 4.0 marked light
        let report = is_partition(&w, &[0, 1], &[2, 3], 2.625).unwrap_err();
        assert!(report.contains(PartitionFault::InvalidPartition));
        assert_eq!(report.count, 2);
        assert_eq!(report.offences[0].index, 1);
    }

    #[test]
    fn duplicates_and_sizes() {
        let w = [1.0, 2.0, 3.0];
        let report = is_partition(&w, &[2, 2], &[0], 2.0).unwrap_err();
        assert!(report.contains(PartitionFault::InvalidElement));
        let report = is_partition(&w, &[2], &[0], 2.0).unwrap_err();
        assert_eq!(report.kinds(), &[PartitionFault::InvalidSizes]);
    }

    #[test]
    fn hand_assembled_partition() {
        let w = [5.0, 1.0, 4.0, 0.5];
        let p = Partition::from_parts(vec![0, 2], vec![3, 1]);
        assert_eq!(p.heavy_count(), 2);
        assert!(is_partition(&w, p.heavy(), p.light(), 2.625).is_ok());
        let report = is_stable_partition(&w, p.heavy(), p.light(), 2.625).unwrap_err();
        assert_eq!(report.kinds(), &[PartitionFault::Unstable]);
        assert_eq!(Partition::from_parts(vec![0, 2], vec![1, 3]), stable_partition(&w, 2.625));
    }

    #[test]
    fn out_of_order_is_unstable() {
        let w = [1.0, 2.0, 0.0, 5.0];
        let report = is_stable_partition(&w, &[3], &[2, 0, 1], 2.0).unwrap_err();
        assert_eq!(report.kinds(), &[PartitionFault::Unstable]);
        assert!(is_partition(&w, &[3], &[2, 0, 1], 2.0).is_ok());
    }

    #[test]
    fn prefix_faults_are_graded() {
        let e = [1.0, 1.0, 1.0, 1.0];
        assert!(is_prefix(&e, &prefix_sum(&e), 1e-12).is_ok());
        let report = is_prefix(&e, &[1.0, 2.05, 3.05, 9.0], 0.01).unwrap_err();
        assert!(report.contains(PrefixFault::Unstable));
        assert!(report.contains(PrefixFault::NotAPrefixSum));
        let report = is_prefix(&e, &[1.0, 0.5, 1.5, 2.5], 10.0).unwrap_err();
        assert_eq!(report.kinds(), &[PrefixFault::NotMonotone]);
        assert!(is_prefix(&e, &[1.0], 1.0).unwrap_err().contains(PrefixFault::UnequalSize));
    }

    #[test]
    fn broken_splits() {
        // heavy [4, 5], light [1, 0], mean 2.5
        let hp = [4.0, 9.0];
        let lp = [1.0, 1.0];
        let good = [
            Split::new(1, 0, 2.5),
            Split::new(1, 1, 5.0),
            Split::new(2, 1, 2.5),
            Split::new(2, 2, 0.0),
        ];
        assert!(is_split(&good, 4, &hp, &lp, 2.5, 1e-9).is_ok());

        // heavy bucket 0 consumed before the first slot is even full
        let mut bad = good;
        bad[0] = Split::new(0, 1, 2.5);
        let report = is_split(&bad, 4, &hp, &lp, 2.5, 1e-9).unwrap_err();
        assert!(report.contains(SplitFault::BrokenSigma));
        assert!(report.contains(SplitFault::BrokenSpill));
        assert!(report.offences.iter().all(|o| o.index == 0));

        let report = is_split(&good[..3], 4, &hp, &lp, 2.5, 1e-9).unwrap_err();
        assert_eq!(report.kinds(), &[SplitFault::InvalidCount]);
    }

    #[test]
    fn alias_faults() {
        let w = [3.0, 1.0];
        let good = [AliasEntry::own(0), AliasEntry { p: 0.5, a: 0 }];
        assert!(is_alias_table(&w, &good, 4.0, 1e-9).is_ok());

        let bad = [AliasEntry::own(0), AliasEntry { p: 0.5, a: 7 }];
        let report = is_alias_table(&w, &bad, 4.0, 1e-9).unwrap_err();
        assert!(report.contains(AliasFault::InvalidAlias));
        assert!(report.contains(AliasFault::Undersampled));

        let skewed = [AliasEntry::own(0), AliasEntry::own(1)];
        let report = is_alias_table(&w, &skewed, 4.0, 0.1).unwrap_err();
        assert!(report.contains(AliasFault::Oversampled));
        assert!((report.worst - 1.0).abs() < 1e-12);
        assert!(report.to_string().starts_with("2 of 2 checks failed"));
    }

    #[test]
    fn alias_margin_is_in_weight_units() {
        let skewed = [AliasEntry::own(0), AliasEntry::own(1)];
        let relative = 0.3;
        for scale in [1.0, 1000.0] {
            let w = [3.0 * scale, 1.0 * scale];
            let total = 4.0 * scale;
            assert!(is_alias_table(&w, &skewed, total, relative * total).is_ok());
        }
        // The same absolute margin that passes at scale 1 is far too tight at scale 1000.
        assert!(is_alias_table(&[3000.0, 1000.0], &skewed, 4000.0, 1.2).is_err());
    }
}
