//! Inclusive prefix sums with a monotonicity repair pass.
//!
//! The splitter binary-searches the heavy and light prefix arrays and needs them monotone. A
//! compensated running sum is monotone for non-negative input almost always, but rounding in
//! the compensation term can still step backwards. The repair pass clamps such a step to the
//! previous value. That trades a little fidelity for a search that always terminates correctly,
//! so every repair is measured and a repair larger than the configured threshold is an error
//! rather than something to hide.

use crate::error::ProbError;

/// What the monotonicity repair pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Repair {
    /// Number of clamped entries.
    pub count: usize,
    /// Largest clamp, relative to the prefix value it was clamped to.
    pub worst: f64,
    /// Index of the largest clamp.
    pub worst_index: usize,
}

impl Repair {
    pub fn is_clean(&self) -> bool {
        self.count == 0
    }
}

/// Neumaier-compensated inclusive running sum, no repair.
pub fn prefix_sum_unrepaired(seq: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(seq.len());
    compensated_scan_into(seq, &mut out);
    out
}

/// Compensated inclusive prefix sum, repaired to be direction-consistent with `seq`.
pub fn prefix_sum(seq: &[f64]) -> Vec<f64> {
    let mut out = prefix_sum_unrepaired(seq);
    repair_monotone(seq, &mut out);
    out
}

/// Prefix sum into `out`, failing if any single repair exceeds `threshold`.
pub fn checked_prefix_sum_into(
    seq: &[f64],
    threshold: f64,
    out: &mut Vec<f64>,
) -> Result<Repair, ProbError> {
    compensated_scan_into(seq, out);
    let repair = repair_monotone(seq, out);
    check_repair(repair, threshold)
}

/// Fail on a repair whose worst clamp exceeds `threshold`; an untouched scan always passes.
pub(crate) fn check_repair(repair: Repair, threshold: f64) -> Result<Repair, ProbError> {
    if !repair.is_clean() && repair.worst > threshold {
        return Err(ProbError::PrefixDiverged {
            index: repair.worst_index,
            magnitude: repair.worst,
            threshold,
        });
    }
    if !repair.is_clean() {
        log::warn!(
            "prefix repair clamped {} entries, worst {:e} at {}",
            repair.count,
            repair.worst,
            repair.worst_index
        );
    }
    Ok(repair)
}

pub(crate) fn compensated_scan_into(seq: &[f64], out: &mut Vec<f64>) {
    out.clear();
    out.reserve(seq.len());
    let mut sum = 0.0f64;
    let mut c = 0.0f64;
    for &x in seq {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
        out.push(sum + c);
    }
}

/// Clamp every entry that moved against the sign of its element back to its predecessor.
///
/// Positive elements must not decrease the prefix, negative ones must not increase it, zeros
/// must leave it where it was.
pub fn repair_monotone(seq: &[f64], prefix: &mut [f64]) -> Repair {
    debug_assert_eq!(seq.len(), prefix.len());
    let mut repair = Repair::default();
    for i in 1..prefix.len().min(seq.len()) {
        let prev = prefix[i - 1];
        let diff = prefix[i] - prev;
        let wrong_way = (seq[i] >= 0.0 && diff < 0.0) || (seq[i] <= 0.0 && diff > 0.0);
        if wrong_way {
            let magnitude = diff.abs() / prev.abs().max(f64::MIN_POSITIVE);
            repair.count += 1;
            if magnitude > repair.worst {
                repair.worst = magnitude;
                repair.worst_index = i;
            }
            prefix[i] = prev;
        }
    }
    repair
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_sums() {
        assert_eq!(prefix_sum(&[1.0, 2.0, 3.0]), vec![1.0, 3.0, 6.0]);
        assert!(prefix_sum(&[]).is_empty());
    }

    #[test]
    fn repair_clamps_backwards_steps() {
        let seq = [1.0, 0.0, 1.0, 1.0];
        let mut prefix = vec![1.0, 0.999_999, 2.0, 1.5];
        let repair = repair_monotone(&seq, &mut prefix);
        assert_eq!(prefix, vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(repair.count, 2);
        assert_eq!(repair.worst_index, 3);
        assert!((repair.worst - 0.25).abs() < 1e-12);
    }

    #[test]
    fn negative_elements_must_not_increase() {
        let seq = [2.0, -1.0];
        let mut prefix = vec![2.0, 2.5];
        let repair = repair_monotone(&seq, &mut prefix);
        assert_eq!(prefix, vec![2.0, 2.0]);
        assert_eq!(repair.count, 1);
    }

    #[test]
    fn large_repairs_are_fatal() {
        let repair = Repair {
            count: 1,
            worst: 0.5,
            worst_index: 4,
        };
        assert!(matches!(
            check_repair(repair, 1e-9),
            Err(ProbError::PrefixDiverged { index: 4, .. })
        ));
        assert!(check_repair(repair, 1.0).is_ok());
    }

    #[test]
    fn threshold_only_applies_to_actual_repairs() {
        assert!(check_repair(Repair::default(), -1.0).is_ok());

        let seq = [1.0, 1.0];
        let mut prefix = vec![1.0, 0.5];
        let repair = repair_monotone(&seq, &mut prefix);
        assert!(matches!(
            check_repair(repair, -1.0),
            Err(ProbError::PrefixDiverged { index: 1, .. })
        ));
    }

    #[test]
    fn checked_scan_of_clean_input_needs_no_repair() {
        let seq: Vec<f64> = (0..10_000).map(|i| (i % 7) as f64 * 0.1).collect();
        let mut out = Vec::new();
        let repair = checked_prefix_sum_into(&seq, 0.0, &mut out).unwrap();
        assert!(repair.is_clean());
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }
}
