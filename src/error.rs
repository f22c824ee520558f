use crate::validate::AliasTableReport;

/// Everything that can stop an alias table from being built.
///
/// Input-contract violations are reported before any work is done. Numerical trouble that the
/// pipeline refuses to paper over (a prefix repair beyond the configured threshold, a table that
/// fails verification) is reported too; the partially built table is dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProbError {
    #[error("input is empty")]
    Empty,

    #[error("weights contain a negative value at index {index}: {value}")]
    Negative { index: usize, value: f64 },

    #[error("weights contain a non-finite value at index {index}: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("sum of weights is zero or not finite")]
    ZeroSum,

    #[error("population of {len} weights does not fit 32-bit alias indices")]
    TooLarge { len: usize },

    #[error("cannot split {n} weights into {k} segments (need 1 <= k <= n)")]
    InvalidSplitCount { k: usize, n: usize },

    #[error("block size must be at least 2, got {block_size}")]
    InvalidBlockSize { block_size: usize },

    #[error("look-back depth must be at least 1")]
    InvalidLookbackDepth,

    #[error(
        "prefix sum diverged at index {index}: repaired by {magnitude:e}, threshold {threshold:e}"
    )]
    PrefixDiverged {
        index: usize,
        magnitude: f64,
        threshold: f64,
    },

    #[error("packing filled {filled} of {len} table slots")]
    PackIncomplete { filled: usize, len: usize },

    #[error("malformed alias table bytes: {0}")]
    Malformed(String),

    #[error("constructed table failed verification: {0}")]
    Rejected(AliasTableReport),
}

/// Checks the weight contract shared by every construction path: non-empty, finite,
/// non-negative, addressable by `u32`.
pub(crate) fn check_weights(weights: &[f64]) -> Result<(), ProbError> {
    if weights.is_empty() {
        return Err(ProbError::Empty);
    }
    if weights.len() > u32::MAX as usize {
        return Err(ProbError::TooLarge { len: weights.len() });
    }
    for (index, &value) in weights.iter().enumerate() {
        if !value.is_finite() {
            return Err(ProbError::NonFinite { index, value });
        }
        if value.is_sign_negative() && value != 0.0 {
            return Err(ProbError::Negative { index, value });
        }
    }
    Ok(())
}
