use serde::{Deserialize, Serialize};

/// How the total weight is reduced before partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Left-to-right fold. Only useful as a baseline.
    Naive,
    /// Neumaier-compensated summation.
    Kahan,
    /// Pairwise tree, upper levels on the rayon pool.
    Tree,
    /// Fixed-size blocks, combined recursively.
    Block { block_size: usize },
    /// Last entry of a decoupled look-back scan.
    DecoupledLookback { block_size: usize, depth: usize },
}

/// How the heavy and light prefix arrays are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scan {
    /// Single compensated running sum.
    Sequential,
    /// Single-pass block scan with decoupled look-back.
    DecoupledLookback { block_size: usize, depth: usize },
}

/// Number of independent split/pack segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segments {
    /// Exactly `k` segments.
    Fixed(usize),
    /// One segment per `width` table entries, `k = ceil(N / width)`.
    PerSegment(usize),
}

impl Segments {
    /// Resolve to a concrete segment count for a population of `n` weights.
    ///
    /// A width of zero resolves to zero segments, which the splitter rejects.
    pub fn count(self, n: usize) -> usize {
        match self {
            Segments::Fixed(k) => k,
            Segments::PerSegment(0) => 0,
            Segments::PerSegment(width) => n.div_ceil(width),
        }
    }
}

/// Construction path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Partition, prefix sums, K-way split, K-way pack.
    SplitPack { segments: Segments },
    /// Single sequential sweep over the weights.
    Sweep,
}

/// Knobs for [`AliasTable::build`](crate::AliasTable::build).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub method: Method,
    pub reduction: Reduction,
    pub scan: Scan,
    /// Run the split and pack phases on the rayon pool.
    pub parallel: bool,
    /// Largest monotonicity repair tolerated in a prefix array, relative to the prefix value at
    /// that point. Anything larger aborts the build.
    pub repair_threshold: f64,
    /// Absolute error margin; when set the finished table is checked and rejected on failure.
    pub verify: Option<f64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            method: Method::SplitPack {
                segments: Segments::PerSegment(32),
            },
            reduction: Reduction::Tree,
            scan: Scan::Sequential,
            parallel: true,
            repair_threshold: 1e-9,
            verify: None,
        }
    }
}

impl BuildConfig {
    /// Sequential sweep construction, everything else default.
    pub fn sweep() -> Self {
        Self {
            method: Method::Sweep,
            ..Self::default()
        }
    }

    /// Split/pack construction with exactly `k` segments.
    pub fn split_pack(k: usize) -> Self {
        Self {
            method: Method::SplitPack {
                segments: Segments::Fixed(k),
            },
            ..Self::default()
        }
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_scan(mut self, scan: Scan) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_repair_threshold(mut self, threshold: f64) -> Self {
        self.repair_threshold = threshold;
        self
    }

    pub fn with_verify(mut self, margin: f64) -> Self {
        self.verify = Some(margin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_counts() {
        assert_eq!(Segments::Fixed(4).count(100), 4);
        assert_eq!(Segments::PerSegment(32).count(100), 4);
        assert_eq!(Segments::PerSegment(32).count(32), 1);
        assert_eq!(Segments::PerSegment(0).count(32), 0);
    }

    #[test]
    fn loads_partial_json() {
        let cfg: BuildConfig =
            serde_json::from_str(r#"{ "method": "sweep", "verify": 0.01 }"#).unwrap();
        assert_eq!(cfg.method, Method::Sweep);
        assert_eq!(cfg.verify, Some(0.01));
        assert_eq!(cfg.reduction, Reduction::Tree);
    }

    #[test]
    fn tagged_variants_serialize_readably() {
        let cfg = BuildConfig::split_pack(8).with_scan(Scan::DecoupledLookback {
            block_size: 256,
            depth: 4,
        });
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains(r#""split_pack":{"segments":{"fixed":8}}"#), "{json}");
        assert!(json.contains(r#""decoupled_lookback""#), "{json}");
    }

    #[test]
    fn lookback_reduction_from_json() {
        let cfg: BuildConfig = serde_json::from_str(
            r#"{ "reduction": { "decoupled_lookback": { "block_size": 1024, "depth": 16 } } }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.reduction,
            Reduction::DecoupledLookback {
                block_size: 1024,
                depth: 16
            }
        );
    }
}
