//! The construction pipeline.
//!
//! reduce → partition around the mean → heavy and light prefix sums → K-way split → K-way pack,
//! or the single sweep when [`Method::Sweep`] is selected.

use crate::config::{BuildConfig, Method, Scan};
use crate::error::{ProbError, check_weights};
use crate::lookback::decoupled_prefix_sum_into;
use crate::pack::{PackInput, pack_splits, par_pack_splits};
use crate::partition::{gather_into, stable_partition_into};
use crate::prefix::{Repair, check_repair, compensated_scan_into, repair_monotone};
use crate::reduce::reduce;
use crate::split::{Split, split_k_into};
use crate::sweep::sweeping_alias_table;
use crate::table::AliasTable;
use crate::validate::is_alias_table;

/// Scratch buffers for one construction at a time.
///
/// Every build clears and refills them; only their capacity carries over. After a split/pack
/// build they hold that build's intermediates, which is what the oracles in
/// [`validate`](crate::validate) inspect.
#[derive(Debug, Default)]
pub struct Workspace {
    indices: Vec<usize>,
    heavy_count: usize,
    heavy_values: Vec<f64>,
    light_values: Vec<f64>,
    heavy_prefix: Vec<f64>,
    light_prefix: Vec<f64>,
    splits: Vec<Split>,
    total: f64,
    mean: f64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heavy_indices(&self) -> &[usize] {
        &self.indices[..self.heavy_count]
    }

    pub fn light_indices(&self) -> &[usize] {
        &self.indices[self.heavy_count..]
    }

    pub fn heavy_prefix(&self) -> &[f64] {
        &self.heavy_prefix
    }

    pub fn light_prefix(&self) -> &[f64] {
        &self.light_prefix
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Reduced total weight of the last build.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    fn clear(&mut self) {
        self.indices.clear();
        self.heavy_count = 0;
        self.heavy_values.clear();
        self.light_values.clear();
        self.heavy_prefix.clear();
        self.light_prefix.clear();
        self.splits.clear();
        self.total = 0.0;
        self.mean = 0.0;
    }

    fn split_pack(
        &mut self,
        weights: &[f64],
        k: usize,
        cfg: &BuildConfig,
    ) -> Result<AliasTable, ProbError> {
        let mean = self.mean;
        self.heavy_count = stable_partition_into(weights, mean, &mut self.indices);
        let (heavy, light) = self.indices.split_at(self.heavy_count);
        log::debug!(
            "partition: {} heavy, {} light around mean {mean}",
            heavy.len(),
            light.len()
        );

        gather_into(weights, heavy, &mut self.heavy_values);
        gather_into(weights, light, &mut self.light_values);
        let hr = scan(&self.heavy_values, cfg, &mut self.heavy_prefix)?;
        let lr = scan(&self.light_values, cfg, &mut self.light_prefix)?;
        log::debug!(
            "prefix sums: heavy {} light {} ({} + {} repairs)",
            self.heavy_prefix.last().copied().unwrap_or(0.0),
            self.light_prefix.last().copied().unwrap_or(0.0),
            hr.count,
            lr.count
        );

        split_k_into(
            &self.heavy_prefix,
            &self.light_prefix,
            mean,
            k,
            cfg.parallel,
            &mut self.splits,
        )?;
        log::debug!("split into {k} segments");

        let input = PackInput {
            heavy,
            light,
            weights,
            mean,
        };
        if cfg.parallel {
            par_pack_splits(input, &self.splits)
        } else {
            pack_splits(input, &self.splits)
        }
    }
}

fn scan(seq: &[f64], cfg: &BuildConfig, out: &mut Vec<f64>) -> Result<Repair, ProbError> {
    match cfg.scan {
        Scan::Sequential => compensated_scan_into(seq, out),
        Scan::DecoupledLookback { block_size, depth } => {
            decoupled_prefix_sum_into(seq, block_size, depth, out)?
        }
    }
    check_repair(repair_monotone(seq, out), cfg.repair_threshold)
}

impl AliasTable {
    /// Build with [`BuildConfig::default`].
    ///
    /// # Errors
    /// Empty input, negative or non-finite weights, or weights that sum to zero.
    pub fn new(weights: &[f64]) -> Result<Self, ProbError> {
        Self::build(weights, &BuildConfig::default())
    }

    /// [`AliasTable::new`] for single-precision weights.
    pub fn from_f32(weights: &[f32]) -> Result<Self, ProbError> {
        let wide: Vec<f64> = weights.iter().map(|&w| f64::from(w)).collect();
        Self::new(&wide)
    }

    pub fn build(weights: &[f64], cfg: &BuildConfig) -> Result<Self, ProbError> {
        Self::build_in(&mut Workspace::new(), weights, cfg)
    }

    /// Build reusing the buffers of `ws`.
    pub fn build_in(
        ws: &mut Workspace,
        weights: &[f64],
        cfg: &BuildConfig,
    ) -> Result<Self, ProbError> {
        ws.clear();
        check_weights(weights)?;
        let n = weights.len();
        let total = reduce(weights, cfg.reduction)?;
        if !total.is_finite() || total <= 0.0 {
            return Err(ProbError::ZeroSum);
        }
        ws.total = total;
        ws.mean = total / n as f64;
        log::debug!(
            "building alias table over {n} weights ({:?}), total {total}",
            cfg.method
        );

        let table = match cfg.method {
            Method::Sweep => sweeping_alias_table(weights, total)?,
            Method::SplitPack { segments } => ws.split_pack(weights, segments.count(n), cfg)?,
        };

        if let Some(margin) = cfg.verify {
            is_alias_table(weights, table.entries(), total, margin).map_err(ProbError::Rejected)?;
            log::debug!("table verified within {margin}");
        }
        Ok(table)
    }
}
