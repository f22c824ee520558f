//! Single-pass block scan with decoupled look-back.
//!
//! Each block scans its own elements, publishes its aggregate, then walks backwards over its
//! predecessors' descriptors accumulating aggregates until it meets one that already published
//! an inclusive prefix. No second pass over the input and no global barrier is needed.
//!
//! Blocks are claimed through an atomic ticket counter, so a block is only ever waited on after
//! a running worker has claimed it. That keeps the spin-wait free of deadlocks on any pool
//! size, including a single thread.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::error::ProbError;

const NOT_READY: u8 = 0;
const AGGREGATE: u8 = 1;
const INCLUSIVE: u8 = 2;

#[derive(Default)]
struct Descriptor {
    status: AtomicU8,
    aggregate: AtomicU64,
    inclusive: AtomicU64,
}

impl Descriptor {
    fn publish_aggregate(&self, value: f64) {
        self.aggregate.store(value.to_bits(), Ordering::Relaxed);
        self.status.store(AGGREGATE, Ordering::Release);
    }

    fn publish_inclusive(&self, value: f64) {
        self.inclusive.store(value.to_bits(), Ordering::Relaxed);
        self.status.store(INCLUSIVE, Ordering::Release);
    }

    fn wait(&self) -> u8 {
        loop {
            let status = self.status.load(Ordering::Acquire);
            if status != NOT_READY {
                return status;
            }
            std::hint::spin_loop();
        }
    }
}

/// Inclusive prefix sum of `seq` in blocks of `block_size`, looking back over at most `depth`
/// predecessor descriptors per window.
///
/// No monotonicity repair is applied; see [`repair_monotone`](crate::prefix::repair_monotone).
pub fn decoupled_prefix_sum(
    seq: &[f64],
    block_size: usize,
    depth: usize,
) -> Result<Vec<f64>, ProbError> {
    let mut out = Vec::new();
    decoupled_prefix_sum_into(seq, block_size, depth, &mut out)?;
    Ok(out)
}

/// Total of `seq` computed by the same pass; the last inclusive prefix.
pub fn decoupled_reduce(seq: &[f64], block_size: usize, depth: usize) -> Result<f64, ProbError> {
    Ok(decoupled_prefix_sum(seq, block_size, depth)?
        .last()
        .copied()
        .unwrap_or(0.0))
}

pub(crate) fn decoupled_prefix_sum_into(
    seq: &[f64],
    block_size: usize,
    depth: usize,
    out: &mut Vec<f64>,
) -> Result<(), ProbError> {
    if block_size < 2 {
        return Err(ProbError::InvalidBlockSize { block_size });
    }
    if depth == 0 {
        return Err(ProbError::InvalidLookbackDepth);
    }
    out.clear();
    out.resize(seq.len(), 0.0);
    if seq.is_empty() {
        return Ok(());
    }

    let blocks = seq.len().div_ceil(block_size);
    let descriptors: Vec<Descriptor> = (0..blocks).map(|_| Descriptor::default()).collect();
    let chunks: Vec<Mutex<&mut [f64]>> = out.chunks_mut(block_size).map(Mutex::new).collect();
    let ticket = AtomicUsize::new(0);
    let workers = rayon::current_num_threads().clamp(1, blocks);

    (0..workers).into_par_iter().for_each(|_| {
        loop {
            let t = ticket.fetch_add(1, Ordering::Relaxed);
            if t >= blocks {
                break;
            }
            let input = &seq[t * block_size..((t + 1) * block_size).min(seq.len())];
            let mut chunk = chunks[t].lock().unwrap_or_else(|e| e.into_inner());

            let aggregate = local_scan(input, &mut chunk);
            if t == 0 {
                descriptors[0].publish_inclusive(aggregate);
                continue;
            }
            descriptors[t].publish_aggregate(aggregate);
            let exclusive = look_back(&descriptors, t, depth);
            descriptors[t].publish_inclusive(exclusive + aggregate);
            for v in chunk.iter_mut() {
                *v += exclusive;
            }
        }
    });
    Ok(())
}

/// Compensated inclusive scan of one block. Returns the block aggregate.
fn local_scan(input: &[f64], out: &mut [f64]) -> f64 {
    let mut sum = 0.0f64;
    let mut c = 0.0f64;
    for (x, o) in input.iter().zip(out.iter_mut()) {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
        *o = sum + c;
    }
    sum + c
}

/// Exclusive prefix of block `t`, accumulated over windows of `depth` predecessors.
fn look_back(descriptors: &[Descriptor], t: usize, depth: usize) -> f64 {
    let mut exclusive = 0.0;
    let mut end = t;
    while end > 0 {
        let start = end.saturating_sub(depth);
        let mut window = 0.0;
        for p in (start..end).rev() {
            let d = &descriptors[p];
            if d.wait() == INCLUSIVE {
                window += f64::from_bits(d.inclusive.load(Ordering::Relaxed));
                return exclusive + window;
            }
            window += f64::from_bits(d.aggregate.load(Ordering::Relaxed));
        }
        exclusive += window;
        end = start;
    }
    exclusive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefix::prefix_sum;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn matches_sequential_scan() {
        let mut rng = StdRng::seed_from_u64(11);
        let seq: Vec<f64> = (0..50_001).map(|_| rng.random::<f64>()).collect();
        let reference = prefix_sum(&seq);
        for (block, depth) in [(2, 1), (64, 4), (1000, 32), (100_000, 1)] {
            let got = decoupled_prefix_sum(&seq, block, depth).unwrap();
            assert_eq!(got.len(), seq.len());
            for (i, (a, b)) in got.iter().zip(&reference).enumerate() {
                assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0), "i={i} {a} vs {b}");
            }
        }
    }

    #[test]
    fn reduce_is_last_prefix() {
        let seq = vec![0.5; 1025];
        assert_eq!(decoupled_reduce(&seq, 32, 2).unwrap(), 512.5);
        assert_eq!(decoupled_reduce(&[], 32, 2).unwrap(), 0.0);
    }

    #[test]
    fn single_thread_pool_does_not_deadlock() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let seq = vec![1.0; 4096];
        let got = pool.install(|| decoupled_prefix_sum(&seq, 16, 3)).unwrap();
        assert_eq!(got[4095], 4096.0);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(matches!(
            decoupled_prefix_sum(&[1.0], 1, 1),
            Err(ProbError::InvalidBlockSize { .. })
        ));
        assert!(matches!(
            decoupled_prefix_sum(&[1.0], 8, 0),
            Err(ProbError::InvalidLookbackDepth)
        ));
    }
}
