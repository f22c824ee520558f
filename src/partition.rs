//! Heavy/light partitioning around a pivot (the mean weight).
//!
//! Heavy means strictly greater than the pivot; ties go light.

/// Indices `0..N` laid out as `[heavy | light]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    indices: Vec<usize>,
    heavy_count: usize,
}

impl Partition {
    /// Assemble a partition from explicit halves. Nothing is checked; run
    /// [`is_partition`](crate::validate::is_partition) on the result when that matters.
    pub fn from_parts(heavy: Vec<usize>, light: Vec<usize>) -> Self {
        let heavy_count = heavy.len();
        let mut indices = heavy;
        indices.extend(light);
        Self {
            indices,
            heavy_count,
        }
    }

    pub fn heavy(&self) -> &[usize] {
        &self.indices[..self.heavy_count]
    }

    pub fn light(&self) -> &[usize] {
        &self.indices[self.heavy_count..]
    }

    pub fn heavy_count(&self) -> usize {
        self.heavy_count
    }

    pub fn light_count(&self) -> usize {
        self.indices.len() - self.heavy_count
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The whole `[heavy | light]` index buffer.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Single swap-based pass. O(N), no order guarantee inside either group.
pub fn partition(weights: &[f64], pivot: f64) -> Partition {
    let mut indices: Vec<usize> = (0..weights.len()).collect();
    let (mut lo, mut hi) = (0, indices.len());
    while lo < hi {
        if weights[indices[lo]] > pivot {
            lo += 1;
        } else {
            hi -= 1;
            indices.swap(lo, hi);
        }
    }
    Partition {
        indices,
        heavy_count: lo,
    }
}

/// Order-preserving index partition.
///
/// Heavy indices are written forward from the front and light indices backward from the back
/// of one buffer, then the light half is reversed back into source order.
pub fn stable_partition(weights: &[f64], pivot: f64) -> Partition {
    let mut indices = Vec::new();
    let heavy_count = stable_partition_into(weights, pivot, &mut indices);
    Partition {
        indices,
        heavy_count,
    }
}

/// [`stable_partition`] into a caller-owned buffer. Returns the heavy count.
pub(crate) fn stable_partition_into(weights: &[f64], pivot: f64, buf: &mut Vec<usize>) -> usize {
    let n = weights.len();
    buf.clear();
    buf.resize(n, 0);
    let (mut h, mut l) = (0, n);
    for (i, &w) in weights.iter().enumerate() {
        if w > pivot {
            buf[h] = i;
            h += 1;
        } else {
            l -= 1;
            buf[l] = i;
        }
    }
    debug_assert_eq!(h, l);
    buf[h..].reverse();
    h
}

/// Value partition without order guarantee. Returns `(values, heavy_count)`.
pub fn partition_values(weights: &[f64], pivot: f64) -> (Vec<f64>, usize) {
    let p = partition(weights, pivot);
    (gather(weights, p.indices()), p.heavy_count())
}

/// Order-preserving value partition. Returns `(values, heavy_count)`.
pub fn stable_partition_values(weights: &[f64], pivot: f64) -> (Vec<f64>, usize) {
    let p = stable_partition(weights, pivot);
    (gather(weights, p.indices()), p.heavy_count())
}

/// `weights[indices[k]]` for every `k`.
pub fn gather(weights: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| weights[i]).collect()
}

pub(crate) fn gather_into(weights: &[f64], indices: &[usize], out: &mut Vec<f64>) {
    out.clear();
    out.extend(indices.iter().map(|&i| weights[i]));
}
