//! The alias table artifact and its O(1) draw.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ProbError;

/// One slot: keep the slot's own index with probability `p`, otherwise redirect to `a`.
///
/// Two 4-byte fields, `#[repr(C)]`, the layout a GPU storage buffer expects.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub p: f32,
    pub a: u32,
}

impl AliasEntry {
    /// Size of one entry in the binary layout.
    pub const BYTES: usize = 8;

    /// Slot that never redirects.
    pub const fn own(index: usize) -> Self {
        Self {
            p: 1.0,
            a: index as u32,
        }
    }

    /// Entry with `p` clamped into `[0, 1]`.
    #[inline]
    pub fn new(p: f64, alias: usize) -> Self {
        Self {
            p: p.clamp(0.0, 1.0) as f32,
            a: alias as u32,
        }
    }

    /// Marker for slots no construction step has written yet.
    pub(crate) const UNSET: Self = Self { p: 0.0, a: u32::MAX };
}

/// Normalized alias table. Immutable once built.
///
/// Deserialization goes through the same structural checks as
/// [`from_le_bytes`](Self::from_le_bytes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

#[derive(Deserialize)]
struct RawTable {
    entries: Vec<AliasEntry>,
}

impl TryFrom<RawTable> for AliasTable {
    type Error = ProbError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Self::try_from(raw.entries)
    }
}

/// Checked counterpart of [`AliasTable::from_entries`].
impl TryFrom<Vec<AliasEntry>> for AliasTable {
    type Error = ProbError;

    fn try_from(entries: Vec<AliasEntry>) -> Result<Self, Self::Error> {
        check_entries(&entries)?;
        Ok(Self { entries })
    }
}

/// Structural checks every externally supplied table must pass: at least one slot, every
/// probability in `[0, 1]` and every alias inside the table.
fn check_entries(entries: &[AliasEntry]) -> Result<(), ProbError> {
    let n = entries.len();
    if n == 0 {
        return Err(ProbError::Empty);
    }
    for (slot, e) in entries.iter().enumerate() {
        if !(0.0..=1.0).contains(&e.p) {
            return Err(ProbError::Malformed(format!(
                "slot {slot}: probability {} outside [0, 1]",
                e.p
            )));
        }
        if e.a as usize >= n {
            return Err(ProbError::Malformed(format!(
                "slot {slot}: alias {} outside table of {n}",
                e.a
            )));
        }
    }
    Ok(())
}

impl AliasTable {
    /// Wrap raw entries without checking them. Run
    /// [`is_alias_table`](crate::validate::is_alias_table) before sampling from untrusted input.
    pub fn from_entries(entries: Vec<AliasEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AliasEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// See [`sampler::sample`](crate::sampler::sample).
    #[inline]
    pub fn sample(&self, u1: usize, u2: f64) -> usize {
        crate::sampler::sample(&self.entries, u1, u2)
    }

    /// Draw a single sample in O(1).
    pub fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u1 = rng.random_range(0..self.entries.len());
        let u2: f64 = rng.random();
        self.sample(u1, u2)
    }

    /// Draw `count` samples.
    pub fn sample_many<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<u32> {
        (0..count).map(|_| self.sample_index(rng) as u32).collect()
    }

    /// Draw `draws` samples, returning counts per index.
    pub fn sample_counts<R: Rng + ?Sized>(&self, rng: &mut R, draws: usize) -> Vec<usize> {
        let mut counts = vec![0usize; self.entries.len()];
        for _ in 0..draws {
            counts[self.sample_index(rng)] += 1;
        }
        counts
    }

    /// Little-endian binary layout: per entry `p` as `f32`, then `a` as `u32`.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * AliasEntry::BYTES);
        for e in &self.entries {
            out.extend_from_slice(&e.p.to_le_bytes());
            out.extend_from_slice(&e.a.to_le_bytes());
        }
        out
    }

    /// Inverse of [`to_le_bytes`](Self::to_le_bytes). Rejects empty or truncated input,
    /// probabilities outside `[0, 1]` and aliases outside the table.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self, ProbError> {
        if bytes.len() % AliasEntry::BYTES != 0 {
            return Err(ProbError::Malformed(format!(
                "length {} is not a multiple of {}",
                bytes.len(),
                AliasEntry::BYTES
            )));
        }
        let entries: Vec<AliasEntry> = bytes
            .chunks_exact(AliasEntry::BYTES)
            .map(|chunk| {
                let (p, a) = chunk.split_at(4);
                AliasEntry {
                    p: f32::from_le_bytes([p[0], p[1], p[2], p[3]]),
                    a: u32::from_le_bytes([a[0], a[1], a[2], a[3]]),
                }
            })
            .collect();
        Self::try_from(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn two_slot() -> AliasTable {
        // weights [3, 1]
        AliasTable::from_entries(vec![AliasEntry::own(0), AliasEntry::new(0.5, 0)])
    }

    #[test]
    fn sample_follows_probability() {
        let t = two_slot();
        assert_eq!(t.sample(0, 0.99), 0);
        assert_eq!(t.sample(1, 0.5), 1);
        assert_eq!(t.sample(1, 0.51), 0);
    }

    #[test]
    fn roughly_matches_distribution() {
        let t = two_slot();
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 20_000usize;
        let counts = t.sample_counts(&mut rng, draws);
        let emp = counts[0] as f64 / draws as f64;
        assert!((emp - 0.75).abs() < 0.02, "emp={emp}");
    }

    #[test]
    fn degenerate_singleton() {
        let t = AliasTable::from_entries(vec![AliasEntry::own(0)]);
        let mut rng = rand::rng();
        for s in t.sample_many(&mut rng, 1000) {
            assert_eq!(s, 0);
        }
    }

    #[test]
    fn entries_clamp_probability() {
        assert_eq!(AliasEntry::new(1.5, 3).p, 1.0);
        assert_eq!(AliasEntry::new(-0.1, 3).p, 0.0);
    }

    #[test]
    fn binary_layout() {
        let t = two_slot();
        let bytes = t.to_le_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[8..12], &0.5f32.to_le_bytes());
        assert_eq!(AliasTable::from_le_bytes(&bytes).unwrap(), t);
    }

    #[test]
    fn binary_decode_rejects_corruption() {
        let mut bytes = two_slot().to_le_bytes();
        assert!(matches!(
            AliasTable::from_le_bytes(&bytes[..15]),
            Err(ProbError::Malformed(_))
        ));
        bytes[12..16].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            AliasTable::from_le_bytes(&bytes),
            Err(ProbError::Malformed(_))
        ));
    }

    #[test]
    fn binary_decode_rejects_empty_input() {
        assert!(matches!(AliasTable::from_le_bytes(&[]), Err(ProbError::Empty)));
    }

    #[test]
    fn deserialization_checks_entries() {
        let bad_alias = r#"{"entries":[{"p":1.0,"a":0},{"p":0.0,"a":7}]}"#;
        assert!(serde_json::from_str::<AliasTable>(bad_alias).is_err());
        let bad_p = r#"{"entries":[{"p":1.5,"a":0}]}"#;
        assert!(serde_json::from_str::<AliasTable>(bad_p).is_err());
        assert!(serde_json::from_str::<AliasTable>(r#"{"entries":[]}"#).is_err());

        let json = serde_json::to_string(&two_slot()).unwrap();
        assert_eq!(serde_json::from_str::<AliasTable>(&json).unwrap(), two_slot());
    }

    #[test]
    fn checked_construction_from_entries() {
        let entries = two_slot().into_entries();
        assert_eq!(AliasTable::try_from(entries.clone()).unwrap(), two_slot());

        let mut nan = entries.clone();
        nan[1].p = f32::NAN;
        assert!(matches!(AliasTable::try_from(nan), Err(ProbError::Malformed(_))));
        assert!(matches!(
            AliasTable::try_from(Vec::<AliasEntry>::new()),
            Err(ProbError::Empty)
        ));
    }
}
