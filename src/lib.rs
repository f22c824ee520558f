//! # splitalias
//!
//! Alias tables for O(1) weighted sampling, built by a pipeline that splits into independent
//! shards.
//!
//! Construction follows the split/pack scheme: reduce the weights, partition them into heavy
//! (above the mean) and light buckets, take prefix sums of both sides, then cut the combined mass
//! into K segments by binary search. Each segment is packed with the classic two-pointer loop,
//! and segments never touch each other's slots, so both the split and the pack phase are plain
//! parallel maps with a single barrier between them.
//!
//! A single sequential sweep is available as well, both as a fallback and as the reference the
//! split/pack output is cross-checked against.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use splitalias::AliasTable;
//!
//! # fn main() -> Result<(), splitalias::ProbError> {
//! let table = AliasTable::new(&[60.0, 30.0, 9.0, 1.0])?;
//! let mut rng = rand::rng();
//! let tier = table.sample_index(&mut rng); // 0..4
//! # Ok(()) }
//! ```
//!
//! ## Choosing the construction
//!
//! ```rust,ignore
//! use splitalias::{AliasTable, BuildConfig, Scan, Workspace};
//!
//! # fn main() -> Result<(), splitalias::ProbError> {
//! let cfg = BuildConfig::split_pack(1024)
//!     .with_scan(Scan::DecoupledLookback { block_size: 4096, depth: 32 })
//!     .with_verify(1e-3);
//! let mut ws = Workspace::new();
//! let weights = splitalias::generate_weights(splitalias::Distribution::Seeded(1), 1 << 20);
//! let table = AliasTable::build_in(&mut ws, &weights, &cfg)?;
//! # Ok(()) }
//! ```
//!
//! ## Performance
//! * **Build**: O(N + K log N) work, split and pack spread over the rayon pool.
//! * **Sample**: O(1) per draw (2 random numbers, 1 branch).
//! * **Space**: 8 bytes per entry (`f32` probability, `u32` alias).
//!
//! ## Gotchas
//! * Weights must be **non-negative** and not all zero; `NaN`/∞ are rejected.
//! * Populations are limited to `u32::MAX` entries.
//! * This is for *fixed* distributions. If you mutate weights often, rebuild the table.
//!
//! ## Validation
//! [`validate`] holds an oracle per construction stage. They return typed reports instead of
//! booleans, and the pipeline can run the alias-table oracle on its own output
//! ([`BuildConfig::with_verify`]).

pub mod config;
mod construct;
mod error;
pub mod generate;
pub mod its;
pub mod lookback;
pub mod pack;
pub mod partition;
pub mod prefix;
pub mod reduce;
pub mod sampler;
pub mod split;
pub mod stats;
pub mod sweep;
mod table;
pub mod validate;

/// A minimal interface for “index samplers”.
/// Implemented by [`AliasTable`] (O(1)) and [`CumulativeTable`] (O(log N)).
#[allow(clippy::len_without_is_empty)]
pub trait IndexSampler {
    fn len(&self) -> usize;
    fn sample_index<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> usize;
}

pub use config::{BuildConfig, Method, Reduction, Scan, Segments};
pub use construct::Workspace;
pub use error::ProbError;
pub use generate::{Distribution, generate_weights};
pub use its::CumulativeTable;
pub use split::Split;
pub use sweep::sweeping_alias_table;
pub use table::{AliasEntry, AliasTable};
pub use validate::{AliasTableReport, Report};
