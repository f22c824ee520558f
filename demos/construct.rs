//! Build an alias table over a large synthetic population and report how well it samples.
//!
//! Run with `RUST_LOG=debug` to watch the pipeline stages.

use std::time::Instant;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use splitalias::sampler::par_sample_counts;
use splitalias::stats::rmse;
use splitalias::validate::is_alias_table;
use splitalias::{
    AliasTable, BuildConfig, Distribution, ProbError, Scan, Workspace, generate_weights,
};

fn main() -> Result<(), ProbError> {
    env_logger::init();

    let n = 1 << 22;
    let weights = generate_weights(Distribution::PseudoRandomUniform, n);
    let mut ws = Workspace::new();

    let configs = [
        ("sweep", BuildConfig::sweep()),
        ("split/pack", BuildConfig::default()),
        (
            "split/pack + look-back scan",
            BuildConfig::default().with_scan(Scan::DecoupledLookback {
                block_size: 1 << 14,
                depth: 32,
            }),
        ),
    ];
    for (name, cfg) in configs {
        let start = Instant::now();
        let table = AliasTable::build_in(&mut ws, &weights, &cfg)?;
        let elapsed = start.elapsed();
        let check = match is_alias_table(&weights, table.entries(), ws.total(), 1e-4) {
            Ok(()) => "ok".to_string(),
            Err(report) => report.to_string(),
        };
        println!("{name:<28} {elapsed:>10.2?}  verify: {check}");
    }

    let table = AliasTable::new(&weights)?;
    let draws = 1 << 24;
    let counts = par_sample_counts(&table, 42, draws, 1 << 16);
    println!("rmse over {draws} draws: {:.3}", rmse(&weights, &counts));

    let mut rng = Pcg64::seed_from_u64(7);
    let first: Vec<u32> = table.sample_many(&mut rng, 8);
    println!("first samples: {first:?}");
    Ok(())
}
