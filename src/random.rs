//! Random number generators for epidemic runs.
//!
//! Every run owns its generator. The generator for run `i` of a batch is seeded from the batch's
//! base seed and `i` alone, so a run draws the same numbers whichever worker thread executes it
//! and however many other runs the batch contains.
use log::trace;
use xxhash_rust::xxh3::xxh3_64;

use crate::rand::rngs::SmallRng;
use crate::rand::SeedableRng;

/// The generator type every run draws from.
pub type RunRng = SmallRng;

/// Computes the seed of run `run_index` from the batch base seed.
#[must_use]
pub fn run_seed(base_seed: u64, run_index: usize) -> u64 {
    let seed_offset = xxh3_64(&(run_index as u64).to_le_bytes());
    base_seed.wrapping_add(seed_offset)
}

/// Creates the generator for run `run_index` of a batch seeded with `base_seed`.
#[must_use]
pub fn rng_for_run(base_seed: u64, run_index: usize) -> RunRng {
    let seed = run_seed(base_seed, run_index);
    trace!("creating new RNG (seed={seed}) for run {run_index}");
    RunRng::seed_from_u64(seed)
}
