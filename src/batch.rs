//! The batch runner: many independent epidemic runs with the same parameters, summarized by the
//! mean duration, the mean number ever infected and the population variance of the duration.
//!
//! Runs share no state. Run `i` draws from a generator seeded with `(base_seed, i)`, so a batch
//! gives the same results in the same order whether it runs on one thread or many.
use std::collections::BTreeMap;
use std::thread;
use std::time::Instant;

use humantime::format_duration;
use log::{debug, info};
use serde::Serialize;

use crate::error::EpiError;
use crate::parameters::SimulationParameters;
use crate::random::rng_for_run;
use crate::simulation::{simulate, RunResult};

/// The number of runs in the reference scenario.
pub const DEFAULT_NUM_RUNS: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    pub num_runs: usize,
    pub base_seed: u64,
    /// Worker threads to spread the runs over. Results do not depend on it.
    pub threads: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            num_runs: DEFAULT_NUM_RUNS,
            base_seed: 0,
            threads: 1,
        }
    }
}

impl BatchOptions {
    /// # Errors
    ///
    /// Returns `EpiError::InvalidParameter` if there are no runs or no threads.
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.num_runs == 0 {
            return Err(EpiError::InvalidParameter(
                "num_runs must be at least 1".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(EpiError::InvalidParameter(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary statistics of a set of runs. All values are zero for an empty set.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct BatchStatistics {
    pub runs: usize,
    pub mean_duration: f64,
    pub mean_infected: f64,
    /// Population variance, i.e. divided by the number of runs.
    pub duration_variance: f64,
}

impl BatchStatistics {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(results: &[RunResult]) -> Self {
        if results.is_empty() {
            return Self {
                runs: 0,
                mean_duration: 0.0,
                mean_infected: 0.0,
                duration_variance: 0.0,
            };
        }
        let n = results.len() as f64;
        let total_duration: u64 = results.iter().map(|result| result.duration).sum();
        let total_infected: u64 = results.iter().map(|result| result.cumulative_infected).sum();
        let mean_duration = total_duration as f64 / n;
        let mean_infected = total_infected as f64 / n;
        let duration_variance = results
            .iter()
            .map(|result| (result.duration as f64 - mean_duration).powi(2))
            .sum::<f64>()
            / n;
        Self {
            runs: results.len(),
            mean_duration,
            mean_infected,
            duration_variance,
        }
    }
}

/// The finished, read-only outcome of a batch: every run in submission order and their summary.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchResults {
    runs: Vec<RunResult>,
    statistics: BatchStatistics,
}

impl BatchResults {
    #[must_use]
    pub fn new(runs: Vec<RunResult>) -> Self {
        let statistics = BatchStatistics::from_results(&runs);
        Self { runs, statistics }
    }

    #[must_use]
    pub fn runs(&self) -> &[RunResult] {
        &self.runs
    }

    #[must_use]
    pub fn statistics(&self) -> BatchStatistics {
        self.statistics
    }

    #[must_use]
    pub fn mean_duration(&self) -> f64 {
        self.statistics.mean_duration
    }

    #[must_use]
    pub fn mean_infected(&self) -> f64 {
        self.statistics.mean_infected
    }

    #[must_use]
    pub fn duration_variance(&self) -> f64 {
        self.statistics.duration_variance
    }

    pub fn durations(&self) -> impl Iterator<Item = u64> + '_ {
        self.runs.iter().map(|result| result.duration)
    }

    /// Number of runs per distinct duration, in increasing order of duration.
    #[must_use]
    pub fn duration_histogram(&self) -> BTreeMap<u64, usize> {
        let mut histogram = BTreeMap::new();
        for duration in self.durations() {
            *histogram.entry(duration).or_insert(0) += 1;
        }
        histogram
    }
}

fn run_one(
    parameters: &SimulationParameters,
    base_seed: u64,
    run_index: usize,
) -> Result<RunResult, EpiError> {
    let result = simulate(parameters, rng_for_run(base_seed, run_index))?;
    debug!(
        "run {}: duration {} days, {} infected",
        run_index + 1,
        result.duration,
        result.cumulative_infected
    );
    Ok(result)
}

fn run_sequential(
    parameters: &SimulationParameters,
    options: &BatchOptions,
) -> Result<Vec<RunResult>, EpiError> {
    (0..options.num_runs)
        .map(|run_index| run_one(parameters, options.base_seed, run_index))
        .collect()
}

/// Stripes the runs over scoped worker threads and puts the results back in run order.
fn run_parallel(
    parameters: &SimulationParameters,
    options: &BatchOptions,
    threads: usize,
) -> Result<Vec<RunResult>, EpiError> {
    let mut indexed_results: Vec<(usize, RunResult)> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                s.spawn(move || {
                    (worker..options.num_runs)
                        .step_by(threads)
                        .map(|run_index| {
                            run_one(parameters, options.base_seed, run_index)
                                .map(|result| (run_index, result))
                        })
                        .collect::<Result<Vec<_>, EpiError>>()
                })
            })
            .collect();

        let mut indexed_results = Vec::with_capacity(options.num_runs);
        for handle in handles {
            let worker_results = handle
                .join()
                .map_err(|_| EpiError::from("a batch worker thread panicked"))??;
            indexed_results.extend(worker_results);
        }
        Ok::<_, EpiError>(indexed_results)
    })?;

    indexed_results.sort_unstable_by_key(|(run_index, _)| *run_index);
    Ok(indexed_results
        .into_iter()
        .map(|(_, result)| result)
        .collect())
}

/// Validates the parameters and options, then executes `options.num_runs` independent runs.
///
/// # Errors
///
/// Returns `EpiError::InvalidParameter` before any run starts if the parameters or options are
/// invalid.
pub fn run_batch(
    parameters: &SimulationParameters,
    options: &BatchOptions,
) -> Result<BatchResults, EpiError> {
    parameters.validate()?;
    options.validate()?;

    let threads = options.threads.min(options.num_runs);
    info!(
        "starting {} runs on {} thread(s), base seed {}, R0 before treatment {:.3}",
        options.num_runs,
        threads,
        options.base_seed,
        parameters.basic_reproduction_number()
    );
    let start_time = Instant::now();
    let runs = if threads == 1 {
        run_sequential(parameters, options)?
    } else {
        run_parallel(parameters, options, threads)?
    };

    let results = BatchResults::new(runs);
    info!(
        "finished {} runs in {}: mean duration {}, mean infected {}, duration variance {}",
        results.statistics.runs,
        format_duration(start_time.elapsed()),
        results.mean_duration(),
        results.mean_infected(),
        results.duration_variance()
    );
    Ok(results)
}
