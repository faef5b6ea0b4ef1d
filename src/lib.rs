//! Batch simulation of a discrete-time, stochastic epidemic in a closed population.
//!
//! A single run tracks a fully mixed population of susceptible, infectious and recovered people
//! one day at a time. Each day every infectious person makes a number of contacts, susceptible
//! people are infected with a binomial draw, and infectious cohorts recover once their infectious
//! period is over. Partway through the epidemic a treatment changes the contact rate, the
//! infectious period and the transmission probability, after which the transmission probability
//! keeps decaying every day. A run ends on the first day nobody is infectious.
//!
//! The pieces, in the order they build on each other:
//! * [`parameters`]: the configuration of a run and its validation
//! * [`random`]: one independently seeded generator per run
//! * [`cohorts`]: the ring buffer of infectious cohorts
//! * [`simulation`]: one run from the initial infections to extinction
//! * [`batch`]: many runs and their mean duration, mean cumulative infections and duration
//!   variance
//! * [`report`]: CSV output of a batch
//! * [`runner`]: the command line front end used by the `epibatch` binary
//!
//! ```rust
//! use epibatch::batch::{run_batch, BatchOptions};
//! use epibatch::parameters::SimulationParametersBuilder;
//!
//! let parameters = SimulationParametersBuilder::default()
//!     .population(10_000)
//!     .build()
//!     .unwrap();
//! let options = BatchOptions {
//!     num_runs: 10,
//!     base_seed: 42,
//!     threads: 2,
//! };
//! let results = run_batch(&parameters, &options).unwrap();
//! assert_eq!(results.runs().len(), 10);
//! assert!(results.mean_duration() >= 14.0);
//! ```
pub mod batch;
pub mod cohorts;
pub mod error;
pub mod log;
pub mod numeric;
pub mod parameters;
pub mod random;
pub mod report;
pub mod runner;
pub mod simulation;

pub use batch::{run_batch, BatchOptions, BatchResults, BatchStatistics};
pub use error::EpiError;
pub use parameters::{SimulationParameters, SimulationParametersBuilder};
pub use simulation::{simulate, EpidemicRun, RunResult};

// Re-exports for the random generators runs are parameterized over.
pub use rand;
