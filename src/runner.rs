use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::{info, LevelFilter};

use crate::batch::{run_batch, BatchOptions, BatchResults, DEFAULT_NUM_RUNS};
use crate::error::EpiError;
use crate::log::{set_log_level, set_module_filters};
use crate::parameters::{load_parameters_from_json, SimulationParameters};
use crate::report::{write_reports, ReportOptions};

/// Log level used by the command line when neither `--log-level` nor `-v` is given, so that
/// clamped probabilities and draws are still reported.
const DEFAULT_CLI_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Default cli arguments for the epibatch runner
#[derive(Parser, Debug, Clone)]
#[command(name = "epibatch", version, about)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a simulation parameters config file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of independent runs
    #[arg(short, long, default_value_t = DEFAULT_NUM_RUNS)]
    pub num_runs: usize,

    /// Number of worker threads
    #[arg(short, long, default_value = "1")]
    pub threads: usize,

    /// Optional path for report output
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional prefix for report files
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Overwrite existing report files?
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Enable logging: a level (e.g. `info`), module filters (e.g.
    /// `epibatch::simulation=trace`), or both separated by commas
    #[arg(long)]
    pub log_level: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Default for BaseArgs {
    fn default() -> Self {
        BaseArgs {
            random_seed: 0,
            config: None,
            num_runs: DEFAULT_NUM_RUNS,
            threads: 1,
            output_dir: None,
            prefix: String::new(),
            force_overwrite: false,
            log_level: None,
            verbose: 0,
        }
    }
}

/// A parsed `--log-level` argument.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct LogLevels {
    pub global: Option<LevelFilter>,
    pub modules: Vec<(String, LevelFilter)>,
}

fn parse_level(level: &str) -> Result<LevelFilter, EpiError> {
    level
        .trim()
        .parse()
        .map_err(|_| EpiError::InvalidParameter(format!("unknown log level `{level}`")))
}

/// Parses `LEVEL`, `module=LEVEL` or a comma separated list of both.
///
/// # Errors
///
/// Returns `EpiError::InvalidParameter` for an unknown level name.
pub fn parse_log_levels(levels: &str) -> Result<LogLevels, EpiError> {
    let mut log_levels = LogLevels::default();
    for item in levels.split(',').filter(|item| !item.trim().is_empty()) {
        match item.split_once('=') {
            Some((module, level)) => {
                log_levels
                    .modules
                    .push((module.trim().to_string(), parse_level(level)?));
            }
            None => log_levels.global = Some(parse_level(item)?),
        }
    }
    Ok(log_levels)
}

fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => DEFAULT_CLI_LOG_LEVEL,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_logging(args: &BaseArgs) -> Result<(), EpiError> {
    let log_levels = match &args.log_level {
        Some(levels) => parse_log_levels(levels)?,
        None => LogLevels::default(),
    };

    let mut global = log_levels
        .global
        .unwrap_or_else(|| verbosity_level(args.verbose));
    if args.verbose > 0 {
        global = global.max(verbosity_level(args.verbose));
    }
    // Module filters override the global level in both directions.
    set_log_level(global);

    let module_filters: Vec<(&str, LevelFilter)> = log_levels
        .modules
        .iter()
        .map(|(module, level)| (module.as_str(), *level))
        .collect();
    set_module_filters(&module_filters);
    for (module, level) in &module_filters {
        info!("Logging enabled for {module} at level {level}");
    }
    Ok(())
}

/// Loads the parameters, runs the batch and writes reports, as requested by `args`.
fn execute(args: &BaseArgs) -> Result<BatchResults, EpiError> {
    // Optionally load parameters from a file
    let parameters = match &args.config {
        Some(config_path) => {
            info!("Loading simulation parameters from: {}", config_path.display());
            load_parameters_from_json(config_path)?
        }
        None => SimulationParameters::default(),
    };

    let options = BatchOptions {
        num_runs: args.num_runs,
        base_seed: args.random_seed,
        threads: args.threads,
    };
    let results = run_batch(&parameters, &options)?;

    // Optionally write reports
    if let Some(output_dir) = &args.output_dir {
        let mut report_options = ReportOptions::new();
        report_options
            .directory(output_dir.clone())
            .file_prefix(args.prefix.clone())
            .overwrite(args.force_overwrite);
        write_reports(&results, &report_options)?;
    }

    Ok(results)
}

/// Runs a batch configured by the command line.
///
/// # Errors
///
/// Returns an error if the configuration, the parameters or the report output is invalid.
pub fn run_with_args() -> Result<BatchResults, EpiError> {
    run_with_args_internal(BaseArgs::parse())
}

/// Runs a batch configured by already parsed arguments.
///
/// # Errors
///
/// Returns an error if the configuration, the parameters or the report output is invalid.
pub fn run_with_args_internal(args: BaseArgs) -> Result<BatchResults, EpiError> {
    configure_logging(&args)?;
    execute(&args)
}
