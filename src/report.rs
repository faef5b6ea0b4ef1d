//! CSV reports of a finished batch. These are the hand-off point to whatever formats tables or
//! draws the duration histogram.
//!
//! Three files are written to the report directory, each name starting with the configured
//! prefix:
//! * `runs.csv`: `run,duration,cumulative_infected`, one row per run in run order
//! * `duration_histogram.csv`: `duration,count`, in increasing order of duration
//! * `summary.csv`: `runs,mean_duration,mean_infected,duration_variance`
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::{info, trace};
use serde_derive::Serialize;

use crate::batch::BatchResults;
use crate::error::EpiError;

pub const RUNS_REPORT: &str = "runs.csv";
pub const HISTOGRAM_REPORT: &str = "duration_histogram.csv";
pub const SUMMARY_REPORT: &str = "summary.csv";

/// Where reports go and whether existing files may be replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportOptions {
    /// Reports go to the current working directory with no prefix, and existing files are
    /// not overwritten.
    #[must_use]
    pub fn new() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn path_for(&self, short_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}", self.file_prefix, short_name))
    }
}

#[derive(Serialize)]
struct RunRow {
    run: usize,
    duration: u64,
    cumulative_infected: u64,
}

#[derive(Serialize)]
struct HistogramRow {
    duration: u64,
    count: usize,
}

// Checks that the path is a CSV file we are allowed to write. Creates all parent directories if
// they do not exist.
fn generate_validate_filepath(path: &Path, overwrite: bool) -> Result<File, EpiError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {}
        _ => {
            return Err(EpiError::ReportError(
                "Report output files must be CSVs at this time".to_string(),
            ))
        }
    }
    if path.exists() && !overwrite {
        return Err(EpiError::ReportError(format!(
            "File already exists: {}. Please set `overwrite` to true in the report options or \
             use a different name.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

fn write_rows<T: serde::Serialize>(
    path: &Path,
    overwrite: bool,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), EpiError> {
    trace!("writing report {}", path.display());
    let mut writer = Writer::from_writer(generate_validate_filepath(path, overwrite)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one row per run, numbered from 1 in run order.
///
/// # Errors
///
/// Returns an `EpiError` if the file exists and overwriting is disabled, or on I/O failure.
pub fn write_run_report(
    results: &BatchResults,
    options: &ReportOptions,
) -> Result<PathBuf, EpiError> {
    let path = options.path_for(RUNS_REPORT);
    let rows = results.runs().iter().enumerate().map(|(index, result)| RunRow {
        run: index + 1,
        duration: result.duration,
        cumulative_infected: result.cumulative_infected,
    });
    write_rows(&path, options.overwrite, rows)?;
    Ok(path)
}

/// Writes the number of runs per distinct duration.
///
/// # Errors
///
/// Returns an `EpiError` if the file exists and overwriting is disabled, or on I/O failure.
pub fn write_duration_histogram(
    results: &BatchResults,
    options: &ReportOptions,
) -> Result<PathBuf, EpiError> {
    let path = options.path_for(HISTOGRAM_REPORT);
    let rows = results
        .duration_histogram()
        .into_iter()
        .map(|(duration, count)| HistogramRow { duration, count });
    write_rows(&path, options.overwrite, rows)?;
    Ok(path)
}

/// Writes the summary statistics as a single row.
///
/// # Errors
///
/// Returns an `EpiError` if the file exists and overwriting is disabled, or on I/O failure.
pub fn write_summary(results: &BatchResults, options: &ReportOptions) -> Result<PathBuf, EpiError> {
    let path = options.path_for(SUMMARY_REPORT);
    write_rows(&path, options.overwrite, [results.statistics()])?;
    Ok(path)
}

/// Writes every report for the batch and returns their paths.
///
/// # Errors
///
/// Returns the first error encountered; reports written before it are left in place.
pub fn write_reports(
    results: &BatchResults,
    options: &ReportOptions,
) -> Result<Vec<PathBuf>, EpiError> {
    let paths = vec![
        write_run_report(results, options)?,
        write_duration_histogram(results, options)?,
        write_summary(results, options)?,
    ];
    info!(
        "wrote {} reports to {}",
        paths.len(),
        options.directory.display()
    );
    Ok(paths)
}
