//! Diagnostic logging for epibatch. Logging reports on the simulator itself and is separate from
//! the CSV reports of a batch.
//!
//! The library logs nothing until a level is set. The `epibatch` binary sets one from
//! `--log-level` and `-v`, and programs embedding the library can do the same:
//!
//! ```rust
//! use epibatch::log::{set_log_level, set_module_filters, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! // Show the day-by-day trace of every run.
//! set_module_filters(&[("epibatch::simulation", LevelFilter::Trace)]);
//! ```
//!
//! A module filter replaces the global level for that module and everything below it, in both
//! directions. `epibatch::simulation` emits one trace line per simulated day of every run, so
//! unless it has a filter of its own it is held at debug even when the global level is trace.
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

pub use log::LevelFilter;
use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

/// The module that traces every simulated day.
pub const SIMULATION_MODULE: &str = "epibatch::simulation";

/// The most verbose level `SIMULATION_MODULE` inherits from the global level.
const SIMULATION_LEVEL_CAP: LevelFilter = LevelFilter::Debug;

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// The global level and the module filters the installed logger follows.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    global_level: LevelFilter,
    module_filters: BTreeMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    handle: Option<log4rs::Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_level: LevelFilter::Off,
            module_filters: BTreeMap::new(),

            #[cfg(feature = "logging")]
            handle: None,
        }
    }
}

// True if `module` is `parent` or lies below it.
fn is_within(module: &str, parent: &str) -> bool {
    module
        .strip_prefix(parent)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl LogConfiguration {
    /// The level of every module logger to install: the explicit filters, plus the cap on
    /// `SIMULATION_MODULE` when the global level would otherwise let its day traces through.
    pub(in crate::log) fn module_levels(&self) -> Vec<(String, LevelFilter)> {
        let mut levels: Vec<(String, LevelFilter)> = self
            .module_filters
            .iter()
            .map(|(module, level)| (module.clone(), *level))
            .collect();
        let simulation_filtered = self
            .module_filters
            .keys()
            .any(|module| is_within(SIMULATION_MODULE, module));
        if !simulation_filtered && self.global_level > SIMULATION_LEVEL_CAP {
            levels.push((SIMULATION_MODULE.to_string(), SIMULATION_LEVEL_CAP));
        }
        levels
    }

    /// The most verbose level any module can log at.
    #[cfg(any(test, not(feature = "logging")))]
    pub(in crate::log) fn max_level(&self) -> LevelFilter {
        self.module_levels()
            .into_iter()
            .map(|(_, level)| level)
            .fold(self.global_level, Ord::max)
    }
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    // The configuration is only replaced wholesale, so a poisoned lock still holds a valid one.
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Sets the level for every module without a filter of its own. `LevelFilter::Off` disables
/// logging.
pub fn set_log_level(level: LevelFilter) {
    let mut configuration = get_log_configuration();
    configuration.global_level = level;
    configuration.apply();
}

/// Replaces all module filters with `module_filters`.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    let mut configuration = get_log_configuration();
    configuration.module_filters = module_filters
        .iter()
        .map(|(module, level)| ((*module).to_string(), *level))
        .collect();
    configuration.apply();
}
