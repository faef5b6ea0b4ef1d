//! Simulation parameters for a single epidemic run, and the subset of them that is in effect on
//! any given day.
//!
//! Parameters are usually read from a JSON file:
//!
//! ```json
//! {
//!   "population": 1000,
//!   "days_before_treatment": 50,
//!   "contacts_per_human": 4.0,
//!   "contacts_per_human_with_treatment": 2.0,
//!   "recovery_days": 5,
//!   "recovery_days_with_treatment": 3,
//!   "probability_of_transmission": 0.2,
//!   "probability_of_transmission_with_treatment": 0.1,
//!   "infected_at_day1": 1
//! }
//! ```
//!
//! `transmission_decay` may be omitted and defaults to [`DEFAULT_TRANSMISSION_DECAY`].
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use derive_builder::Builder;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::EpiError;

/// Daily multiplicative decay of the transmission probability once treatment has started.
pub const DEFAULT_TRANSMISSION_DECAY: f64 = 0.95;

fn default_transmission_decay() -> f64 {
    DEFAULT_TRANSMISSION_DECAY
}

/// Immutable configuration of one run. The defaults reproduce the reference scenario: a large
/// city, treatment introduced on day 50 that shortens infections and reduces contacts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Builder)]
pub struct SimulationParameters {
    #[builder(default = "1_500_000")]
    pub population: u64,

    #[builder(default = "50")]
    pub days_before_treatment: u64,

    #[builder(default = "5.0")]
    pub contacts_per_human: f64,

    #[builder(default = "3.0")]
    pub contacts_per_human_with_treatment: f64,

    #[builder(default = "14")]
    pub recovery_days: usize,

    #[builder(default = "7")]
    pub recovery_days_with_treatment: usize,

    #[builder(default = "0.1")]
    pub probability_of_transmission: f64,

    #[builder(default = "0.05")]
    pub probability_of_transmission_with_treatment: f64,

    #[builder(default = "2")]
    pub infected_at_day1: u64,

    #[serde(default = "default_transmission_decay")]
    #[builder(default = "DEFAULT_TRANSMISSION_DECAY")]
    pub transmission_decay: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParametersBuilder::default().build().unwrap()
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), EpiError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EpiError::InvalidParameter(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn check_contacts(name: &str, value: f64) -> Result<(), EpiError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EpiError::InvalidParameter(format!(
            "{name} must be a finite number >= 0, got {value}"
        )))
    }
}

impl SimulationParameters {
    /// Checks every field against its domain. Called before any run of a batch starts.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.population <= 1 {
            return Err(EpiError::InvalidParameter(format!(
                "population must be greater than 1, got {}",
                self.population
            )));
        }
        if self.recovery_days == 0 || self.recovery_days_with_treatment == 0 {
            return Err(EpiError::InvalidParameter(format!(
                "recovery periods must be at least one day, got {} and {}",
                self.recovery_days, self.recovery_days_with_treatment
            )));
        }
        if self.infected_at_day1 > self.population {
            return Err(EpiError::InvalidParameter(format!(
                "infected_at_day1 ({}) exceeds population ({})",
                self.infected_at_day1, self.population
            )));
        }
        check_contacts("contacts_per_human", self.contacts_per_human)?;
        check_contacts(
            "contacts_per_human_with_treatment",
            self.contacts_per_human_with_treatment,
        )?;
        check_probability(
            "probability_of_transmission",
            self.probability_of_transmission,
        )?;
        check_probability(
            "probability_of_transmission_with_treatment",
            self.probability_of_transmission_with_treatment,
        )?;
        check_probability("transmission_decay", self.transmission_decay)?;
        Ok(())
    }

    /// The longest infectious period any cohort can have in a run.
    #[must_use]
    pub fn max_recovery_days(&self) -> usize {
        self.recovery_days.max(self.recovery_days_with_treatment)
    }

    /// Expected secondary infections caused by one infectious person in a fully susceptible
    /// population before treatment starts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn basic_reproduction_number(&self) -> f64 {
        self.contacts_per_human * self.probability_of_transmission * self.recovery_days as f64
    }
}

/// Reads and validates parameters from a JSON file.
///
/// # Errors
///
/// Returns an `EpiError` if the file cannot be read or parsed, or if the parameters are invalid.
pub fn load_parameters_from_json(file_path: &Path) -> Result<SimulationParameters, EpiError> {
    trace!("loading parameters from {}", file_path.display());
    let config_file = File::open(file_path)?;
    let reader = BufReader::new(config_file);
    let parameters: SimulationParameters = serde_json::from_reader(reader)?;
    parameters.validate()?;
    Ok(parameters)
}

/// The contact rate, recovery period and transmission probability in effect on a given day.
///
/// A run starts with [`ActiveParameters::before_treatment`] and swaps in
/// [`ActiveParameters::with_treatment`] as a whole on the treatment day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveParameters {
    pub contacts_per_human: f64,
    pub recovery_days: usize,
    pub transmission_probability: f64,
}

impl ActiveParameters {
    #[must_use]
    pub fn before_treatment(parameters: &SimulationParameters) -> Self {
        Self {
            contacts_per_human: parameters.contacts_per_human,
            recovery_days: parameters.recovery_days,
            transmission_probability: parameters.probability_of_transmission,
        }
    }

    #[must_use]
    pub fn with_treatment(parameters: &SimulationParameters) -> Self {
        Self {
            contacts_per_human: parameters.contacts_per_human_with_treatment,
            recovery_days: parameters.recovery_days_with_treatment,
            transmission_probability: parameters.probability_of_transmission_with_treatment,
        }
    }

    /// Returns these parameters with the transmission probability scaled by `factor`.
    #[must_use]
    pub fn decayed(self, factor: f64) -> Self {
        Self {
            transmission_probability: self.transmission_probability * factor,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn small_parameters() -> SimulationParametersBuilder {
        let mut builder = SimulationParametersBuilder::default();
        builder
            .population(1000)
            .infected_at_day1(1)
            .recovery_days(5)
            .recovery_days_with_treatment(3);
        builder
    }

    #[test]
    fn defaults_are_the_reference_scenario() {
        let parameters = SimulationParameters::default();
        assert_eq!(parameters.population, 1_500_000);
        assert_eq!(parameters.days_before_treatment, 50);
        assert_eq!(parameters.recovery_days, 14);
        assert_eq!(parameters.recovery_days_with_treatment, 7);
        assert_eq!(parameters.infected_at_day1, 2);
        assert_eq!(parameters.transmission_decay, DEFAULT_TRANSMISSION_DECAY);
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn rejects_tiny_population() {
        let parameters = small_parameters()
            .population(1)
            .infected_at_day1(0)
            .build()
            .unwrap();
        assert!(matches!(
            parameters.validate(),
            Err(EpiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_zero_recovery_days() {
        let parameters = small_parameters()
            .recovery_days_with_treatment(0)
            .build()
            .unwrap();
        assert!(matches!(
            parameters.validate(),
            Err(EpiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let parameters = small_parameters()
                .probability_of_transmission(bad)
                .build()
                .unwrap();
            assert!(matches!(
                parameters.validate(),
                Err(EpiError::InvalidParameter(_))
            ));
        }
        let parameters = small_parameters().transmission_decay(1.2).build().unwrap();
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn rejects_negative_contacts() {
        let parameters = small_parameters()
            .contacts_per_human_with_treatment(-1.0)
            .build()
            .unwrap();
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn rejects_more_initial_infections_than_people() {
        let parameters = small_parameters().infected_at_day1(1001).build().unwrap();
        let error = parameters.validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid parameter: infected_at_day1 (1001) exceeds population (1000)"
        );
    }

    #[test]
    fn treatment_swaps_all_active_values() {
        let parameters = small_parameters()
            .contacts_per_human(4.0)
            .contacts_per_human_with_treatment(2.0)
            .probability_of_transmission(0.2)
            .probability_of_transmission_with_treatment(0.1)
            .build()
            .unwrap();
        let before = ActiveParameters::before_treatment(&parameters);
        let after = ActiveParameters::with_treatment(&parameters);
        assert_eq!(
            before,
            ActiveParameters {
                contacts_per_human: 4.0,
                recovery_days: 5,
                transmission_probability: 0.2,
            }
        );
        assert_eq!(
            after,
            ActiveParameters {
                contacts_per_human: 2.0,
                recovery_days: 3,
                transmission_probability: 0.1,
            }
        );
        let decayed = after.decayed(0.5);
        assert_eq!(decayed.transmission_probability, 0.05);
        assert_eq!(decayed.recovery_days, 3);
        assert_eq!(parameters.max_recovery_days(), 5);
    }

    #[test]
    fn load_from_json_defaults_decay() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "population": 1000,
                "days_before_treatment": 10,
                "contacts_per_human": 4,
                "contacts_per_human_with_treatment": 2,
                "recovery_days": 5,
                "recovery_days_with_treatment": 3,
                "probability_of_transmission": 0.2,
                "probability_of_transmission_with_treatment": 0.1,
                "infected_at_day1": 1
            }}"#
        )
        .unwrap();
        let parameters = load_parameters_from_json(file.path()).unwrap();
        assert_eq!(parameters.population, 1000);
        assert_eq!(parameters.contacts_per_human, 4.0);
        assert_eq!(parameters.transmission_decay, DEFAULT_TRANSMISSION_DECAY);
    }

    #[test]
    fn load_from_json_validates() {
        let mut file = NamedTempFile::new().unwrap();
        let parameters = small_parameters().population(0).infected_at_day1(0).build().unwrap();
        serde_json::to_writer(&mut file, &parameters).unwrap();
        assert!(matches!(
            load_parameters_from_json(file.path()),
            Err(EpiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn load_from_missing_file() {
        let result = load_parameters_from_json(Path::new("does/not/exist.json"));
        assert!(matches!(result, Err(EpiError::IoError(_))));
    }
}
