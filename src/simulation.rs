//! The epidemic run simulator: advances one closed population day by day until nobody is
//! infectious any more.
//!
//! Every day the currently infectious people make contacts, susceptible people are infected with
//! a binomial draw, and the cohort whose infectious period ends recovers. On the treatment day the
//! contact rate, recovery period and transmission probability switch to their treatment values;
//! from then on the transmission probability decays by `transmission_decay` every day, the switch
//! day included.
use log::{debug, trace, warn};
use rand_distr::Binomial;

use crate::cohorts::InfectiousCohorts;
use crate::error::EpiError;
use crate::parameters::{ActiveParameters, SimulationParameters};
use crate::rand::Rng;

/// What a finished run reports to the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// The first day on which nobody was infectious.
    pub duration: u64,
    /// Everyone ever infected, the initial cohort included.
    pub cumulative_infected: u64,
}

/// Keeps the susceptible pool from going negative. A draw larger than the pool is cut down to
/// the pool with a warning.
fn clamp_new_infections(day: u64, drawn: u64, susceptible: u64) -> u64 {
    if drawn > susceptible {
        warn!(
            "day {day}: {drawn} new infections exceed the {susceptible} susceptible people, \
             clamping"
        );
        return susceptible;
    }
    drawn
}

/// The state of the population at the end of one simulated day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayOutcome {
    pub day: u64,
    pub new_infected: u64,
    pub new_recovered: u64,
    /// Infectious after the day's infections and recoveries.
    pub infectious: u64,
    pub susceptible: u64,
}

/// Probability that a susceptible person is infected during one day, given the parameters in
/// effect and the number of people currently infectious.
///
/// A single contact is with an infectious person with probability `infectious / (population - 1)`
/// and transmits with the active transmission probability. Values pushed out of `[0, 1]` by
/// rounding or by an infectious count close to the whole population are clamped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn probability_of_infection(
    active: &ActiveParameters,
    infectious: u64,
    population: u64,
) -> f64 {
    let others = population.saturating_sub(1) as f64;
    let contact_probability =
        clamp_probability(active.transmission_probability * infectious as f64 / others);
    let escape_probability = (1.0 - contact_probability).powf(active.contacts_per_human);
    clamp_probability(1.0 - escape_probability)
}

fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        warn!("infection probability is NaN, using 0");
        0.0
    } else if !(0.0..=1.0).contains(&probability) {
        warn!("infection probability {probability} is outside [0, 1], clamping");
        probability.clamp(0.0, 1.0)
    } else {
        probability
    }
}

/// One epidemic from the initial infections to extinction. The run owns its random source and
/// all of its state.
pub struct EpidemicRun<'a, R: Rng> {
    parameters: &'a SimulationParameters,
    rng: R,
    day: u64,
    cohorts: InfectiousCohorts,
    susceptible: u64,
    cumulative_infected: u64,
    cumulative_recovered: u64,
    active: ActiveParameters,
}

impl<'a, R: Rng> EpidemicRun<'a, R> {
    /// Sets up day 0: the initial infections are infectious for the pre-treatment recovery
    /// period and everybody else is susceptible.
    ///
    /// # Errors
    ///
    /// Returns `EpiError::InvalidParameter` if the parameters do not validate.
    pub fn new(parameters: &'a SimulationParameters, rng: R) -> Result<Self, EpiError> {
        parameters.validate()?;
        let initial = parameters.infected_at_day1;
        Ok(Self {
            parameters,
            rng,
            day: 0,
            cohorts: InfectiousCohorts::new(
                parameters.max_recovery_days(),
                initial,
                parameters.recovery_days,
            ),
            susceptible: parameters.population - initial,
            cumulative_infected: initial,
            cumulative_recovered: 0,
            active: ActiveParameters::before_treatment(parameters),
        })
    }

    #[must_use]
    pub fn day(&self) -> u64 {
        self.day
    }

    #[must_use]
    pub fn susceptible(&self) -> u64 {
        self.susceptible
    }

    #[must_use]
    pub fn infectious(&self) -> u64 {
        self.cohorts.infectious()
    }

    #[must_use]
    pub fn cumulative_infected(&self) -> u64 {
        self.cumulative_infected
    }

    #[must_use]
    pub fn cumulative_recovered(&self) -> u64 {
        self.cumulative_recovered
    }

    #[must_use]
    pub fn active_parameters(&self) -> ActiveParameters {
        self.active
    }

    /// True once nobody is infectious.
    #[must_use]
    pub fn is_extinct(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// Simulates the current day. Returns `None` without changing anything once the epidemic is
    /// extinct.
    pub fn step(&mut self) -> Option<DayOutcome> {
        if self.is_extinct() {
            return None;
        }

        if self.day == self.parameters.days_before_treatment {
            self.active = ActiveParameters::with_treatment(self.parameters);
            debug!("day {}: treatment starts with {:?}", self.day, self.active);
        }
        if self.day >= self.parameters.days_before_treatment {
            self.active = self.active.decayed(self.parameters.transmission_decay);
        }

        let probability = probability_of_infection(
            &self.active,
            self.cohorts.infectious(),
            self.parameters.population,
        );
        let drawn = self.draw_infections(probability);
        let new_infected = clamp_new_infections(self.day, drawn, self.susceptible);

        self.cumulative_infected += new_infected;
        self.susceptible -= new_infected;
        let new_recovered = self.cohorts.advance(new_infected, self.active.recovery_days);
        self.cumulative_recovered += new_recovered;

        let outcome = DayOutcome {
            day: self.day,
            new_infected,
            new_recovered,
            infectious: self.cohorts.infectious(),
            susceptible: self.susceptible,
        };
        trace!("{outcome:?}");
        self.day += 1;
        Some(outcome)
    }

    fn draw_infections(&mut self, probability: f64) -> u64 {
        if self.susceptible == 0 || probability == 0.0 {
            return 0;
        }
        match Binomial::new(self.susceptible, probability) {
            Ok(binomial) => self.rng.sample(binomial),
            Err(error) => {
                warn!(
                    "day {}: cannot draw from Binomial({}, {probability}): {error}",
                    self.day, self.susceptible
                );
                0
            }
        }
    }

    /// Steps until the epidemic is extinct.
    pub fn run_to_extinction(mut self) -> RunResult {
        while self.step().is_some() {}
        RunResult {
            duration: self.day,
            cumulative_infected: self.cumulative_infected,
        }
    }
}

/// Runs one epidemic with the given random source.
///
/// # Errors
///
/// Returns `EpiError::InvalidParameter` if the parameters do not validate.
pub fn simulate<R: Rng>(parameters: &SimulationParameters, rng: R) -> Result<RunResult, EpiError> {
    Ok(EpidemicRun::new(parameters, rng)?.run_to_extinction())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;
    use crate::parameters::SimulationParametersBuilder;
    use crate::rand::SeedableRng;
    use crate::random::RunRng;

    fn scenario() -> SimulationParametersBuilder {
        let mut builder = SimulationParametersBuilder::default();
        builder
            .population(1000)
            .infected_at_day1(1)
            .probability_of_transmission(0.2)
            .probability_of_transmission_with_treatment(0.2)
            .contacts_per_human(4.0)
            .contacts_per_human_with_treatment(4.0)
            .recovery_days(5)
            .recovery_days_with_treatment(5)
            .days_before_treatment(u64::MAX);
        builder
    }

    #[test]
    fn no_initial_infection_ends_immediately() {
        let parameters = scenario().infected_at_day1(0).build().unwrap();
        for seed in 0..20 {
            let result = simulate(&parameters, RunRng::seed_from_u64(seed)).unwrap();
            assert_eq!(
                result,
                RunResult {
                    duration: 0,
                    cumulative_infected: 0
                }
            );
        }
    }

    #[test]
    fn zero_transmission_lasts_one_recovery_period() {
        for (population, contacts, days_before_treatment) in
            [(2, 0.0, 0), (1000, 4.0, 2), (1_000_000, 50.0, 100)]
        {
            let parameters = scenario()
                .population(population)
                .infected_at_day1(2)
                .contacts_per_human(contacts)
                .contacts_per_human_with_treatment(contacts)
                .probability_of_transmission(0.0)
                .probability_of_transmission_with_treatment(0.0)
                .recovery_days(7)
                .recovery_days_with_treatment(3)
                .days_before_treatment(days_before_treatment)
                .build()
                .unwrap();
            let result = simulate(&parameters, RunRng::seed_from_u64(1)).unwrap();
            assert_eq!(
                result,
                RunResult {
                    duration: 7,
                    cumulative_infected: 2
                }
            );
        }
    }

    #[test]
    fn counts_stay_consistent_every_day() {
        let parameters = scenario().build().unwrap();
        for seed in 0..20 {
            let mut run = EpidemicRun::new(&parameters, RunRng::seed_from_u64(seed)).unwrap();
            let mut last_infected = run.cumulative_infected();
            let mut last_susceptible = run.susceptible();
            let mut last_recovered = run.cumulative_recovered();
            while let Some(outcome) = run.step() {
                assert!(run.cumulative_infected() >= last_infected);
                assert!(run.susceptible() <= last_susceptible);
                assert!(run.cumulative_recovered() >= last_recovered);
                assert_eq!(
                    run.susceptible(),
                    parameters.population - run.cumulative_infected()
                );
                assert_eq!(
                    run.infectious(),
                    run.cumulative_infected() - run.cumulative_recovered()
                );
                assert_eq!(outcome.susceptible, run.susceptible());
                assert_eq!(outcome.day + 1, run.day());
                last_infected = run.cumulative_infected();
                last_susceptible = run.susceptible();
                last_recovered = run.cumulative_recovered();
            }
            assert!(run.is_extinct());
            assert_eq!(run.cumulative_recovered(), run.cumulative_infected());
        }
    }

    #[test]
    fn same_seed_same_result() {
        let parameters = SimulationParameters {
            population: 10_000,
            ..SimulationParameters::default()
        };
        for seed in [0, 7, 42] {
            let first = simulate(&parameters, RunRng::seed_from_u64(seed)).unwrap();
            let second = simulate(&parameters, RunRng::seed_from_u64(seed)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn epidemic_outlasts_one_recovery_period_when_r0_above_one() {
        let parameters = scenario().build().unwrap();
        assert!(parameters.basic_reproduction_number() > 1.0);
        let runs = 200;
        let total: u64 = (0..runs)
            .map(|seed| {
                let result = simulate(&parameters, RunRng::seed_from_u64(seed)).unwrap();
                assert!(result.duration >= 5);
                assert!(result.cumulative_infected <= parameters.population);
                result.duration
            })
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total as f64 / runs as f64;
        assert!(mean > 5.0, "mean duration {mean}");

        let silent = scenario()
            .probability_of_transmission(0.0)
            .probability_of_transmission_with_treatment(0.0)
            .build()
            .unwrap();
        assert_eq!(silent.basic_reproduction_number(), 0.0);
        for seed in 0..runs {
            let result = simulate(&silent, RunRng::seed_from_u64(seed)).unwrap();
            assert_eq!(result.duration, 5);
        }
    }

    #[test]
    fn treatment_switches_on_its_day_and_decays_daily() {
        let parameters = scenario()
            .probability_of_transmission(0.0)
            .probability_of_transmission_with_treatment(0.5)
            .contacts_per_human_with_treatment(0.0)
            .recovery_days(10)
            .recovery_days_with_treatment(3)
            .days_before_treatment(2)
            .build()
            .unwrap();
        let mut run = EpidemicRun::new(&parameters, RunRng::seed_from_u64(3)).unwrap();
        run.step();
        run.step();
        assert_eq!(
            run.active_parameters(),
            ActiveParameters::before_treatment(&parameters)
        );
        run.step();
        let active = run.active_parameters();
        assert_eq!(active.recovery_days, 3);
        assert_eq!(active.contacts_per_human, 0.0);
        assert_almost_eq!(active.transmission_probability, 0.5 * 0.95, 1e-12);
        run.step();
        assert_almost_eq!(
            run.active_parameters().transmission_probability,
            0.5 * 0.95 * 0.95,
            1e-12
        );
        // Nobody is infected without contacts; the initial cohort keeps its 10 day period.
        let result = run.run_to_extinction();
        assert_eq!(
            result,
            RunResult {
                duration: 10,
                cumulative_infected: 1
            }
        );
    }

    #[test]
    fn treatment_on_day_zero_stops_transmission() {
        let parameters = scenario()
            .probability_of_transmission(1.0)
            .probability_of_transmission_with_treatment(0.0)
            .days_before_treatment(0)
            .build()
            .unwrap();
        let result = simulate(&parameters, RunRng::seed_from_u64(11)).unwrap();
        assert_eq!(
            result,
            RunResult {
                duration: 5,
                cumulative_infected: 1
            }
        );
    }

    #[test]
    fn whole_population_infected_with_certain_transmission() {
        let parameters = scenario()
            .population(50)
            .probability_of_transmission(1.0)
            .contacts_per_human(1000.0)
            .build()
            .unwrap();
        let result = simulate(&parameters, RunRng::seed_from_u64(5)).unwrap();
        assert_eq!(result.cumulative_infected, 50);
        assert!(result.duration > 5);
    }

    #[test]
    fn probability_of_infection_formula() {
        let active = ActiveParameters {
            contacts_per_human: 2.0,
            recovery_days: 5,
            transmission_probability: 0.5,
        };
        // One contact infects with 0.5 * 10 / 100 = 0.05
        assert_almost_eq!(
            probability_of_infection(&active, 10, 101),
            1.0 - 0.95 * 0.95,
            1e-12
        );
        assert_eq!(probability_of_infection(&active, 0, 101), 0.0);
    }

    #[test]
    fn probability_of_infection_is_clamped() {
        let active = ActiveParameters {
            contacts_per_human: 1.5,
            recovery_days: 5,
            transmission_probability: 1.0,
        };
        // Two infectious people and only one other person per contact.
        assert_eq!(probability_of_infection(&active, 2, 2), 1.0);
    }

    #[test]
    fn new_infections_never_exceed_susceptible() {
        assert_eq!(clamp_new_infections(3, 12, 5), 5);
        assert_eq!(clamp_new_infections(3, 5, 5), 5);
        assert_eq!(clamp_new_infections(3, 4, 5), 4);
        assert_eq!(clamp_new_infections(3, 1, 0), 0);
    }

    #[test]
    fn stepping_an_extinct_run_does_nothing() {
        let parameters = scenario().infected_at_day1(0).build().unwrap();
        let mut run = EpidemicRun::new(&parameters, RunRng::seed_from_u64(0)).unwrap();
        assert!(run.step().is_none());
        assert_eq!(run.day(), 0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let parameters = scenario().recovery_days(0).build().unwrap();
        assert!(matches!(
            simulate(&parameters, RunRng::seed_from_u64(0)),
            Err(EpiError::InvalidParameter(_))
        ));
    }
}
