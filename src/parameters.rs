//! Model parameters and their validation.
//!
//! Parameters are plain numeric and enumerated values, typically loaded from a JSON file
//! with `Parameters::from_json_file`. Every field has a default, so a file only has to name
//! the fields it changes; the defaults describe a grocery store with four strata of
//! shoppers and eight aisles.
use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::contact_matrix::ContactMatrix;
use crate::context::Context;
use crate::error::SimError;
use crate::grid::Position;
use crate::obstacle::grocery_store_aisles;
use crate::{define_data_plugin, HashSet};

/// How a susceptible agent's exposure to infected neighbors becomes an infection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionPolicy {
    /// One Bernoulli trial per tick against `probability x` the largest contact rate
    /// among infected neighbors.
    #[default]
    MaxExposure,
    /// `round(rate)` independent trials at `probability`, infected if any succeeds.
    RepeatedTrials,
}

/// When the fatality trial for an infected agent is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalityPolicy {
    /// A fresh trial every tick the agent is infected.
    #[default]
    PerTick,
    /// One trial per infection; the outcome is reapplied on later ticks.
    CachedOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrataParameters {
    pub name: String,
    pub population: usize,
    #[serde(default)]
    pub vaccinated: usize,
    /// Per-tick probability that an infected agent of this strata dies. 0 disables fatality.
    #[serde(default)]
    pub fatality_probability: f64,
}

impl StrataParameters {
    #[must_use]
    pub fn new(name: &str, population: usize) -> Self {
        StrataParameters {
            name: name.to_string(),
            population,
            vaccinated: 0,
            fatality_probability: 0.0,
        }
    }

    #[must_use]
    pub fn unvaccinated(&self) -> usize {
        self.population.saturating_sub(self.vaccinated)
    }
}

/// Initially infected agents, drawn from the unvaccinated pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialInfections {
    /// A number drawn across all strata together.
    Total(usize),
    /// One number per strata, in strata order.
    PerStrata(Vec<usize>),
}

impl Default for InitialInfections {
    fn default() -> Self {
        InitialInfections::Total(5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub strata: Vec<StrataParameters>,
    pub initial_infected: InitialInfections,
    /// Ticks an agent stays infected.
    pub infection_period: u32,
    /// Ticks a recovered agent stays immune. 0 makes recovery permanent.
    pub immunity_period: u32,
    pub transmission_probability: f64,
    pub contact_matrix: ContactMatrix,
    pub grid_width: usize,
    pub grid_height: usize,
    pub obstacles: Vec<Position>,
    pub transmission_policy: TransmissionPolicy,
    pub fatality_policy: FatalityPolicy,
    /// Random cell draws allowed per agent while seeding before giving up.
    pub max_placement_attempts: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        let strata = |name: &str, population: usize, fatality_probability: f64| StrataParameters {
            name: name.to_string(),
            population,
            vaccinated: 0,
            fatality_probability,
        };
        Parameters {
            strata: vec![
                strata("adult", 70, 0.0002),
                strata("child", 70, 0.000_02),
                strata("elder", 70, 0.000_09),
                strata("pregnant", 30, 0.06),
            ],
            initial_infected: InitialInfections::default(),
            infection_period: 10,
            immunity_period: 0,
            transmission_probability: 0.03,
            // Pregnant shoppers mix like adults.
            contact_matrix: ContactMatrix::from([
                [10.0, 3.0, 1.0, 10.0],
                [6.0, 6.0, 1.0, 6.0],
                [5.0, 1.0, 2.0, 5.0],
                [10.0, 3.0, 1.0, 10.0],
            ]),
            grid_width: 50,
            grid_height: 50,
            obstacles: grocery_store_aisles(),
            transmission_policy: TransmissionPolicy::default(),
            fatality_policy: FatalityPolicy::default(),
            max_placement_attempts: 10_000,
        }
    }
}

define_data_plugin!(ParametersPlugin, Option<Parameters>, None);

pub trait ContextParametersExt {
    /// Validates `parameters` and stores them as the parameters of this simulation.
    ///
    /// # Errors
    ///
    /// `SimError::ConfigurationError` if validation fails; nothing is stored in that case.
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SimError>;

    /// # Errors
    ///
    /// Fails if no parameters have been set.
    fn get_parameters(&self) -> Result<&Parameters, SimError>;
}

impl ContextParametersExt for Context {
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SimError> {
        parameters.validate()?;
        *self.get_data_container_mut(ParametersPlugin) = Some(parameters);
        Ok(())
    }

    fn get_parameters(&self) -> Result<&Parameters, SimError> {
        self.get_data_container(ParametersPlugin)
            .and_then(Option::as_ref)
            .ok_or_else(|| SimError::from("parameters have not been set"))
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::ConfigurationError(format!(
            "{name} = {value} must be between 0 and 1"
        )))
    }
}

impl Parameters {
    /// Loads parameters from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the parameters fail
    /// validation.
    pub fn from_json_file(path: &Path) -> Result<Parameters, SimError> {
        let contents = fs::read_to_string(path)?;
        let parameters: Parameters = serde_json::from_str(&contents)?;
        parameters.validate()?;
        Ok(parameters)
    }

    #[must_use]
    pub fn population_size(&self) -> usize {
        self.strata.iter().map(|s| s.population).sum()
    }

    #[must_use]
    pub fn strata_names(&self) -> Vec<String> {
        self.strata.iter().map(|s| s.name.clone()).collect()
    }

    /// Whether recovered agents eventually return to susceptible.
    #[must_use]
    pub fn has_waning_immunity(&self) -> bool {
        self.immunity_period > 0
    }

    /// Checks every constraint the engine relies on.
    ///
    /// # Errors
    ///
    /// `SimError::ConfigurationError` describing the first violated constraint.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.strata.is_empty() {
            return Err(SimError::ConfigurationError(
                "at least one strata is required".to_string(),
            ));
        }

        let mut names = HashSet::default();
        for strata in &self.strata {
            if strata.name.is_empty() {
                return Err(SimError::ConfigurationError(
                    "strata names must not be empty".to_string(),
                ));
            }
            if !names.insert(strata.name.as_str()) {
                return Err(SimError::ConfigurationError(format!(
                    "strata '{}' is listed more than once",
                    strata.name
                )));
            }
            if strata.vaccinated > strata.population {
                return Err(SimError::ConfigurationError(format!(
                    "strata '{}' has {} vaccinated agents but a population of {}",
                    strata.name, strata.vaccinated, strata.population
                )));
            }
            check_probability(
                &format!("fatality_probability of strata '{}'", strata.name),
                strata.fatality_probability,
            )?;
        }

        match &self.initial_infected {
            InitialInfections::Total(count) => {
                let pool: usize = self.strata.iter().map(StrataParameters::unvaccinated).sum();
                if *count > pool {
                    return Err(SimError::ConfigurationError(format!(
                        "{count} initial infections requested but only {pool} agents are unvaccinated"
                    )));
                }
            }
            InitialInfections::PerStrata(counts) => {
                if counts.len() != self.strata.len() {
                    return Err(SimError::ConfigurationError(format!(
                        "initial_infected lists {} counts for {} strata",
                        counts.len(),
                        self.strata.len()
                    )));
                }
                for (strata, count) in self.strata.iter().zip(counts) {
                    if *count > strata.unvaccinated() {
                        return Err(SimError::ConfigurationError(format!(
                            "strata '{}' has {count} initial infections but only {} unvaccinated agents",
                            strata.name,
                            strata.unvaccinated()
                        )));
                    }
                }
            }
        }

        check_probability("transmission_probability", self.transmission_probability)?;

        if self.contact_matrix.size() != self.strata.len() {
            return Err(SimError::ConfigurationError(format!(
                "contact matrix is {0}x{0} but {1} strata are configured",
                self.contact_matrix.size(),
                self.strata.len()
            )));
        }
        self.contact_matrix.validate()?;

        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(SimError::ConfigurationError(format!(
                "grid dimensions {}x{} must both be at least 1",
                self.grid_width, self.grid_height
            )));
        }

        let mut seen = HashSet::default();
        for obstacle in &self.obstacles {
            if obstacle.x >= self.grid_width || obstacle.y >= self.grid_height {
                return Err(SimError::ConfigurationError(format!(
                    "obstacle {obstacle} is outside the {}x{} grid",
                    self.grid_width, self.grid_height
                )));
            }
            if !seen.insert(*obstacle) {
                return Err(SimError::ConfigurationError(format!(
                    "obstacle {obstacle} is listed more than once"
                )));
            }
        }

        let Some(cells) = self.grid_width.checked_mul(self.grid_height) else {
            return Err(SimError::ConfigurationError(format!(
                "a {}x{} grid has more cells than can be addressed",
                self.grid_width, self.grid_height
            )));
        };
        let occupants = self.population_size().saturating_add(self.obstacles.len());
        if occupants > cells {
            return Err(SimError::ConfigurationError(format!(
                "{occupants} agents and obstacles do not fit on a grid of {cells} cells"
            )));
        }

        if self.max_placement_attempts == 0 {
            return Err(SimError::ConfigurationError(
                "max_placement_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
