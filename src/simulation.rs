use log::info;

use crate::context::Context;
use crate::error::SimError;
use crate::parameters::{ContextParametersExt, Parameters};
use crate::population::seed_population;
use crate::random::ContextRandomExt;
use crate::scheduler::update_running;

pub trait ContextSimulationExt {
    /// Validates `parameters`, stores them, seeds the grid and the population, and sets the
    /// running flag. `init_random` must have been called first.
    ///
    /// # Errors
    ///
    /// `SimError::ConfigurationError` for invalid parameters, `SimError::CapacityError` if
    /// seeding cannot place an agent, or an error if the random module is not initialized.
    fn init_simulation(&mut self, parameters: Parameters) -> Result<(), SimError>;
}

impl ContextSimulationExt for Context {
    fn init_simulation(&mut self, parameters: Parameters) -> Result<(), SimError> {
        let seed = self.get_base_seed().map_err(|_| {
            SimError::from("random module must be initialized before the simulation")
        })?;
        self.set_parameters(parameters)?;
        seed_population(self)?;
        update_running(self);
        info!("simulation initialized with seed {seed}");
        Ok(())
    }
}

/// Builds a ready-to-run context from `parameters` and a random seed.
///
/// # Errors
///
/// See [`ContextSimulationExt::init_simulation`].
pub fn new(parameters: Parameters, seed: u64) -> Result<Context, SimError> {
    let mut context = Context::new();
    context.init_random(seed);
    context.init_simulation(parameters)?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::HealthState;
    use crate::metrics::ContextMetricsExt;
    use crate::population::ContextPopulationExt;
    use crate::scheduler::ContextSchedulerExt;

    #[test]
    fn default_parameters_build_the_grocery_store() {
        let context = new(Parameters::default(), 0).unwrap();
        assert_eq!(context.get_population_size(), 240);
        assert_eq!(context.get_obstacles().len(), 104);
        assert_eq!(context.query_agents(HealthState::Infected).len(), 5);
        assert!(context.is_running());
        assert_eq!(
            context.population_snapshot().unwrap().metrics()["total_susceptible"],
            235
        );
    }

    #[test]
    fn random_must_be_initialized() {
        let mut context = Context::new();
        let result = context.init_simulation(Parameters::default());
        assert!(matches!(result, Err(SimError::SimError(_))));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut parameters = Parameters::default();
        parameters.transmission_probability = 2.0;
        assert!(matches!(
            new(parameters, 0),
            Err(SimError::ConfigurationError(_))
        ));
    }
}
