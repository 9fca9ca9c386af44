//! Disease progression for a single agent.
//!
//! An infected agent first faces its strata's fatality trial; if it survives, it recovers
//! once its infection timer has run out and otherwise counts the timer down. With waning
//! immunity a recovered agent counts its immunity timer down the same way and becomes
//! susceptible again when it runs out. Dead agents leave the grid for good.
use log::trace;

use crate::agent::{AgentId, HealthState};
use crate::context::Context;
use crate::define_rng;
use crate::error::SimError;
use crate::grid::grid_mut;
use crate::occupant::Occupant;
use crate::parameters::{ContextParametersExt, FatalityPolicy};
use crate::population::{agent_mut, ContextPopulationExt};
use crate::random::ContextRandomExt;

define_rng!(FatalityRng);

/// Runs the fatality trial for an infected agent under the configured policy.
fn fatality_trial(
    context: &mut Context,
    agent_id: AgentId,
    probability: f64,
) -> Result<bool, SimError> {
    match context.get_parameters()?.fatality_policy {
        FatalityPolicy::PerTick => context.sample_bool(FatalityRng, probability),
        FatalityPolicy::CachedOutcome => {
            if let Some(outcome) = context.get_agent(agent_id)?.fatality_outcome {
                return Ok(outcome);
            }
            let outcome = context.sample_bool(FatalityRng, probability)?;
            agent_mut(context, agent_id)?.fatality_outcome = Some(outcome);
            Ok(outcome)
        }
    }
}

/// Marks an agent dead and frees its cell.
fn kill(context: &mut Context, agent_id: AgentId) -> Result<(), SimError> {
    grid_mut(context)?.remove(Occupant::Agent(agent_id))?;
    agent_mut(context, agent_id)?.die();
    trace!("{agent_id:?} died");
    Ok(())
}

/// Advances the agent's infection or immunity timers by one tick.
pub(crate) fn advance_health(context: &mut Context, agent_id: AgentId) -> Result<(), SimError> {
    let agent = context.get_agent(agent_id)?;
    let parameters = context.get_parameters()?;
    match agent.state() {
        HealthState::Infected => {
            let fatality_probability = parameters.strata[agent.strata().0].fatality_probability;
            let immunity_period = parameters.immunity_period;
            if fatality_probability > 0.0
                && fatality_trial(context, agent_id, fatality_probability)?
            {
                return kill(context, agent_id);
            }
            let agent = agent_mut(context, agent_id)?;
            if agent.infection_timer == 0 {
                agent.recover(immunity_period);
                trace!("{agent_id:?} recovered");
            } else {
                agent.infection_timer -= 1;
            }
        }
        HealthState::Recovered if parameters.has_waning_immunity() => {
            let agent = agent_mut(context, agent_id)?;
            if agent.immunity_timer == 0 {
                agent.lose_immunity();
                trace!("{agent_id:?} lost immunity");
            } else {
                agent.immunity_timer -= 1;
            }
        }
        HealthState::Susceptible | HealthState::Recovered | HealthState::Dead => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact_matrix::ContactMatrix;
    use crate::grid::ContextGridExt;
    use crate::parameters::{InitialInfections, Parameters, StrataParameters};
    use crate::simulation;

    fn parameters(fatality_probability: f64) -> Parameters {
        Parameters {
            strata: vec![StrataParameters {
                fatality_probability,
                ..StrataParameters::new("a", 1)
            }],
            initial_infected: InitialInfections::Total(1),
            infection_period: 3,
            contact_matrix: ContactMatrix::uniform(1, 1.0),
            grid_width: 5,
            grid_height: 5,
            obstacles: vec![],
            ..Parameters::default()
        }
    }

    fn state(context: &Context) -> HealthState {
        context.get_agent(AgentId(0)).unwrap().state()
    }

    #[test]
    fn infection_runs_its_course() {
        let mut context = simulation::new(parameters(0.0), 0).unwrap();
        assert_eq!(context.get_agent(AgentId(0)).unwrap().infection_timer(), 3);

        for expected_timer in [2, 1, 0] {
            advance_health(&mut context, AgentId(0)).unwrap();
            assert_eq!(state(&context), HealthState::Infected);
            assert_eq!(
                context.get_agent(AgentId(0)).unwrap().infection_timer(),
                expected_timer
            );
        }
        advance_health(&mut context, AgentId(0)).unwrap();
        assert_eq!(state(&context), HealthState::Recovered);

        // Without waning immunity recovery is permanent.
        for _ in 0..10 {
            advance_health(&mut context, AgentId(0)).unwrap();
            assert_eq!(state(&context), HealthState::Recovered);
        }
    }

    #[test]
    fn zero_infection_period_recovers_immediately() {
        let mut parameters = parameters(0.0);
        parameters.infection_period = 0;
        let mut context = simulation::new(parameters, 0).unwrap();
        advance_health(&mut context, AgentId(0)).unwrap();
        assert_eq!(state(&context), HealthState::Recovered);
    }

    #[test]
    fn certain_fatality_removes_agent() {
        let mut context = simulation::new(parameters(1.0), 0).unwrap();
        advance_health(&mut context, AgentId(0)).unwrap();
        let agent = context.get_agent(AgentId(0)).unwrap();
        assert_eq!(agent.state(), HealthState::Dead);
        assert_eq!(agent.infection_timer(), 0);
        let grid = context.get_grid().unwrap();
        assert_eq!(grid.occupied_count(), 0);
        assert!(grid.position_of(Occupant::Agent(AgentId(0))).is_none());

        // Dead is terminal.
        advance_health(&mut context, AgentId(0)).unwrap();
        assert_eq!(state(&context), HealthState::Dead);
    }

    #[test]
    fn cached_outcome_is_drawn_once() {
        let mut parameters = parameters(0.5);
        parameters.fatality_policy = FatalityPolicy::CachedOutcome;
        parameters.infection_period = 50;
        for seed in 0..10 {
            let mut context = simulation::new(parameters.clone(), seed).unwrap();
            advance_health(&mut context, AgentId(0)).unwrap();
            let outcome = context.get_agent(AgentId(0)).unwrap().fatality_outcome;
            if state(&context) == HealthState::Dead {
                assert_eq!(outcome, Some(true));
                continue;
            }
            // A survivor keeps surviving for the rest of this infection.
            assert_eq!(outcome, Some(false));
            for _ in 0..50 {
                advance_health(&mut context, AgentId(0)).unwrap();
                assert_ne!(state(&context), HealthState::Dead);
            }
            assert_eq!(state(&context), HealthState::Recovered);
        }
    }

    #[test]
    fn waning_immunity() {
        let mut parameters = parameters(0.0);
        parameters.infection_period = 0;
        parameters.immunity_period = 2;
        let mut context = simulation::new(parameters, 0).unwrap();

        advance_health(&mut context, AgentId(0)).unwrap();
        assert_eq!(state(&context), HealthState::Recovered);
        assert_eq!(context.get_agent(AgentId(0)).unwrap().immunity_timer(), 2);

        advance_health(&mut context, AgentId(0)).unwrap();
        advance_health(&mut context, AgentId(0)).unwrap();
        assert_eq!(state(&context), HealthState::Recovered);
        assert_eq!(context.get_agent(AgentId(0)).unwrap().immunity_timer(), 0);

        advance_health(&mut context, AgentId(0)).unwrap();
        assert_eq!(state(&context), HealthState::Susceptible);
        assert!(context
            .get_agent(AgentId(0))
            .unwrap()
            .is_eligible_for_infection());
    }
}
