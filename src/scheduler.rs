//! Tick-by-tick execution.
//!
//! Each tick publishes a snapshot of the population, then activates every occupant on the
//! grid exactly once in a fresh random order. An agent's activation moves it, gives it a
//! chance to be infected and advances its disease timers. Obstacles take part in the order
//! but do nothing.
use log::{debug, info};
use rand::seq::SliceRandom;

use crate::agent::{AgentId, HealthState};
use crate::context::Context;
use crate::error::SimError;
use crate::health::advance_health;
use crate::metrics::{publish_snapshot, PopulationSnapshot};
use crate::movement::move_agent;
use crate::occupant::Occupant;
use crate::population::ContextPopulationExt;
use crate::random::ContextRandomExt;
use crate::transmission::attempt_infection;
use crate::{define_data_plugin, define_rng};

define_rng!(ScheduleRng);

struct SchedulerData {
    running: bool,
}

define_data_plugin!(SchedulerPlugin, SchedulerData, SchedulerData { running: false });

pub trait ContextSchedulerExt {
    /// Runs one tick and returns the snapshot published at its start.
    ///
    /// # Errors
    ///
    /// Fails if the simulation has not been initialized.
    fn step(&mut self) -> Result<PopulationSnapshot, SimError>;

    /// Runs plans and ticks until shutdown is requested or no agent is infected.
    /// The state it stops in is published as a final snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the simulation has not been initialized.
    fn execute(&mut self) -> Result<(), SimError>;

    /// False once no agent is infected. No new infections can occur after that, but agents
    /// keep moving and, with waning immunity, recovered agents keep counting down to
    /// susceptible.
    fn is_running(&self) -> bool;
}

impl ContextSchedulerExt for Context {
    fn step(&mut self) -> Result<PopulationSnapshot, SimError> {
        let snapshot = publish_snapshot(self)?;

        let mut order = self.live_occupants()?;
        self.sample(ScheduleRng, |rng| order.shuffle(rng))?;
        for occupant in order {
            activate(self, occupant)?;
        }

        self.advance_tick();
        update_running(self);
        Ok(snapshot)
    }

    fn execute(&mut self) -> Result<(), SimError> {
        loop {
            self.run_due_plans();
            if self.is_shutdown_requested() || !self.is_running() {
                break;
            }
            self.step()?;
        }
        let snapshot = publish_snapshot(self)?;
        info!(
            "simulation stopped at tick {} with {} infected",
            snapshot.tick(),
            snapshot.total(HealthState::Infected)
        );
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.get_data_container(SchedulerPlugin)
            .is_some_and(|data| data.running)
    }
}

fn activate(context: &mut Context, occupant: Occupant) -> Result<(), SimError> {
    match occupant {
        Occupant::Agent(agent_id) => activate_agent(context, agent_id),
        Occupant::Obstacle(_) => Ok(()),
    }
}

fn activate_agent(context: &mut Context, agent_id: AgentId) -> Result<(), SimError> {
    if !context.get_agent(agent_id)?.is_alive() {
        return Ok(());
    }
    move_agent(context, agent_id)?;
    attempt_infection(context, agent_id)?;
    advance_health(context, agent_id)
}

/// Recomputes the running flag from the current agent states.
pub(crate) fn update_running(context: &mut Context) {
    let running = context
        .get_agents()
        .iter()
        .any(|agent| agent.state() == HealthState::Infected);
    if !running && context.is_running() {
        debug!("no infected agents remain at tick {}", context.get_current_tick());
    }
    context.get_data_container_mut(SchedulerPlugin).running = running;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact_matrix::ContactMatrix;
    use crate::grid::ContextGridExt;
    use crate::metrics::ContextMetricsExt;
    use crate::parameters::{InitialInfections, Parameters, StrataParameters};
    use crate::simulation;

    fn parameters() -> Parameters {
        Parameters {
            strata: vec![StrataParameters::new("a", 20)],
            initial_infected: InitialInfections::Total(2),
            infection_period: 3,
            contact_matrix: ContactMatrix::uniform(1, 1.0),
            grid_width: 10,
            grid_height: 10,
            obstacles: vec![crate::grid::Position::new(5, 5)],
            ..Parameters::default()
        }
    }

    #[test]
    fn step_publishes_then_advances() {
        let mut context = simulation::new(parameters(), 8).unwrap();
        assert!(context.is_running());

        let snapshot = context.step().unwrap();
        assert_eq!(snapshot.tick(), 0);
        assert_eq!(snapshot.total(HealthState::Infected), 2);
        assert_eq!(context.get_current_tick(), 1);

        let snapshot = context.step().unwrap();
        assert_eq!(snapshot.tick(), 1);
        assert_eq!(context.snapshot_history().len(), 2);
    }

    #[test]
    fn obstacles_never_move() {
        let mut context = simulation::new(parameters(), 8).unwrap();
        for _ in 0..20 {
            context.step().unwrap();
            assert!(matches!(
                context
                    .get_grid()
                    .unwrap()
                    .get(crate::grid::Position::new(5, 5)),
                Some(Occupant::Obstacle(_))
            ));
        }
    }

    #[test]
    fn execute_stops_when_infection_dies_out() {
        let mut parameters = parameters();
        parameters.transmission_probability = 0.0;
        let mut context = simulation::new(parameters, 8).unwrap();
        context.execute().unwrap();

        // Seeded infections last for ticks 0..=3 and recover during tick 3.
        assert!(!context.is_running());
        assert_eq!(context.get_current_tick(), 4);
        let history = context.snapshot_history();
        assert_eq!(history.len(), 5);
        let last = history.last().unwrap();
        assert_eq!(last.tick(), 4);
        assert_eq!(last.total(HealthState::Infected), 0);
        assert_eq!(last.total(HealthState::Recovered), 2);
    }

    #[test]
    fn execute_honors_shutdown_plans() {
        let mut parameters = parameters();
        parameters.infection_period = 1000;
        let mut context = simulation::new(parameters, 8).unwrap();
        context.add_plan(5, Context::shutdown);
        context.execute().unwrap();
        assert_eq!(context.get_current_tick(), 5);
        assert!(context.is_running());
        assert_eq!(context.snapshot_history().len(), 6);
    }

    #[test]
    fn step_keeps_running_after_infection_ends() {
        let mut parameters = parameters();
        parameters.initial_infected = InitialInfections::Total(0);
        let mut context = simulation::new(parameters, 8).unwrap();
        assert!(!context.is_running());
        context.step().unwrap();
        context.step().unwrap();
        assert_eq!(context.get_current_tick(), 2);
    }

    #[test]
    fn immunity_wanes_after_infection_ends() {
        let parameters = Parameters {
            strata: vec![StrataParameters::new("a", 1)],
            initial_infected: InitialInfections::Total(1),
            infection_period: 0,
            immunity_period: 2,
            obstacles: vec![],
            ..parameters()
        };
        let mut context = simulation::new(parameters, 8).unwrap();
        context.step().unwrap();
        assert!(!context.is_running());
        let agent = context.query_agents(HealthState::Recovered)[0];

        for _ in 0..2 {
            context.step().unwrap();
            assert_eq!(
                context.get_agent(agent).unwrap().state(),
                HealthState::Recovered
            );
        }
        context.step().unwrap();
        assert_eq!(
            context.get_agent(agent).unwrap().state(),
            HealthState::Susceptible
        );
        assert!(!context.is_running());
    }

    #[test]
    fn uninitialized_context_cannot_step() {
        let mut context = Context::new();
        assert!(context.step().is_err());
        assert!(!context.is_running());
    }
}
