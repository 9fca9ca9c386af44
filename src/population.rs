//! Agents and obstacles, and the seeding that creates them.
//!
//! Seeding runs once at initialization. Obstacles are placed first at their configured cells.
//! Then, strata by strata, a vaccinated subset is drawn without replacement, the initially
//! infected are drawn from the unvaccinated remainder, and every agent is put on a random
//! empty cell.
use log::{debug, info};
use rand::seq::index;
use rand::Rng;

use crate::agent::{Agent, AgentId, HealthState, StrataId};
use crate::context::Context;
use crate::error::SimError;
use crate::grid::{set_grid, ContextGridExt, Grid, Position};
use crate::obstacle::{Obstacle, ObstacleId};
use crate::occupant::Occupant;
use crate::parameters::{ContextParametersExt, InitialInfections, Parameters};
use crate::random::ContextRandomExt;
use crate::{define_data_plugin, define_rng};

define_rng!(PlacementRng);
define_rng!(SeedingRng);

#[derive(Default)]
struct PopulationData {
    agents: Vec<Agent>,
    obstacles: Vec<Obstacle>,
}

define_data_plugin!(PopulationPlugin, PopulationData, PopulationData::default());

pub trait ContextPopulationExt {
    /// # Errors
    ///
    /// Fails if no agent has the given id.
    fn get_agent(&self, agent_id: AgentId) -> Result<&Agent, SimError>;

    /// Every agent ever created, dead ones included, indexed by `AgentId`.
    fn get_agents(&self) -> &[Agent];

    fn get_obstacles(&self) -> &[Obstacle];

    /// Number of agents created at seeding. Deaths do not change it.
    fn get_population_size(&self) -> usize;

    /// Agents currently in `state`.
    fn query_agents(&self, state: HealthState) -> Vec<AgentId>;

    /// The occupants still on the grid, in row-major cell order.
    ///
    /// # Errors
    ///
    /// Fails if the grid has not been initialized.
    fn live_occupants(&self) -> Result<Vec<Occupant>, SimError>;
}

impl ContextPopulationExt for Context {
    fn get_agent(&self, agent_id: AgentId) -> Result<&Agent, SimError> {
        self.get_agents()
            .get(agent_id.0)
            .ok_or_else(|| SimError::from(format!("{agent_id:?} does not exist")))
    }

    fn get_agents(&self) -> &[Agent] {
        self.get_data_container(PopulationPlugin)
            .map(|data| data.agents.as_slice())
            .unwrap_or_default()
    }

    fn get_obstacles(&self) -> &[Obstacle] {
        self.get_data_container(PopulationPlugin)
            .map(|data| data.obstacles.as_slice())
            .unwrap_or_default()
    }

    fn get_population_size(&self) -> usize {
        self.get_agents().len()
    }

    fn query_agents(&self, state: HealthState) -> Vec<AgentId> {
        self.get_agents()
            .iter()
            .filter(|agent| agent.state() == state)
            .map(Agent::id)
            .collect()
    }

    fn live_occupants(&self) -> Result<Vec<Occupant>, SimError> {
        Ok(self
            .get_grid()?
            .occupants()
            .map(|(_, occupant)| occupant)
            .collect())
    }
}

pub(crate) fn agent_mut(context: &mut Context, agent_id: AgentId) -> Result<&mut Agent, SimError> {
    context
        .get_data_container_mut(PopulationPlugin)
        .agents
        .get_mut(agent_id.0)
        .ok_or_else(|| SimError::from(format!("{agent_id:?} does not exist")))
}

/// Picks `count` of the `candidates` without replacement.
fn choose(
    context: &Context,
    candidates: &[AgentId],
    count: usize,
) -> Result<Vec<AgentId>, SimError> {
    if count > candidates.len() {
        return Err(SimError::ConfigurationError(format!(
            "cannot choose {count} agents from a pool of {}",
            candidates.len()
        )));
    }
    let chosen = context.sample(SeedingRng, |rng| {
        index::sample(rng, candidates.len(), count).into_vec()
    })?;
    Ok(chosen.into_iter().map(|i| candidates[i]).collect())
}

/// Draws random cells until one is empty, giving up after `max_attempts` draws.
fn random_empty_cell(
    context: &Context,
    grid: &Grid,
    max_attempts: usize,
) -> Result<Option<Position>, SimError> {
    for _ in 0..max_attempts {
        let position = context.sample(PlacementRng, |rng| {
            Position::new(
                rng.random_range(0..grid.width()),
                rng.random_range(0..grid.height()),
            )
        })?;
        if grid.is_empty(position) {
            return Ok(Some(position));
        }
    }
    Ok(None)
}

/// Creates the grid, the obstacles and the agents described by the stored parameters.
///
/// # Errors
///
/// `SimError::CapacityError` if an agent cannot be placed within the configured number of
/// attempts, or a `SimError::ConfigurationError` if the parameters are inconsistent.
pub(crate) fn seed_population(context: &mut Context) -> Result<(), SimError> {
    let parameters = context.get_parameters()?.clone();
    let mut grid = Grid::new(parameters.grid_width, parameters.grid_height);

    let mut obstacles = Vec::with_capacity(parameters.obstacles.len());
    for (i, position) in parameters.obstacles.iter().enumerate() {
        let obstacle = Obstacle {
            id: ObstacleId(i),
            position: *position,
        };
        grid.place(Occupant::Obstacle(obstacle.id), obstacle.position)?;
        obstacles.push(obstacle);
    }

    let mut agents = create_agents(context, &parameters)?;

    for agent in &mut agents {
        let position = random_empty_cell(context, &grid, parameters.max_placement_attempts)?
            .ok_or_else(|| {
                SimError::CapacityError(format!(
                    "no empty cell found for {:?} after {} attempts",
                    agent.id, parameters.max_placement_attempts
                ))
            })?;
        grid.place(Occupant::Agent(agent.id), position)?;
        agent.position = position;
    }

    info!(
        "seeded {} agents and {} obstacles on a {}x{} grid",
        agents.len(),
        obstacles.len(),
        grid.width(),
        grid.height()
    );

    set_grid(context, grid);
    let data = context.get_data_container_mut(PopulationPlugin);
    data.agents = agents;
    data.obstacles = obstacles;
    Ok(())
}

/// Builds every agent with its strata, vaccination flag and initial infection.
fn create_agents(context: &Context, parameters: &Parameters) -> Result<Vec<Agent>, SimError> {
    let mut agents: Vec<Agent> = Vec::with_capacity(parameters.population_size());
    let mut unvaccinated_by_strata = Vec::with_capacity(parameters.strata.len());

    for (strata_index, strata) in parameters.strata.iter().enumerate() {
        let first = agents.len();
        let members: Vec<AgentId> = (first..first + strata.population).map(AgentId).collect();
        for agent_id in &members {
            agents.push(Agent::new(
                *agent_id,
                StrataId(strata_index),
                Position::new(0, 0),
                false,
            ));
        }

        for agent_id in choose(context, &members, strata.vaccinated)? {
            agents[agent_id.0].vaccinated = true;
        }
        let unvaccinated: Vec<AgentId> = members
            .into_iter()
            .filter(|agent_id| !agents[agent_id.0].vaccinated)
            .collect();

        if let InitialInfections::PerStrata(counts) = &parameters.initial_infected {
            let count = counts.get(strata_index).copied().unwrap_or(0);
            for agent_id in choose(context, &unvaccinated, count)? {
                agents[agent_id.0].infect(parameters.infection_period);
            }
        }
        debug!(
            "strata '{}': {} agents, {} vaccinated",
            strata.name, strata.population, strata.vaccinated
        );
        unvaccinated_by_strata.push(unvaccinated);
    }

    if let InitialInfections::Total(count) = parameters.initial_infected {
        let pool: Vec<AgentId> = unvaccinated_by_strata.into_iter().flatten().collect();
        for agent_id in choose(context, &pool, count)? {
            agents[agent_id.0].infect(parameters.infection_period);
        }
    }

    Ok(agents)
}

/// Puts agents `0..positions.len()` on the given cells, in order.
#[cfg(test)]
pub(crate) fn arrange_agents(context: &mut Context, positions: &[Position]) {
    let grid = crate::grid::grid_mut(context).unwrap();
    for i in 0..positions.len() {
        grid.remove(Occupant::Agent(AgentId(i))).unwrap();
    }
    for (i, position) in positions.iter().enumerate() {
        grid.place(Occupant::Agent(AgentId(i)), *position).unwrap();
    }
    for (i, position) in positions.iter().enumerate() {
        agent_mut(context, AgentId(i)).unwrap().position = *position;
    }
}
