//! One-cell random walk over the Moore neighborhood.
use log::trace;

use crate::agent::AgentId;
use crate::context::Context;
use crate::define_rng;
use crate::error::SimError;
use crate::grid::{grid_mut, ContextGridExt, Position};
use crate::occupant::Occupant;
use crate::population::agent_mut;
use crate::random::ContextRandomExt;

define_rng!(MovementRng);

/// Moves a live agent to an empty neighboring cell chosen uniformly at random.
/// An agent with no empty neighbor stays where it is. Agents that are no longer
/// on the grid are left alone.
///
/// Returns the cell the agent ends up in, or `None` if it is not on the grid.
pub(crate) fn move_agent(
    context: &mut Context,
    agent_id: AgentId,
) -> Result<Option<Position>, SimError> {
    let grid = context.get_grid()?;
    let Some(position) = grid.position_of(Occupant::Agent(agent_id)) else {
        return Ok(None);
    };
    let candidates = grid.empty_neighbor_cells(position);
    if candidates.is_empty() {
        trace!("{agent_id:?} has no empty neighbor at {position}");
        return Ok(Some(position));
    }
    let target = candidates[context.sample_range(MovementRng, 0..candidates.len())?];
    relocate(context, agent_id, target)?;
    Ok(Some(target))
}

/// Moves an agent to `target`, keeping the grid and the agent's own position in step.
pub(crate) fn relocate(
    context: &mut Context,
    agent_id: AgentId,
    target: Position,
) -> Result<(), SimError> {
    grid_mut(context)?.move_occupant(Occupant::Agent(agent_id), target)?;
    agent_mut(context, agent_id)?.position = target;
    Ok(())
}
