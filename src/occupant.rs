//! Anything that can hold a grid cell. Agents and obstacles share the grid and the
//! activation order, but only agents move or take part in transmission.
use serde_derive::Serialize;

use crate::agent::AgentId;
use crate::obstacle::ObstacleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Occupant {
    Agent(AgentId),
    Obstacle(ObstacleId),
}

impl Occupant {
    /// Whether the occupant ever leaves its cell.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        matches!(self, Occupant::Agent(_))
    }

    /// Whether the occupant carries a health state.
    #[must_use]
    pub fn is_infectable(&self) -> bool {
        matches!(self, Occupant::Agent(_))
    }

    #[must_use]
    pub fn as_agent(&self) -> Option<AgentId> {
        match self {
            Occupant::Agent(agent_id) => Some(*agent_id),
            Occupant::Obstacle(_) => None,
        }
    }
}

impl From<AgentId> for Occupant {
    fn from(agent_id: AgentId) -> Self {
        Occupant::Agent(agent_id)
    }
}

impl From<ObstacleId> for Occupant {
    fn from(obstacle_id: ObstacleId) -> Self {
        Occupant::Obstacle(obstacle_id)
    }
}
