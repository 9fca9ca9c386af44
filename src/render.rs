//! Read-only per-occupant state for visualization.
use serde_derive::Serialize;

use crate::agent::HealthState;
use crate::context::Context;
use crate::error::SimError;
use crate::grid::{ContextGridExt, Position};
use crate::occupant::Occupant;
use crate::parameters::ContextParametersExt;
use crate::population::ContextPopulationExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantKind {
    Agent,
    Obstacle,
}

/// What a viewer needs to draw one cell. Obstacles have no strata or health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderState {
    pub position: Position,
    pub occupant: Occupant,
    pub kind: OccupantKind,
    pub strata: Option<String>,
    pub health: Option<HealthState>,
    pub vaccinated: bool,
}

pub trait ContextRenderExt {
    /// The render state of every occupant on the grid, in row-major cell order.
    /// Dead agents are no longer on the grid and are not listed.
    ///
    /// # Errors
    ///
    /// Fails if the simulation has not been initialized.
    fn render_states(&self) -> Result<Vec<RenderState>, SimError>;
}

impl ContextRenderExt for Context {
    fn render_states(&self) -> Result<Vec<RenderState>, SimError> {
        let parameters = self.get_parameters()?;
        self.get_grid()?
            .occupants()
            .map(|(position, occupant)| -> Result<RenderState, SimError> {
                match occupant {
                    Occupant::Agent(agent_id) => {
                        let agent = self.get_agent(agent_id)?;
                        Ok(RenderState {
                            position,
                            occupant,
                            kind: OccupantKind::Agent,
                            strata: parameters
                                .strata
                                .get(agent.strata().0)
                                .map(|strata| strata.name.clone()),
                            health: Some(agent.state()),
                            vaccinated: agent.is_vaccinated(),
                        })
                    }
                    Occupant::Obstacle(_) => Ok(RenderState {
                        position,
                        occupant,
                        kind: OccupantKind::Obstacle,
                        strata: None,
                        health: None,
                        vaccinated: false,
                    }),
                }
            })
            .collect()
    }
}
