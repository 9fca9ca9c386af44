use serde_derive::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::grid::Position;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct AgentId(pub usize);

/// Index of a strata in the configured strata list.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct StrataId(pub usize);

#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Susceptible,
    Infected,
    Recovered,
    Dead,
}

impl HealthState {
    /// Position of the state in `HealthState::iter()` order.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            HealthState::Susceptible => 0,
            HealthState::Infected => 1,
            HealthState::Recovered => 2,
            HealthState::Dead => 3,
        }
    }
}

/// A mobile occupant. Agents are only mutated by their own activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) strata: StrataId,
    pub(crate) position: Position,
    pub(crate) state: HealthState,
    pub(crate) vaccinated: bool,
    /// Ticks left before an Infected agent recovers.
    pub(crate) infection_timer: u32,
    /// Ticks left before a Recovered agent loses immunity.
    pub(crate) immunity_timer: u32,
    /// The fatality draw for the current infection, when outcomes are cached.
    pub(crate) fatality_outcome: Option<bool>,
}

impl Agent {
    pub(crate) fn new(id: AgentId, strata: StrataId, position: Position, vaccinated: bool) -> Self {
        Agent {
            id,
            strata,
            position,
            state: HealthState::Susceptible,
            vaccinated,
            infection_timer: 0,
            immunity_timer: 0,
            fatality_outcome: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn strata(&self) -> StrataId {
        self.strata
    }

    /// The agent's cell, or the cell it died in.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn state(&self) -> HealthState {
        self.state
    }

    #[must_use]
    pub fn is_vaccinated(&self) -> bool {
        self.vaccinated
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != HealthState::Dead
    }

    #[must_use]
    pub fn infection_timer(&self) -> u32 {
        self.infection_timer
    }

    #[must_use]
    pub fn immunity_timer(&self) -> u32 {
        self.immunity_timer
    }

    /// Susceptible, unvaccinated agents are the only ones transmission can reach.
    #[must_use]
    pub fn is_eligible_for_infection(&self) -> bool {
        self.state == HealthState::Susceptible && !self.vaccinated
    }

    pub(crate) fn infect(&mut self, infection_period: u32) {
        self.state = HealthState::Infected;
        self.infection_timer = infection_period;
        self.fatality_outcome = None;
    }

    pub(crate) fn recover(&mut self, immunity_period: u32) {
        self.state = HealthState::Recovered;
        self.infection_timer = 0;
        self.immunity_timer = immunity_period;
    }

    pub(crate) fn lose_immunity(&mut self) {
        self.state = HealthState::Susceptible;
        self.immunity_timer = 0;
    }

    pub(crate) fn die(&mut self) {
        self.state = HealthState::Dead;
        self.infection_timer = 0;
        self.immunity_timer = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn state_names_and_indices() {
        let names: Vec<String> = HealthState::iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["susceptible", "infected", "recovered", "dead"]);
        for (i, state) in HealthState::iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn transitions_update_timers() {
        let mut agent = Agent::new(AgentId(0), StrataId(0), Position::new(0, 0), false);
        assert!(agent.is_eligible_for_infection());

        agent.fatality_outcome = Some(false);
        agent.infect(7);
        assert_eq!(agent.state(), HealthState::Infected);
        assert_eq!(agent.infection_timer(), 7);
        assert_eq!(agent.fatality_outcome, None);
        assert!(!agent.is_eligible_for_infection());

        agent.recover(3);
        assert_eq!(agent.state(), HealthState::Recovered);
        assert_eq!(agent.infection_timer(), 0);
        assert_eq!(agent.immunity_timer(), 3);

        agent.lose_immunity();
        assert_eq!(agent.state(), HealthState::Susceptible);

        agent.infect(2);
        agent.die();
        assert!(!agent.is_alive());
        assert_eq!(agent.infection_timer(), 0);
    }

    #[test]
    fn vaccinated_agents_are_not_eligible() {
        let agent = Agent::new(AgentId(1), StrataId(0), Position::new(0, 0), true);
        assert_eq!(agent.state(), HealthState::Susceptible);
        assert!(!agent.is_eligible_for_infection());
    }
}
