//! Contact-weighted transmission from infected neighbors.
//!
//! The hazard a susceptible agent faces is set by its single worst contact: the largest
//! contact rate between its strata and the strata of any infected Moore neighbor. Under the
//! default [`TransmissionPolicy::MaxExposure`] one uniform draw `u` infects the agent when
//! `u < transmission_probability * max_rate`; a draw equal to the threshold does not infect.
//! [`TransmissionPolicy::RepeatedTrials`] models `round(max_rate)` independent trials at
//! `transmission_probability` that infect if any succeeds. The trials are resolved with a
//! single draw against `1 - (1 - p)^n`, the probability that at least one of them succeeds,
//! so the cost of an attempt does not grow with the contact rate.
use log::trace;

use crate::agent::{AgentId, HealthState};
use crate::context::Context;
use crate::define_rng;
use crate::error::SimError;
use crate::grid::ContextGridExt;
use crate::parameters::{ContextParametersExt, TransmissionPolicy};
use crate::population::{agent_mut, ContextPopulationExt};
use crate::random::ContextRandomExt;

define_rng!(TransmissionRng);

/// The largest contact rate between `agent_id` and its infected neighbors, or 0 when
/// none of its neighbors is infected.
///
/// # Errors
///
/// Fails if the simulation has not been initialized or the agent does not exist.
pub fn max_exposure(context: &Context, agent_id: AgentId) -> Result<f64, SimError> {
    let agent = context.get_agent(agent_id)?;
    let contact_matrix = &context.get_parameters()?.contact_matrix;
    let grid = context.get_grid()?;

    let mut max_rate: f64 = 0.0;
    for neighbor in grid.neighbors(agent.position()) {
        let Some(neighbor_id) = neighbor.as_agent() else {
            continue;
        };
        let neighbor = context.get_agent(neighbor_id)?;
        if neighbor.state() == HealthState::Infected {
            max_rate = max_rate.max(contact_matrix.rate(agent.strata(), neighbor.strata()));
        }
    }
    Ok(max_rate)
}

/// Probability that at least one of `round(max_rate)` trials at `probability` succeeds.
fn repeated_trial_probability(probability: f64, max_rate: f64) -> f64 {
    let trials = max_rate.round();
    if probability <= 0.0 || trials < 1.0 {
        return 0.0;
    }
    1.0 - (1.0 - probability).powf(trials)
}

/// Gives an eligible agent its chance of catching the infection this tick.
/// Returns whether the agent became infected.
pub(crate) fn attempt_infection(context: &mut Context, agent_id: AgentId) -> Result<bool, SimError> {
    if !context.get_agent(agent_id)?.is_eligible_for_infection() {
        return Ok(false);
    }
    let max_rate = max_exposure(context, agent_id)?;
    if max_rate <= 0.0 {
        return Ok(false);
    }

    let parameters = context.get_parameters()?;
    let probability = parameters.transmission_probability;
    let infection_period = parameters.infection_period;
    let infected = match parameters.transmission_policy {
        TransmissionPolicy::MaxExposure => {
            context.sample_uniform(TransmissionRng)? < probability * max_rate
        }
        TransmissionPolicy::RepeatedTrials => {
            let threshold = repeated_trial_probability(probability, max_rate);
            threshold > 0.0 && context.sample_uniform(TransmissionRng)? < threshold
        }
    };

    if infected {
        trace!("{agent_id:?} infected (exposure {max_rate})");
        agent_mut(context, agent_id)?.infect(infection_period);
    }
    Ok(infected)
}
