//! Population counts at tick boundaries.
//!
//! A [`PopulationSnapshot`] is taken at the start of every tick, before any occupant acts.
//! Snapshots are kept in a history on the context and, when a metrics report has been
//! registered with [`ContextMetricsExt::add_metrics_report`], written out as long-format CSV
//! rows of `tick,metric,count`.
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde_derive::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::agent::{Agent, HealthState, StrataId};
use crate::context::Context;
use crate::error::SimError;
use crate::parameters::ContextParametersExt;
use crate::population::ContextPopulationExt;
use crate::report::ContextReportExt;
use crate::{define_data_plugin, define_report};

const STATE_COUNT: usize = 4;

/// Per-strata, per-state counts of the whole population at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationSnapshot {
    tick: u64,
    strata_names: Vec<String>,
    counts: Vec<[usize; STATE_COUNT]>,
    vaccinated: Vec<usize>,
}

impl PopulationSnapshot {
    /// Counts `agents`, dead ones included.
    ///
    /// # Panics
    ///
    /// Panics if an agent's strata is not one of `strata_names`.
    #[must_use]
    pub fn capture(tick: u64, strata_names: Vec<String>, agents: &[Agent]) -> Self {
        let mut counts = vec![[0; STATE_COUNT]; strata_names.len()];
        let mut vaccinated = vec![0; strata_names.len()];
        for agent in agents {
            let strata = agent.strata().0;
            counts[strata][agent.state().index()] += 1;
            if agent.is_vaccinated() {
                vaccinated[strata] += 1;
            }
        }
        PopulationSnapshot {
            tick,
            strata_names,
            counts,
            vaccinated,
        }
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn strata_names(&self) -> &[String] {
        &self.strata_names
    }

    /// Agents of `strata` in `state`. Unknown strata count as empty.
    #[must_use]
    pub fn count(&self, strata: StrataId, state: HealthState) -> usize {
        self.counts
            .get(strata.0)
            .map_or(0, |counts| counts[state.index()])
    }

    #[must_use]
    pub fn total(&self, state: HealthState) -> usize {
        self.counts.iter().map(|counts| counts[state.index()]).sum()
    }

    #[must_use]
    pub fn vaccinated(&self, strata: StrataId) -> usize {
        self.vaccinated.get(strata.0).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_vaccinated(&self) -> usize {
        self.vaccinated.iter().sum()
    }

    /// Sum over every state; constant for the life of a simulation.
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// The named metrics of this snapshot, always in the same order:
    /// `total_<state>` for each state, `<state>_<strata>` for each strata and state,
    /// then `total_vaccinated` and `vaccinated_<strata>`.
    #[must_use]
    pub fn metrics(&self) -> IndexMap<String, usize> {
        let mut metrics = IndexMap::new();
        for state in HealthState::iter() {
            metrics.insert(format!("total_{state}"), self.total(state));
        }
        for (strata, name) in self.strata_names.iter().enumerate() {
            for state in HealthState::iter() {
                metrics.insert(format!("{state}_{name}"), self.count(StrataId(strata), state));
            }
        }
        metrics.insert("total_vaccinated".to_string(), self.total_vaccinated());
        for (strata, name) in self.strata_names.iter().enumerate() {
            metrics.insert(format!("vaccinated_{name}"), self.vaccinated(StrataId(strata)));
        }
        metrics
    }
}

/// One row of the metrics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReportItem {
    pub tick: u64,
    pub metric: String,
    pub count: usize,
}

define_report!(MetricsReportItem);

#[derive(Default)]
struct MetricsData {
    history: Vec<PopulationSnapshot>,
}

define_data_plugin!(MetricsPlugin, MetricsData, MetricsData::default());

pub trait ContextMetricsExt {
    /// Counts the population as it is right now.
    ///
    /// # Errors
    ///
    /// Fails if the simulation has not been initialized.
    fn population_snapshot(&self) -> Result<PopulationSnapshot, SimError>;

    /// Every snapshot published so far, oldest first.
    fn snapshot_history(&self) -> &[PopulationSnapshot];

    /// Writes every published snapshot to a CSV file at `path`, one row per metric.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or is not a `.csv` file.
    fn add_metrics_report(&mut self, path: &Path) -> Result<(), SimError>;
}

impl ContextMetricsExt for Context {
    fn population_snapshot(&self) -> Result<PopulationSnapshot, SimError> {
        let strata_names = self.get_parameters()?.strata_names();
        Ok(PopulationSnapshot::capture(
            self.get_current_tick(),
            strata_names,
            self.get_agents(),
        ))
    }

    fn snapshot_history(&self) -> &[PopulationSnapshot] {
        self.get_data_container(MetricsPlugin)
            .map(|data| data.history.as_slice())
            .unwrap_or_default()
    }

    fn add_metrics_report(&mut self, path: &Path) -> Result<(), SimError> {
        self.add_report::<MetricsReportItem>(path)
    }
}

/// Takes the snapshot for the current tick, records it and reports it.
/// Publishing twice at the same tick returns the snapshot already recorded.
pub(crate) fn publish_snapshot(context: &mut Context) -> Result<PopulationSnapshot, SimError> {
    if let Some(last) = context.snapshot_history().last() {
        if last.tick() == context.get_current_tick() {
            return Ok(last.clone());
        }
    }

    let snapshot = context.population_snapshot()?;
    debug!(
        "tick {}: {} susceptible, {} infected, {} recovered, {} dead",
        snapshot.tick(),
        snapshot.total(HealthState::Susceptible),
        snapshot.total(HealthState::Infected),
        snapshot.total(HealthState::Recovered),
        snapshot.total(HealthState::Dead)
    );
    if context.has_report::<MetricsReportItem>() {
        for (metric, count) in snapshot.metrics() {
            context.send_report(MetricsReportItem {
                tick: snapshot.tick(),
                metric,
                count,
            })?;
        }
    }
    context
        .get_data_container_mut(MetricsPlugin)
        .history
        .push(snapshot.clone());
    Ok(snapshot)
}
