//! A spatially explicit, stochastic epidemic simulator.
//!
//! Agents, each belonging to one demographic *strata*, walk on a toroidal grid shared with
//! fixed obstacles. Every tick each occupant acts once, in a fresh random order: an agent
//! steps to a random empty neighboring cell, may catch the infection from its infected
//! neighbors according to a strata-by-strata contact matrix, and advances through
//! susceptible, infected, recovered and dead. Vaccination, per-strata fatality and waning
//! immunity are configured through [`Parameters`].
//!
//! The central object of a simulation is the [`Context`]. Every component keeps its state in
//! a data plugin on the context and exposes its behavior as an extension trait:
//!
//! * [`ContextSimulationExt`] builds the grid and the population from `Parameters`.
//! * [`ContextSchedulerExt`] advances the simulation one tick at a time, or runs it to
//!   completion.
//! * [`ContextMetricsExt`] produces per-tick population counts and the CSV metrics report.
//! * [`ContextRenderExt`] lists what a viewer needs to draw each occupied cell.
//!
//! All randomness comes from named streams derived from a single seed, so two runs with the
//! same parameters and seed produce the same counts at every tick.
//!
//! ```
//! use gridemic::prelude::*;
//!
//! let mut context = gridemic::simulation::new(Parameters::default(), 42).unwrap();
//! context.add_plan(20, Context::shutdown);
//! context.execute().unwrap();
//! let last = context.snapshot_history().last().unwrap();
//! assert_eq!(last.population_size(), 240);
//! ```
pub mod agent;
pub mod contact_matrix;
pub mod context;
pub mod error;
pub mod grid;
pub mod hashing;
mod health;
pub mod log;
pub mod metrics;
mod movement;
pub mod obstacle;
pub mod occupant;
pub mod parameters;
pub mod plan;
pub mod population;
pub mod random;
pub mod render;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod simulation;
pub mod transmission;

pub use context::Context;
pub use error::SimError;
pub use hashing::{HashMap, HashSet};
pub use metrics::ContextMetricsExt;
pub use parameters::Parameters;
pub use render::ContextRenderExt;
pub use scheduler::ContextSchedulerExt;
pub use simulation::ContextSimulationExt;

// Re-exports for use by the macros
pub use csv;
pub use paste;
pub use rand;

pub mod prelude;
