pub use crate::agent::{Agent, AgentId, HealthState, StrataId};
pub use crate::context::Context;
pub use crate::error::SimError;
pub use crate::grid::{ContextGridExt, Grid, Position};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::metrics::{ContextMetricsExt, PopulationSnapshot};
pub use crate::occupant::Occupant;
pub use crate::parameters::{
    ContextParametersExt, FatalityPolicy, InitialInfections, Parameters, StrataParameters,
    TransmissionPolicy,
};
pub use crate::population::ContextPopulationExt;
pub use crate::random::ContextRandomExt;
pub use crate::render::ContextRenderExt;
pub use crate::report::ContextReportExt;
pub use crate::scheduler::ContextSchedulerExt;
pub use crate::simulation::ContextSimulationExt;
pub use crate::{define_data_plugin, define_report, define_rng};
