//! Console logging of the engine's internal behavior. This is not to be confused with
//! _reporting_, which records the per-tick population counts.
//!
//! The engine logs through the `log` macros re-exported here. Per-agent state transitions are
//! logged at `trace`, per-tick progress at `debug` and run-level events at `info`. Every
//! message is targeted at its module path, e.g. `gridemic::transmission`.
//!
//! Logging is off until a level is set. [`set_log_level`] applies one level to all of the
//! engine's modules, and [`set_module_filters`] overrides it for individual modules. Messages
//! from other crates are never shown. The runner exposes both as `--log-level <level>` and
//! `--log-module <module>=<level>`:
//!
//! ```rust
//! use gridemic::log::{set_log_level, set_module_filters, LevelFilter, ModuleFilter};
//!
//! // Run-level events only, except for every transmission attempt.
//! set_log_level(LevelFilter::Info).unwrap();
//! let filter: ModuleFilter = "transmission=trace".parse().unwrap();
//! set_module_filters(&[filter]).unwrap();
//! ```
mod standard_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use log4rs::Handle;

use crate::error::SimError;

/// Log target of the engine; every module logs under `gridemic::<module>`.
pub const ENGINE_TARGET: &str = "gridemic";

/// A log level for one engine module, written `module=level` on the command line.
/// Module names may omit the `gridemic::` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFilter {
    module: String,
    level: LevelFilter,
}

impl ModuleFilter {
    #[must_use]
    pub fn new(module: &str, level: LevelFilter) -> Self {
        let module = if module == ENGINE_TARGET || module.starts_with("gridemic::") {
            module.to_string()
        } else {
            format!("{ENGINE_TARGET}::{module}")
        };
        ModuleFilter { module, level }
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl FromStr for ModuleFilter {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, SimError> {
        let Some((module, level)) = s.split_once('=') else {
            return Err(SimError::ConfigurationError(format!(
                "log filter '{s}' is not of the form MODULE=LEVEL"
            )));
        };
        let module = module.trim();
        if module.is_empty() {
            return Err(SimError::ConfigurationError(format!(
                "log filter '{s}' names no module"
            )));
        }
        let level = level.trim().parse::<LevelFilter>().map_err(|_| {
            SimError::ConfigurationError(format!("unknown log level in log filter '{s}'"))
        })?;
        Ok(ModuleFilter::new(module, level))
    }
}

impl Display for ModuleFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.module, self.level)
    }
}

/// The levels currently in force and the handle of the installed `log4rs` logger.
#[derive(Default)]
struct LogState {
    level: Option<LevelFilter>,
    module_filters: Vec<ModuleFilter>,
    handle: Option<Handle>,
}

impl LogState {
    fn engine_level(&self) -> LevelFilter {
        self.level.unwrap_or(LevelFilter::Off)
    }
}

static LOG_STATE: LazyLock<Mutex<LogState>> = LazyLock::new(Mutex::default);

/// A poisoned lock still holds usable levels.
fn log_state() -> MutexGuard<'static, LogState> {
    LOG_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sets the level of every engine module without its own filter. `LevelFilter::Off`
/// silences them.
///
/// # Errors
///
/// Fails if another logger has already been installed in this process.
pub fn set_log_level(level: LevelFilter) -> Result<(), SimError> {
    let mut state = log_state();
    state.level = Some(level);
    state.apply()
}

/// Replaces the per-module filters. When a module is listed twice the last entry wins.
///
/// # Errors
///
/// Fails if another logger has already been installed in this process.
pub fn set_module_filters(filters: &[ModuleFilter]) -> Result<(), SimError> {
    let mut state = log_state();
    state.module_filters.clear();
    for filter in filters {
        state
            .module_filters
            .retain(|existing| existing.module != filter.module);
        state.module_filters.push(filter.clone());
    }
    state.apply()
}
