use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::error::SimError;
use crate::log::{LevelFilter, LogState, ModuleFilter, ENGINE_TARGET};

// ISO 8601 timestamp, color coded level, then the module the message came from
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

const CONSOLE: &str = "console";

/// Builds a console configuration with one logger for the engine and one per module filter.
/// The root logger is off, so only engine messages reach the console.
pub(super) fn build_config(
    engine_level: LevelFilter,
    module_filters: &[ModuleFilter],
) -> Result<Config, SimError> {
    let engine_level = module_filters
        .iter()
        .rev()
        .find(|filter| filter.module() == ENGINE_TARGET)
        .map_or(engine_level, ModuleFilter::level);

    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let mut builder = Config::builder()
        .appender(Appender::builder().build(CONSOLE, Box::new(console)))
        .logger(Logger::builder().build(ENGINE_TARGET, engine_level));
    for filter in module_filters
        .iter()
        .filter(|filter| filter.module() != ENGINE_TARGET)
    {
        builder = builder.logger(Logger::builder().build(filter.module(), filter.level()));
    }

    builder
        .build(Root::builder().appender(CONSOLE).build(LevelFilter::Off))
        .map_err(|e| SimError::SimError(format!("invalid log configuration: {e}")))
}

impl LogState {
    /// Installs the logger on first use and reconfigures it afterwards.
    pub(super) fn apply(&mut self) -> Result<(), SimError> {
        let config = build_config(self.engine_level(), &self.module_filters)?;
        match &self.handle {
            Some(handle) => handle.set_config(config),
            None => {
                let handle = log4rs::init_config(config)
                    .map_err(|e| SimError::SimError(format!("failed to install logger: {e}")))?;
                self.handle = Some(handle);
            }
        }
        Ok(())
    }
}
