use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};

use crate::context::Context;
use crate::error::SimError;
use crate::log::{info, set_log_level, set_module_filters, LevelFilter, ModuleFilter};
use crate::metrics::ContextMetricsExt;
use crate::parameters::Parameters;
use crate::random::ContextRandomExt;
use crate::scheduler::ContextSchedulerExt;
use crate::simulation::ContextSimulationExt;

/// File name of the metrics report written to `--output-dir`.
pub const METRICS_REPORT_FILE: &str = "metrics.csv";

/// Default cli arguments for the gridemic runner
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path to a JSON parameters file; the grocery store model is used otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Optional directory the metrics report is written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Stop at this tick even if agents are still infected
    #[arg(short = 't', long)]
    pub max_ticks: Option<u64>,

    /// Enable logging at this level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<LevelFilter>,

    /// Log one module at its own level, e.g. `transmission=trace`. May be repeated
    #[arg(long = "log-module", value_name = "MODULE=LEVEL")]
    pub log_modules: Vec<ModuleFilter>,
}

fn create_cli() -> Command {
    let cli = Command::new("gridemic").about("Stochastic epidemic simulation on a toroidal grid");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with default cli arguments
///
/// This function parses command line arguments and allows you to define a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Context`, the parsed
///   `BaseArgs` and the `Parameters` about to be used. It runs after the random module is
///   initialized and before the population is seeded, so it may adjust the parameters,
///   add plans or register reports.
///
/// # Errors
/// Returns an error if argument parsing, loading the parameters, the setup function or the
/// simulation itself fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Context, &BaseArgs, &mut Parameters) -> Result<(), SimError>,
{
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run(&args, setup_fn)?)
}

/// Runs a simulation with already-parsed arguments. See [`run_with_args`].
///
/// # Errors
/// Returns an error if loading the parameters, the setup function or the simulation fails
pub fn run<F>(args: &BaseArgs, setup_fn: F) -> Result<Context, SimError>
where
    F: FnOnce(&mut Context, &BaseArgs, &mut Parameters) -> Result<(), SimError>,
{
    if let Some(level) = args.log_level {
        set_log_level(level)?;
    }
    if !args.log_modules.is_empty() {
        set_module_filters(&args.log_modules)?;
    }

    // Instantiate a context
    let mut context = Context::new();

    let mut parameters = match &args.config {
        Some(path) => {
            info!("loading parameters from {}", path.display());
            Parameters::from_json_file(path)?
        }
        None => Parameters::default(),
    };

    context.init_random(args.random_seed);

    // Run the provided Fn
    setup_fn(&mut context, args, &mut parameters)?;

    context.init_simulation(parameters)?;

    if let Some(output_dir) = &args.output_dir {
        context.add_metrics_report(&output_dir.join(METRICS_REPORT_FILE))?;
    }

    if let Some(max_ticks) = args.max_ticks {
        let tick = max_ticks.max(context.get_current_tick());
        context.add_plan(tick, Context::shutdown);
    }

    // Execute the context
    context.execute()?;
    Ok(context)
}
