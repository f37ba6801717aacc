use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cellverse CLI - Run point-particle simulations with Störmer-Verlet integration on unbounded, bounded and periodic domains.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress console log output except for errors (a log file is unaffected)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write DEBUG-level logs, tagged with the scenario being run, to a file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for the cell-grid force pass.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate a scenario and optionally record its trajectory to CSV.
    Run(RunArgs),
    /// Build the universe described by a scenario and print a summary without simulating.
    Inspect(InspectArgs),
}

/// Scenario file and the overrides that can be layered on top of it.
#[derive(Args, Debug)]
pub struct ScenarioArgs {
    /// Path to the scenario file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the integration time step.
    #[arg(long, value_name = "FLOAT")]
    pub time_step: Option<f64>,

    /// Override the simulated time span.
    #[arg(long, value_name = "FLOAT")]
    pub final_time: Option<f64>,

    /// Override the kinetic energy above which velocities are rescaled.
    #[arg(long, value_name = "FLOAT")]
    pub energy_ceiling: Option<f64>,

    /// Set a specific configuration value, overriding the scenario file.
    /// Can be used multiple times. Example: -S domain.boundary=reflect
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Path of the CSV trajectory file. Nothing is recorded when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Record one frame every N steps.
    #[arg(long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub record_every: u64,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
}
