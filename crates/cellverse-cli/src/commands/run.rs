use crate::cli::RunArgs;
use crate::config::PartialScenarioConfig;
use crate::error::Result;
use crate::recorder::CsvTrajectoryRecorder;
use crate::utils::progress::CliProgressHandler;
use cellverse::{
    engine::{progress::ProgressReporter, recorder::NullRecorder},
    workflows,
};
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = PartialScenarioConfig::from_file(&args.scenario.config)?;
    info!("Merging scenario from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args.scenario)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting simulation of {} particle(s) over {} step(s)...",
        config.initial_particle_count(),
        config.step_count()
    );
    info!("Invoking the core simulation workflow...");

    let result = match &args.output {
        Some(path) => {
            let mut recorder =
                CsvTrajectoryRecorder::from_path(path, config.dimension, args.record_every)?;
            let result = workflows::simulate::run(&config, &mut recorder, &reporter)?;
            let rows = recorder.rows_written();
            recorder.into_inner()?;
            info!("Wrote {} trajectory row(s) to {:?}", rows, path);
            println!("✓ Trajectory written to: {}", path.display());
            result
        }
        None => workflows::simulate::run(&config, &mut NullRecorder, &reporter)?,
    };

    let summary = &result.summary;
    if summary.live_particles == 0 && config.initial_particle_count() > 0 {
        warn!("Every particle left the domain before the end of the run.");
    }
    println!(
        "Simulated {} step(s) ({:.4} time units): {} live particle(s), kinetic energy {:.6e}",
        summary.steps, summary.simulated_time, summary.live_particles, summary.kinetic_energy
    );
    if summary.clamp_events > 0 {
        println!(
            "  Kinetic energy was clamped after {} step(s).",
            summary.clamp_events
        );
    }

    Ok(())
}
