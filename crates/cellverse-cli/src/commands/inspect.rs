use crate::cli::InspectArgs;
use crate::config::PartialScenarioConfig;
use crate::error::Result;
use cellverse::engine::config::SimulationConfig;
use cellverse::engine::integrator::Simulation;
use cellverse::workflows::simulate::{self, UniverseKind};
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let partial_config = PartialScenarioConfig::from_file(&args.scenario.config)?;
    let config = partial_config.merge_with_cli(&args.scenario)?;

    info!("Preparing universe for inspection...");
    let universe = prepare(&config)?;
    println!("{}", describe(&universe, config.time_step, config.step_count()));

    Ok(())
}

/// Builds and seeds the universe; gridded universes also bin their particles.
fn prepare(config: &SimulationConfig) -> Result<UniverseKind> {
    let mut universe = simulate::prepare_universe(config)?;
    if let UniverseKind::Gridded(gridded) = &mut universe {
        gridded.rebuild_cells()?;
    }
    Ok(universe)
}

fn describe(universe: &UniverseKind, time_step: f64, steps: u64) -> String {
    let mut text = universe.to_string();
    if let UniverseKind::Gridded(gridded) = universe {
        let grid = gridded.grid();
        let occupied = grid
            .intern_cells()
            .iter()
            .filter(|cell| !cell.particles().is_empty())
            .count();
        text.push_str(&format!("\n    occupied cells = {occupied}"));
    }
    text.push_str(&format!(
        "\n    integration = {steps} step(s) of {time_step}, kinetic energy {:.6e}",
        universe.universe().kinetic_energy().unwrap_or(f64::NAN)
    ));
    text
}
