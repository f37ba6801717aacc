use crate::core::math::vector::Vector;
use crate::core::models::ids::ParticleKey;
use crate::engine::boundary::BoundaryPolicy;
use crate::engine::config::{InteractionKind, SimulationConfig};
use crate::engine::error::EngineError;
use crate::engine::finite::FiniteUniverse;
use crate::engine::gridded::GriddedUniverse;
use crate::engine::integrator::{RunSummary, Simulation};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::recorder::SnapshotRecorder;
use crate::engine::universe::Universe;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// The universe kind selected by a configuration.
#[derive(Debug, Clone)]
pub enum UniverseKind {
    Unbounded(Universe),
    Finite(FiniteUniverse),
    Gridded(GriddedUniverse),
}

impl UniverseKind {
    pub fn add_particle(
        &mut self,
        position: Vector,
        velocity: Vector,
        mass: f64,
        name: Option<String>,
    ) -> Result<ParticleKey, EngineError> {
        match self {
            UniverseKind::Unbounded(universe) => {
                universe.add_particle(position, velocity, mass, name)
            }
            UniverseKind::Finite(finite) => finite.add_particle(position, velocity, mass, name),
            UniverseKind::Gridded(gridded) => gridded.add_particle(position, velocity, mass, name),
        }
    }

    fn as_simulation(&self) -> &dyn Simulation {
        match self {
            UniverseKind::Unbounded(universe) => universe,
            UniverseKind::Finite(finite) => finite,
            UniverseKind::Gridded(gridded) => gridded,
        }
    }

    fn as_simulation_mut(&mut self) -> &mut dyn Simulation {
        match self {
            UniverseKind::Unbounded(universe) => universe,
            UniverseKind::Finite(finite) => finite,
            UniverseKind::Gridded(gridded) => gridded,
        }
    }
}

impl Simulation for UniverseKind {
    fn universe(&self) -> &Universe {
        self.as_simulation().universe()
    }

    fn universe_mut(&mut self) -> &mut Universe {
        self.as_simulation_mut().universe_mut()
    }

    fn bounds(&self) -> Option<(Vector, Vector)> {
        self.as_simulation().bounds()
    }

    fn prepare(&mut self) -> Result<(), EngineError> {
        self.as_simulation_mut().prepare()
    }

    fn update_forces(&mut self) -> Result<(), EngineError> {
        self.as_simulation_mut().update_forces()
    }

    fn update_positions(&mut self, dt: f64) -> Result<(), EngineError> {
        self.as_simulation_mut().update_positions(dt)
    }
}

impl fmt::Display for UniverseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniverseKind::Unbounded(universe) => write!(f, "{universe}"),
            UniverseKind::Finite(finite) => write!(f, "{finite}"),
            UniverseKind::Gridded(gridded) => write!(f, "{gridded}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub summary: RunSummary,
    pub universe: UniverseKind,
}

/// Builds the configured universe, registers its forces and seeds its particles,
/// without simulating anything.
pub fn prepare_universe(config: &SimulationConfig) -> Result<UniverseKind, EngineError> {
    let mut universe = build_universe(config)?;

    let target = universe.universe_mut();
    target.set_kinetic_energy_ceiling(config.kinetic_energy_ceiling)?;
    for kind in &config.interactions {
        target.add_interaction(kind.build());
    }
    for kind in &config.external_forces {
        target.add_external_force(kind.build());
    }

    for spec in &config.particles {
        universe.add_particle(
            Vector::from_slice(&spec.position)?,
            Vector::from_slice(&spec.velocity)?,
            spec.mass,
            spec.name.clone(),
        )?;
    }
    for lattice in &config.lattices {
        let velocity = Vector::from_slice(&lattice.velocity)?;
        for position in lattice.positions() {
            universe.add_particle(Vector::from_slice(&position)?, velocity, lattice.mass, None)?;
        }
    }
    debug!(
        particles = universe.universe().particle_count(),
        "Seeded universe."
    );
    Ok(universe)
}

/// Interactions whose range is unbounded or wider than a cell. The grid only
/// pairs particles in adjacent cells, so these are silently truncated at a
/// distance that depends on where particles sit in their cells.
fn interactions_wider_than_cell(
    interactions: &[InteractionKind],
    cell_side: f64,
) -> Vec<&InteractionKind> {
    interactions
        .iter()
        .filter(|kind| kind.range().is_none_or(|range| range > cell_side))
        .collect()
}

fn build_universe(config: &SimulationConfig) -> Result<UniverseKind, EngineError> {
    let Some(domain) = &config.domain else {
        return Ok(UniverseKind::Unbounded(Universe::new(config.dimension)?));
    };
    let lower = Vector::from_slice(&domain.lower_bound)?;
    let upper = Vector::from_slice(&domain.upper_bound)?;

    match domain.cell_side {
        Some(cell_side) => {
            for kind in interactions_wider_than_cell(&config.interactions, cell_side) {
                warn!(
                    interaction = ?kind,
                    range = ?kind.range(),
                    cell_side,
                    "Interaction reaches past one cell; the grid drops pairs beyond adjacent cells."
                );
            }
            let mut gridded = GriddedUniverse::new(lower, upper, cell_side)?;
            match domain.wall {
                Some(wall) => gridded.enable_reflective_walls(wall.epsilon, wall.sigma)?,
                None => gridded.set_boundary_policy(domain.boundary)?,
            }
            Ok(UniverseKind::Gridded(gridded))
        }
        None => {
            if domain.boundary == BoundaryPolicy::Periodic {
                return Err(EngineError::NotImplemented(
                    "periodic boundaries require a cell side",
                ));
            }
            let mut finite = FiniteUniverse::new(lower, upper)?;
            match domain.wall {
                Some(wall) => finite.enable_reflective_walls(wall.epsilon, wall.sigma)?,
                None => finite.set_boundary_policy(domain.boundary)?,
            }
            Ok(UniverseKind::Finite(finite))
        }
    }
}

#[instrument(skip_all, name = "simulation_workflow")]
pub fn run(
    config: &SimulationConfig,
    recorder: &mut dyn SnapshotRecorder,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, EngineError> {
    // === Phase 1: Build and seed the universe ===
    reporter.report(Progress::PhaseStart { name: "Setup" });
    info!(
        dimension = config.dimension,
        particles = config.initial_particle_count(),
        "Preparing universe."
    );
    let mut universe = prepare_universe(config)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Integrate ===
    reporter.report(Progress::PhaseStart {
        name: "Integration",
    });
    let summary = universe.simulate_stormer_verlet(
        config.time_step,
        config.final_time,
        recorder,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    info!(
        steps = summary.steps,
        live_particles = summary.live_particles,
        clamp_events = summary.clamp_events,
        "Simulation complete."
    );
    Ok(SimulationResult { summary, universe })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{
        DomainConfig, ExternalForceKind, InteractionKind, LatticeSpec, ParticleSpec,
        SimulationConfigBuilder, WallConfig,
    };
    use crate::engine::recorder::{MemoryRecorder, NullRecorder};

    fn lattice(counts: Vec<usize>) -> LatticeSpec {
        LatticeSpec {
            origin: vec![4.0, 4.0],
            counts,
            spacing: 2f64.powf(1.0 / 6.0),
            velocity: vec![0.0, 0.0],
            mass: 1.0,
        }
    }

    fn boxed(boundary: BoundaryPolicy, cell_side: Option<f64>) -> DomainConfig {
        DomainConfig {
            lower_bound: vec![0.0, 0.0],
            upper_bound: vec![20.0, 20.0],
            boundary,
            cell_side,
            wall: None,
        }
    }

    #[test]
    fn config_without_domain_builds_unbounded_universe() {
        let config = SimulationConfigBuilder::new()
            .dimension(3)
            .time_step(0.1)
            .final_time(0.0)
            .particle(ParticleSpec {
                name: Some("Sun".into()),
                position: vec![0.0, 0.0, 0.0],
                velocity: vec![0.0, 0.0, 0.0],
                mass: 1.0,
            })
            .build()
            .unwrap();
        let universe = prepare_universe(&config).unwrap();
        assert!(matches!(universe, UniverseKind::Unbounded(_)));
        assert_eq!(universe.universe().particles().next().unwrap().name(), "Sun");
    }

    #[test]
    fn config_with_cell_side_builds_gridded_universe_with_lattice() {
        let config = SimulationConfigBuilder::new()
            .dimension(2)
            .time_step(0.001)
            .final_time(0.0)
            .domain(boxed(BoundaryPolicy::Periodic, Some(2.5)))
            .lattice(lattice(vec![3, 4]))
            .build()
            .unwrap();
        let universe = prepare_universe(&config).unwrap();
        let UniverseKind::Gridded(gridded) = &universe else {
            panic!("expected a gridded universe");
        };
        assert_eq!(gridded.grid().cells_per_axis(), &[8, 8]);
        assert!(gridded.grid().has_ghost_layer());
        assert_eq!(universe.universe().particle_count(), 12);
    }

    #[test]
    fn only_interactions_within_one_cell_pass_the_grid_check() {
        let lj = |cutoff| InteractionKind::LennardJones {
            epsilon: 1.0,
            sigma: 1.0,
            cutoff,
        };
        let kinds = vec![
            InteractionKind::Gravity,
            lj(None),
            lj(Some(3.0)),
            lj(Some(2.5)),
            lj(Some(1.0)),
        ];
        let wide = interactions_wider_than_cell(&kinds, 2.5);
        assert_eq!(wide, vec![&kinds[0], &kinds[1], &kinds[2]]);
    }

    #[test]
    fn periodic_domain_with_partial_cells_is_rejected() {
        let config = SimulationConfigBuilder::new()
            .dimension(2)
            .time_step(0.01)
            .final_time(0.0)
            .domain(boxed(BoundaryPolicy::Periodic, Some(3.0)))
            .build()
            .unwrap();
        assert!(matches!(
            prepare_universe(&config),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn wall_config_turns_on_reflection_with_walls() {
        let mut domain = boxed(BoundaryPolicy::Reflect, None);
        domain.wall = Some(WallConfig {
            epsilon: 1.0,
            sigma: 1.0,
        });
        let config = SimulationConfigBuilder::new()
            .dimension(2)
            .time_step(0.01)
            .final_time(0.0)
            .domain(domain)
            .build()
            .unwrap();
        let UniverseKind::Finite(finite) = prepare_universe(&config).unwrap() else {
            panic!("expected a finite universe");
        };
        assert!(finite.walls().is_some());
    }

    #[test]
    fn seeding_outside_the_domain_fails() {
        let config = SimulationConfigBuilder::new()
            .dimension(2)
            .time_step(0.01)
            .final_time(0.1)
            .domain(boxed(BoundaryPolicy::Absorb, None))
            .particle(ParticleSpec {
                name: None,
                position: vec![25.0, 1.0],
                velocity: vec![0.0, 0.0],
                mass: 1.0,
            })
            .build()
            .unwrap();
        let result = run(&config, &mut NullRecorder, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::OutOfDomain { .. })));
    }

    #[test]
    fn falling_lattice_run_records_every_step() {
        let config = SimulationConfigBuilder::new()
            .dimension(2)
            .time_step(0.001)
            .final_time(0.01)
            .domain(boxed(BoundaryPolicy::Absorb, Some(2.5)))
            .interaction(InteractionKind::LennardJones {
                epsilon: 5.0,
                sigma: 1.0,
                cutoff: Some(2.5),
            })
            .external_force(ExternalForceKind::UniformGravity { g: 12.0 })
            .lattice(lattice(vec![4, 4]))
            .build()
            .unwrap();
        let mut recorder = MemoryRecorder::new();
        let result = run(&config, &mut recorder, &ProgressReporter::new()).unwrap();
        assert_eq!(result.summary.steps, 10);
        assert_eq!(recorder.frames().len(), 10);
        assert_eq!(result.summary.live_particles, 16);
        assert_eq!(result.universe.universe().past_states(), 10);
        let first = &recorder.frames()[0].positions;
        let last = &recorder.frames()[9].positions;
        assert!(last[0].1[1] < first[0].1[1]);
    }

    #[test]
    fn gridded_and_quadratic_runs_agree_on_the_same_scenario() {
        let builder = |cell_side| {
            SimulationConfigBuilder::new()
                .dimension(2)
                .time_step(0.001)
                .final_time(0.02)
                .domain(boxed(BoundaryPolicy::Reflect, cell_side))
                .interaction(InteractionKind::LennardJones {
                    epsilon: 5.0,
                    sigma: 1.0,
                    cutoff: Some(2.5),
                })
                .lattice(lattice(vec![5, 5]))
                .build()
                .unwrap()
        };
        let reporter = ProgressReporter::new();
        let gridded = run(&builder(Some(2.5)), &mut NullRecorder, &reporter).unwrap();
        let quadratic = run(&builder(None), &mut NullRecorder, &reporter).unwrap();
        let pairs = gridded
            .universe
            .universe()
            .particles()
            .zip(quadratic.universe.universe().particles());
        for (g, q) in pairs {
            assert!((*g.position() - *q.position()).norm() < 1e-8);
        }
    }
}
