use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::recorder::{Snapshot, SnapshotRecorder};
use super::universe::Universe;
use crate::core::math::vector::Vector;
use tracing::{debug, info};

/// A universe that can be advanced with the Störmer-Verlet scheme.
///
/// Implementors only decide how forces are accumulated and how positions are
/// moved (plus whatever bookkeeping those need); the step loop itself lives in
/// [`StormerVerlet::run`].
pub trait Simulation {
    fn universe(&self) -> &Universe;
    fn universe_mut(&mut self) -> &mut Universe;

    /// Box used by downstream consumers for scaling.
    fn bounds(&self) -> Option<(Vector, Vector)> {
        let extrema = self.universe().extrema();
        extrema.lower.zip(extrema.upper)
    }

    /// Called once before the initial force computation.
    fn prepare(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Recomputes every particle's force from the current positions.
    fn update_forces(&mut self) -> Result<(), EngineError>;

    /// Advances positions by one step using the current forces and velocities.
    fn update_positions(&mut self, dt: f64) -> Result<(), EngineError>;

    fn simulate_stormer_verlet(
        &mut self,
        time_step: f64,
        final_time: f64,
        recorder: &mut dyn SnapshotRecorder,
        reporter: &ProgressReporter,
    ) -> Result<RunSummary, EngineError> {
        StormerVerlet::new(time_step, final_time)?.run(self, recorder, reporter)
    }
}

impl Simulation for Universe {
    fn universe(&self) -> &Universe {
        self
    }

    fn universe_mut(&mut self) -> &mut Universe {
        self
    }

    fn update_forces(&mut self) -> Result<(), EngineError> {
        Universe::update_forces(self)
    }

    fn update_positions(&mut self, dt: f64) -> Result<(), EngineError> {
        self.verlet_position_step(dt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub simulated_time: f64,
    pub live_particles: usize,
    pub kinetic_energy: f64,
    /// Steps after which the kinetic-energy clamp rescaled velocities.
    pub clamp_events: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StormerVerlet {
    time_step: f64,
    final_time: f64,
}

impl StormerVerlet {
    pub fn new(time_step: f64, final_time: f64) -> Result<Self, EngineError> {
        if !(time_step > 0.0 && time_step.is_finite()) {
            return Err(EngineError::Configuration(format!(
                "time step must be positive and finite, got {time_step}"
            )));
        }
        if !(final_time >= 0.0 && final_time.is_finite()) {
            return Err(EngineError::Configuration(format!(
                "final time must be non-negative and finite, got {final_time}"
            )));
        }
        Ok(Self {
            time_step,
            final_time,
        })
    }

    /// `floor(final_time / time_step)`, fixed before the first step.
    pub fn step_count(&self) -> u64 {
        (self.final_time / self.time_step).floor() as u64
    }

    pub fn run<S: Simulation + ?Sized>(
        &self,
        simulation: &mut S,
        recorder: &mut dyn SnapshotRecorder,
        reporter: &ProgressReporter,
    ) -> Result<RunSummary, EngineError> {
        let dt = self.time_step;
        let steps = self.step_count();
        info!(
            steps,
            dt,
            particles = simulation.universe().particle_count(),
            "Starting Störmer-Verlet integration."
        );

        simulation.prepare()?;
        simulation.update_forces()?;

        reporter.report(Progress::TaskStart { total_steps: steps });
        let mut clamp_events = 0;
        for step in 0..steps {
            let time = step as f64 * dt;
            simulation.universe_mut().update_extrema()?;
            record(simulation, recorder, step, time);

            simulation.update_positions(dt)?;
            simulation.universe_mut().store_previous_forces();
            simulation.update_forces()?;

            let universe = simulation.universe_mut();
            universe.verlet_velocity_step(dt)?;
            if universe.clamp_kinetic_energy()?.is_some() {
                clamp_events += 1;
            }
            universe.record_state();

            reporter.report(Progress::StepDone {
                step,
                live_particles: universe.particle_count(),
                kinetic_energy: universe.kinetic_energy()?,
            });
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        recorder.finish();

        let universe = simulation.universe();
        let summary = RunSummary {
            steps,
            simulated_time: steps as f64 * dt,
            live_particles: universe.particle_count(),
            kinetic_energy: universe.kinetic_energy()?,
            clamp_events,
        };
        debug!(?summary, "Integration finished.");
        Ok(summary)
    }
}

fn record<S: Simulation + ?Sized>(
    simulation: &S,
    recorder: &mut dyn SnapshotRecorder,
    step: u64,
    time: f64,
) {
    let universe = simulation.universe();
    let snapshot = Snapshot {
        step,
        time,
        particles: universe.particles().collect(),
        bounds: simulation.bounds(),
        max_force: universe.extrema().max_force,
    };
    recorder.record(&snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::interaction::Interaction;
    use crate::engine::recorder::{MemoryRecorder, NullRecorder};
    use std::sync::Mutex;

    const TOLERANCE: f64 = 1e-12;

    fn two_body() -> Universe {
        let mut universe = Universe::new(2).unwrap();
        universe
            .add_particle(Vector::new2(0.0, 0.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        universe
            .add_particle(Vector::new2(3.0, 0.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        universe.add_interaction(Interaction::gravity());
        universe
    }

    #[test]
    fn new_rejects_non_positive_time_step() {
        assert!(StormerVerlet::new(0.0, 1.0).is_err());
        assert!(StormerVerlet::new(-0.1, 1.0).is_err());
        assert!(StormerVerlet::new(0.1, -1.0).is_err());
    }

    #[test]
    fn step_count_is_floor_of_final_time_over_time_step() {
        assert_eq!(StormerVerlet::new(0.25, 1.0).unwrap().step_count(), 4);
        assert_eq!(StormerVerlet::new(0.3, 1.0).unwrap().step_count(), 3);
        assert_eq!(StormerVerlet::new(0.5, 0.0).unwrap().step_count(), 0);
    }

    #[test]
    fn two_bodies_move_equally_and_oppositely_along_their_axis() {
        let mut universe = two_body();
        let summary = universe
            .simulate_stormer_verlet(0.01, 0.01, &mut NullRecorder, &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.steps, 1);

        let positions: Vec<_> = universe.particles().map(|p| *p.position()).collect();
        let da = positions[0] - Vector::new2(0.0, 0.0);
        let db = positions[1] - Vector::new2(3.0, 0.0);
        assert!(da[0] > 0.0);
        assert!((da + db).norm() < TOLERANCE);
        assert_eq!(da[1], 0.0);
        assert_eq!(db[1], 0.0);
        // Δx = F/(2m)·dt² with F = 1/9.
        assert!((da[0] - 0.5 / 9.0 * 1e-4).abs() < TOLERANCE);
    }

    #[test]
    fn resting_particle_without_forces_stays_put() {
        let mut universe = Universe::new(2).unwrap();
        universe
            .add_particle(Vector::new2(1.5, -2.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        universe
            .simulate_stormer_verlet(0.1, 0.1, &mut NullRecorder, &ProgressReporter::new())
            .unwrap();
        let particle = universe.particles().next().unwrap();
        assert_eq!(*particle.position(), Vector::new2(1.5, -2.0));
        assert_eq!(universe.past_states(), 1);
    }

    #[test]
    fn recorder_sees_each_step_before_positions_move() {
        let mut universe = Universe::new(1).unwrap();
        universe
            .add_particle(Vector::new1(0.0), Vector::new1(1.0), 1.0, None)
            .unwrap();
        let mut recorder = MemoryRecorder::new();
        universe
            .simulate_stormer_verlet(0.5, 1.5, &mut recorder, &ProgressReporter::new())
            .unwrap();
        let frames = recorder.frames();
        assert_eq!(frames.len(), 3);
        assert!(recorder.is_finished());
        let xs: Vec<f64> = frames.iter().map(|f| f.positions[0].1[0]).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0]);
        assert_eq!(frames[2].time, 1.0);
    }

    #[test]
    fn progress_reports_one_increment_per_step() {
        let increments = Mutex::new(0u64);
        let total = Mutex::new(None);
        let reporter = ProgressReporter::with_callback(Box::new(|event| match event {
            Progress::TaskStart { total_steps } => *total.lock().unwrap() = Some(total_steps),
            Progress::TaskIncrement => *increments.lock().unwrap() += 1,
            _ => {}
        }));
        let mut universe = two_body();
        universe
            .simulate_stormer_verlet(0.1, 1.0, &mut NullRecorder, &reporter)
            .unwrap();
        drop(reporter);
        assert_eq!(total.into_inner().unwrap(), Some(10));
        assert_eq!(increments.into_inner().unwrap(), 10);
    }

    #[test]
    fn clamp_events_are_counted_when_energy_exceeds_ceiling() {
        let mut universe = Universe::new(1).unwrap();
        universe
            .add_particle(Vector::new1(0.0), Vector::new1(100.0), 1.0, None)
            .unwrap();
        universe.set_kinetic_energy_ceiling(50.0).unwrap();
        let summary = universe
            .simulate_stormer_verlet(0.01, 0.02, &mut NullRecorder, &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.clamp_events, 1);
        assert!((summary.kinetic_energy - 50.0).abs() < 1e-9);
    }
}
