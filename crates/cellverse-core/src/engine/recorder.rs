use crate::core::math::vector::Vector;
use crate::core::models::particle::Particle;

/// Read-only view of the simulation handed to recorders once per step,
/// before positions are advanced.
#[derive(Debug)]
pub struct Snapshot<'a> {
    pub step: u64,
    pub time: f64,
    /// Live particles in insertion order.
    pub particles: Vec<&'a Particle>,
    /// Domain bounds for finite universes, running position extrema otherwise.
    pub bounds: Option<(Vector, Vector)>,
    pub max_force: f64,
}

pub trait SnapshotRecorder {
    fn record(&mut self, snapshot: &Snapshot<'_>);

    /// Called once after the last step.
    fn finish(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl SnapshotRecorder for NullRecorder {
    fn record(&mut self, _snapshot: &Snapshot<'_>) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: u64,
    pub time: f64,
    /// `(particle id, position)` pairs in insertion order.
    pub positions: Vec<(u64, Vector)>,
}

/// Keeps every frame in memory; meant for tests and small runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    frames: Vec<Frame>,
    finished: bool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl SnapshotRecorder for MemoryRecorder {
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        self.frames.push(Frame {
            step: snapshot.step,
            time: snapshot.time,
            positions: snapshot
                .particles
                .iter()
                .map(|p| (p.id(), *p.position()))
                .collect(),
        });
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
