use super::boundary::BoundaryPolicy;
use crate::core::forcefield::interaction::{ExternalForce, Interaction};
use crate::core::math::vector::MAX_DIMENSION;
use itertools::Itertools;
use thiserror::Error;

/// Kinetic energy above which every velocity is rescaled after a step.
pub const DEFAULT_KINETIC_ENERGY_CEILING: f64 = 100_000.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionKind {
    Gravity,
    LennardJones {
        epsilon: f64,
        sigma: f64,
        cutoff: Option<f64>,
    },
}

impl InteractionKind {
    pub fn build(&self) -> Interaction {
        match *self {
            InteractionKind::Gravity => Interaction::gravity(),
            InteractionKind::LennardJones {
                epsilon,
                sigma,
                cutoff,
            } => {
                let interaction = Interaction::lennard_jones(epsilon, sigma);
                match cutoff {
                    Some(radius) => interaction.with_cutoff(radius),
                    None => interaction,
                }
            }
        }
    }

    /// Distance beyond which the interaction vanishes, `None` if unbounded.
    pub fn range(&self) -> Option<f64> {
        match *self {
            InteractionKind::Gravity => None,
            InteractionKind::LennardJones { cutoff, .. } => cutoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExternalForceKind {
    UniformGravity { g: f64 },
}

impl ExternalForceKind {
    pub fn build(&self) -> ExternalForce {
        match *self {
            ExternalForceKind::UniformGravity { g } => ExternalForce::uniform_gravity(g),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallConfig {
    pub epsilon: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainConfig {
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub boundary: BoundaryPolicy,
    /// Side of the spatial cells; `None` runs the all-pairs force pass.
    pub cell_side: Option<f64>,
    /// Wall repulsion, only meaningful with [`BoundaryPolicy::Reflect`].
    pub wall: Option<WallConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSpec {
    pub name: Option<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub mass: f64,
}

/// A rectangular block of equally spaced particles sharing one velocity and mass.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeSpec {
    pub origin: Vec<f64>,
    pub counts: Vec<usize>,
    pub spacing: f64,
    pub velocity: Vec<f64>,
    pub mass: f64,
}

impl LatticeSpec {
    pub fn particle_count(&self) -> usize {
        self.counts.iter().product()
    }

    /// Positions of every lattice site, last axis varying fastest.
    pub fn positions(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .map(|&count| 0..count)
            .multi_cartesian_product()
            .map(|indices| {
                indices
                    .iter()
                    .zip(&self.origin)
                    .map(|(&i, &origin)| origin + i as f64 * self.spacing)
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub dimension: usize,
    pub time_step: f64,
    pub final_time: f64,
    pub domain: Option<DomainConfig>,
    pub kinetic_energy_ceiling: f64,
    pub interactions: Vec<InteractionKind>,
    pub external_forces: Vec<ExternalForceKind>,
    pub particles: Vec<ParticleSpec>,
    pub lattices: Vec<LatticeSpec>,
}

impl SimulationConfig {
    /// Number of integration steps: `floor(final_time / time_step)`.
    pub fn step_count(&self) -> u64 {
        (self.final_time / self.time_step).floor() as u64
    }

    pub fn initial_particle_count(&self) -> usize {
        self.particles.len()
            + self
                .lattices
                .iter()
                .map(LatticeSpec::particle_count)
                .sum::<usize>()
    }
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    dimension: Option<usize>,
    time_step: Option<f64>,
    final_time: Option<f64>,
    domain: Option<DomainConfig>,
    kinetic_energy_ceiling: Option<f64>,
    interactions: Vec<InteractionKind>,
    external_forces: Vec<ExternalForceKind>,
    particles: Vec<ParticleSpec>,
    lattices: Vec<LatticeSpec>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }
    pub fn time_step(mut self, dt: f64) -> Self {
        self.time_step = Some(dt);
        self
    }
    pub fn final_time(mut self, time: f64) -> Self {
        self.final_time = Some(time);
        self
    }
    pub fn domain(mut self, domain: DomainConfig) -> Self {
        self.domain = Some(domain);
        self
    }
    pub fn kinetic_energy_ceiling(mut self, ceiling: f64) -> Self {
        self.kinetic_energy_ceiling = Some(ceiling);
        self
    }
    pub fn interaction(mut self, kind: InteractionKind) -> Self {
        self.interactions.push(kind);
        self
    }
    pub fn external_force(mut self, kind: ExternalForceKind) -> Self {
        self.external_forces.push(kind);
        self
    }
    pub fn particle(mut self, spec: ParticleSpec) -> Self {
        self.particles.push(spec);
        self
    }
    pub fn lattice(mut self, spec: LatticeSpec) -> Self {
        self.lattices.push(spec);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let dimension = self
            .dimension
            .ok_or(ConfigError::MissingParameter("dimension"))?;
        let time_step = self
            .time_step
            .ok_or(ConfigError::MissingParameter("time_step"))?;
        let final_time = self
            .final_time
            .ok_or(ConfigError::MissingParameter("final_time"))?;
        let kinetic_energy_ceiling = self
            .kinetic_energy_ceiling
            .unwrap_or(DEFAULT_KINETIC_ENERGY_CEILING);

        if !(1..=MAX_DIMENSION).contains(&dimension) {
            return Err(invalid("dimension", format!("{dimension} is not 1, 2 or 3")));
        }
        if !(time_step > 0.0 && time_step.is_finite()) {
            return Err(invalid("time_step", "must be a positive finite number"));
        }
        if !(final_time >= 0.0 && final_time.is_finite()) {
            return Err(invalid("final_time", "must be a non-negative finite number"));
        }
        if !(kinetic_energy_ceiling > 0.0) {
            return Err(invalid("kinetic_energy_ceiling", "must be positive"));
        }

        let expect_len = |parameter: &'static str, len: usize| {
            if len == dimension {
                Ok(())
            } else {
                Err(invalid(
                    parameter,
                    format!("expected {dimension} coordinates, found {len}"),
                ))
            }
        };

        if let Some(domain) = &self.domain {
            expect_len("domain.lower_bound", domain.lower_bound.len())?;
            expect_len("domain.upper_bound", domain.upper_bound.len())?;
            if let Some(side) = domain.cell_side {
                if !(side > 0.0 && side.is_finite()) {
                    return Err(invalid("domain.cell_side", "must be a positive finite number"));
                }
            }
            if let Some(wall) = domain.wall {
                if domain.boundary != BoundaryPolicy::Reflect {
                    return Err(invalid("domain.wall", "walls require the reflect boundary"));
                }
                if !(wall.epsilon > 0.0 && wall.sigma > 0.0) {
                    return Err(invalid("domain.wall", "epsilon and sigma must be positive"));
                }
            }
            if domain.boundary == BoundaryPolicy::Periodic && domain.cell_side.is_none() {
                return Err(invalid(
                    "domain.boundary",
                    "periodic boundaries require a cell side",
                ));
            }
        }

        for kind in &self.interactions {
            if let InteractionKind::LennardJones {
                epsilon,
                sigma,
                cutoff,
            } = *kind
            {
                if !(epsilon > 0.0 && sigma > 0.0) {
                    return Err(invalid("interactions", "epsilon and sigma must be positive"));
                }
                if cutoff.is_some_and(|radius| !(radius > 0.0)) {
                    return Err(invalid("interactions", "cutoff must be positive"));
                }
            }
        }

        for spec in &self.particles {
            expect_len("particles.position", spec.position.len())?;
            expect_len("particles.velocity", spec.velocity.len())?;
        }
        for spec in &self.lattices {
            expect_len("lattices.origin", spec.origin.len())?;
            expect_len("lattices.counts", spec.counts.len())?;
            expect_len("lattices.velocity", spec.velocity.len())?;
            if !(spec.spacing > 0.0) {
                return Err(invalid("lattices.spacing", "must be positive"));
            }
        }

        Ok(SimulationConfig {
            dimension,
            time_step,
            final_time,
            domain: self.domain,
            kinetic_energy_ceiling,
            interactions: self.interactions,
            external_forces: self.external_forces,
            particles: self.particles,
            lattices: self.lattices,
        })
    }
}
