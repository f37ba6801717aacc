use super::config::DEFAULT_KINETIC_ENERGY_CEILING;
use super::error::EngineError;
use crate::core::forcefield::interaction::{ExternalForce, Interaction};
use crate::core::math::vector::{self, Vector};
use crate::core::models::ids::ParticleKey;
use crate::core::models::particle::Particle;
use itertools::Itertools;
use slotmap::SlotMap;
use std::fmt;
use tracing::{info, trace, warn};

/// Running extrema over every step simulated so far.
///
/// Only kept for downstream scaling (plot ranges, arrow lengths); the engine
/// itself never reads them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extrema {
    pub lower: Option<Vector>,
    pub upper: Option<Vector>,
    pub max_force: f64,
}

impl Extrema {
    fn observe(&mut self, particle: &Particle) -> Result<(), EngineError> {
        let position = particle.position();
        self.lower = Some(match &self.lower {
            Some(lower) => vector::min(lower, position)?,
            None => *position,
        });
        self.upper = Some(match &self.upper {
            Some(upper) => vector::max(upper, position)?,
            None => *position,
        });
        self.max_force = self.max_force.max(particle.force().norm());
        Ok(())
    }
}

/// An unbounded set of particles under pairwise interactions and external fields.
///
/// Particles live in an arena and are addressed by [`ParticleKey`]; `order` keeps
/// insertion order so iteration, snapshots and the all-pairs pass are deterministic.
#[derive(Debug, Clone)]
pub struct Universe {
    dimension: usize,
    particles: SlotMap<ParticleKey, Particle>,
    order: Vec<ParticleKey>,
    next_particle_id: u64,
    interactions: Vec<Interaction>,
    external_forces: Vec<ExternalForce>,
    extrema: Extrema,
    kinetic_energy_ceiling: f64,
    past_states: u64,
}

impl Universe {
    pub fn new(dimension: usize) -> Result<Self, EngineError> {
        Vector::zeros(dimension)?;
        info!(dimension, "Creating universe.");
        Ok(Self {
            dimension,
            particles: SlotMap::with_key(),
            order: Vec::new(),
            next_particle_id: 0,
            interactions: Vec::new(),
            external_forces: Vec::new(),
            extrema: Extrema::default(),
            kinetic_energy_ceiling: DEFAULT_KINETIC_ENERGY_CEILING,
            past_states: 0,
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of integration steps completed.
    pub fn past_states(&self) -> u64 {
        self.past_states
    }

    pub(crate) fn record_state(&mut self) {
        self.past_states += 1;
    }

    pub fn extrema(&self) -> &Extrema {
        &self.extrema
    }

    pub fn kinetic_energy_ceiling(&self) -> f64 {
        self.kinetic_energy_ceiling
    }

    pub fn set_kinetic_energy_ceiling(&mut self, ceiling: f64) -> Result<(), EngineError> {
        if !(ceiling > 0.0) {
            return Err(EngineError::Configuration(format!(
                "kinetic energy ceiling must be positive, got {ceiling}"
            )));
        }
        self.kinetic_energy_ceiling = ceiling;
        Ok(())
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn add_interaction(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn external_forces(&self) -> &[ExternalForce] {
        &self.external_forces
    }

    pub fn add_external_force(&mut self, force: ExternalForce) {
        self.external_forces.push(force);
    }

    /// Live particle keys in insertion order.
    pub fn keys(&self) -> &[ParticleKey] {
        &self.order
    }

    pub fn particle(&self, key: ParticleKey) -> Option<&Particle> {
        self.particles.get(key)
    }

    pub(crate) fn particle_mut(&mut self, key: ParticleKey) -> Option<&mut Particle> {
        self.particles.get_mut(key)
    }

    pub(crate) fn arena(&self) -> &SlotMap<ParticleKey, Particle> {
        &self.particles
    }

    /// Live particles in insertion order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.order.iter().map(|&key| &self.particles[key])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticleKey, &Particle)> + '_ {
        self.order.iter().map(|&key| (key, &self.particles[key]))
    }

    pub(crate) fn particles_mut(&mut self) -> impl Iterator<Item = &mut Particle> + '_ {
        self.particles.values_mut()
    }

    /// Adds a particle; without a name it is called `"Particle <n>"`, `n` being the
    /// number of particles already present.
    pub fn add_particle(
        &mut self,
        position: Vector,
        velocity: Vector,
        mass: f64,
        name: Option<String>,
    ) -> Result<ParticleKey, EngineError> {
        Vector::zeros(self.dimension)?.ensure_same_dimension(&position)?;
        let name = name.unwrap_or_else(|| format!("Particle {}", self.particle_count()));
        let particle = Particle::new(self.next_particle_id, name, position, velocity, mass)?;
        self.next_particle_id += 1;
        let key = self.particles.insert(particle);
        self.order.push(key);
        Ok(key)
    }

    /// Removes the given particles; unknown keys are ignored.
    pub fn remove_particles(&mut self, keys: &[ParticleKey]) -> usize {
        let mut removed = 0;
        for &key in keys {
            if self.particles.remove(key).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            let particles = &self.particles;
            self.order.retain(|key| particles.contains_key(*key));
        }
        removed
    }

    pub fn reset_forces(&mut self) {
        for particle in self.particles.values_mut() {
            particle.reset_force();
        }
    }

    pub fn apply_external_forces(&mut self) -> Result<(), EngineError> {
        if self.external_forces.is_empty() {
            return Ok(());
        }
        for particle in self.particles.values_mut() {
            particle.apply_external_forces(&self.external_forces)?;
        }
        Ok(())
    }

    /// Adds a field that is owned elsewhere (e.g. the walls of a bounded domain).
    pub(crate) fn apply_field(&mut self, field: &ExternalForce) -> Result<(), EngineError> {
        for particle in self.particles.values_mut() {
            particle.apply_external_forces(std::slice::from_ref(field))?;
        }
        Ok(())
    }

    /// All-pairs interaction pass: every unordered pair once, both directions.
    pub fn apply_pairwise_interactions(&mut self) -> Result<(), EngineError> {
        if self.interactions.is_empty() {
            return Ok(());
        }
        for (&a, &b) in self.order.iter().tuple_combinations() {
            let (first, second) = (&self.particles[a], &self.particles[b]);
            let on_first = first.interaction_force_from(second, &self.interactions)?;
            let on_second = second.interaction_force_from(first, &self.interactions)?;
            self.particles[a].add_to_force(&on_first)?;
            self.particles[b].add_to_force(&on_second)?;
        }
        Ok(())
    }

    /// Zeroes forces, then applies external fields and the all-pairs pass.
    pub fn update_forces(&mut self) -> Result<(), EngineError> {
        self.reset_forces();
        self.apply_external_forces()?;
        self.apply_pairwise_interactions()
    }

    /// `x += (F·dt/(2m) + v)·dt`
    pub fn verlet_position_step(&mut self, dt: f64) -> Result<(), EngineError> {
        for particle in self.particles.values_mut() {
            let delta = (*particle.force() * (0.5 * dt / particle.mass()) + *particle.velocity()) * dt;
            particle.add_to_position(&delta)?;
        }
        Ok(())
    }

    pub fn store_previous_forces(&mut self) {
        for particle in self.particles.values_mut() {
            particle.store_previous_force();
        }
    }

    /// `v += (F + F_old)·dt/(2m)`
    pub fn verlet_velocity_step(&mut self, dt: f64) -> Result<(), EngineError> {
        for particle in self.particles.values_mut() {
            let delta =
                (*particle.force() + *particle.previous_force()) * (0.5 * dt / particle.mass());
            particle.add_to_velocity(&delta)?;
        }
        Ok(())
    }

    /// Total kinetic energy `Σ ½·m·|v|²`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NumericalDivergence`] when the sum is not a number.
    pub fn kinetic_energy(&self) -> Result<f64, EngineError> {
        let energy: f64 = self.particles.values().map(Particle::kinetic_energy).sum();
        if energy.is_nan() {
            return Err(EngineError::NumericalDivergence(format!(
                "kinetic energy is NaN after {} steps",
                self.past_states
            )));
        }
        Ok(energy)
    }

    /// Rescales every velocity by `sqrt(C/E)` when the kinetic energy `E` exceeds the ceiling `C`.
    ///
    /// Returns the applied factor, if any.
    pub fn clamp_kinetic_energy(&mut self) -> Result<Option<f64>, EngineError> {
        let energy = self.kinetic_energy()?;
        trace!(energy, "Kinetic energy after velocity update.");
        if energy <= self.kinetic_energy_ceiling {
            return Ok(None);
        }
        let factor = (self.kinetic_energy_ceiling / energy).sqrt();
        warn!(
            energy,
            ceiling = self.kinetic_energy_ceiling,
            factor,
            "Kinetic energy exceeds the ceiling; rescaling velocities."
        );
        for particle in self.particles.values_mut() {
            particle.multiply_velocity(factor);
        }
        Ok(Some(factor))
    }

    /// Folds the current positions and forces into the running extrema.
    pub fn update_extrema(&mut self) -> Result<(), EngineError> {
        for &key in &self.order {
            self.extrema.observe(&self.particles[key])?;
        }
        Ok(())
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Universe ({}D)", self.dimension)?;
        writeln!(f, "    particles = {}", self.particle_count())?;
        writeln!(f, "    steps simulated = {}", self.past_states)?;
        writeln!(f, "    kinetic energy ceiling = {}", self.kinetic_energy_ceiling)?;
        let interactions = self.interactions.iter().map(Interaction::name).join(", ");
        writeln!(f, "    interactions = [{interactions}]")?;
        let fields = self.external_forces.iter().map(ExternalForce::name).join(", ");
        write!(f, "    external forces = [{fields}]")
    }
}
