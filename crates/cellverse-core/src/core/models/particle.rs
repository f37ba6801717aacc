use crate::core::forcefield::interaction::{ExternalForce, Interaction};
use crate::core::math::vector::{Vector, VectorError};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParticleError {
    #[error("Particle {0} cannot interact with itself")]
    SelfInteraction(u64),

    #[error("Particle mass must be strictly positive, got {0}")]
    NonPositiveMass(f64),

    #[error("Invalid particle vector: {source}")]
    Vector {
        #[from]
        source: VectorError,
    },
}

/// A point particle: kinematic state, force accumulators and identity.
///
/// All vectors of a particle share one dimension, fixed at construction.
/// The `force` accumulator is rebuilt from scratch every step; `previous_force`
/// keeps the value from the step before for the Störmer-Verlet velocity update.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    id: u64,
    name: String,
    mass: f64,
    position: Vector,
    velocity: Vector,
    force: Vector,
    previous_force: Vector,
}

impl Particle {
    /// Creates a particle at rest with respect to forces.
    ///
    /// # Errors
    ///
    /// Returns [`ParticleError::Vector`] if position and velocity dimensions differ,
    /// and [`ParticleError::NonPositiveMass`] if `mass` is not strictly positive.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        position: Vector,
        velocity: Vector,
        mass: f64,
    ) -> Result<Self, ParticleError> {
        position.ensure_same_dimension(&velocity)?;
        if !(mass > 0.0) || !mass.is_finite() {
            return Err(ParticleError::NonPositiveMass(mass));
        }
        let zero = Vector::zeros(position.dimension())?;
        Ok(Self {
            id,
            name: name.into(),
            mass,
            position,
            velocity,
            force: zero,
            previous_force: zero,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn dimension(&self) -> usize {
        self.position.dimension()
    }

    pub fn position(&self) -> &Vector {
        &self.position
    }

    pub fn velocity(&self) -> &Vector {
        &self.velocity
    }

    pub fn force(&self) -> &Vector {
        &self.force
    }

    pub fn previous_force(&self) -> &Vector {
        &self.previous_force
    }

    pub fn distance_to(&self, other: &Particle) -> f64 {
        (other.position - self.position).norm()
    }

    /// `½·m·|v|²`
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    pub fn add_to_force(&mut self, force: &Vector) -> Result<(), ParticleError> {
        self.force.ensure_same_dimension(force)?;
        self.force += force;
        Ok(())
    }

    pub fn add_to_force_coord(&mut self, axis: usize, value: f64) -> Result<(), ParticleError> {
        self.force.check_axis(axis)?;
        self.force[axis] += value;
        Ok(())
    }

    pub fn reset_force(&mut self) {
        self.force.set_zero();
    }

    /// Copies the current force into the previous-force slot.
    pub fn store_previous_force(&mut self) {
        self.previous_force = self.force;
    }

    pub fn add_to_position(&mut self, delta: &Vector) -> Result<(), ParticleError> {
        self.position.ensure_same_dimension(delta)?;
        self.position += delta;
        Ok(())
    }

    pub fn set_position_coord(&mut self, axis: usize, value: f64) -> Result<(), ParticleError> {
        self.position.set(axis, value)?;
        Ok(())
    }

    pub fn add_to_velocity(&mut self, delta: &Vector) -> Result<(), ParticleError> {
        self.velocity.ensure_same_dimension(delta)?;
        self.velocity += delta;
        Ok(())
    }

    pub fn invert_velocity_coord(&mut self, axis: usize) -> Result<(), ParticleError> {
        self.velocity.check_axis(axis)?;
        self.velocity[axis] = -self.velocity[axis];
        Ok(())
    }

    pub fn multiply_velocity(&mut self, factor: f64) {
        self.velocity *= factor;
    }

    /// Returns a copy of this particle moved by `offset`, keeping its identity.
    ///
    /// Used for periodic images: the copy is never inserted into a universe.
    pub fn translated(&self, offset: &Vector) -> Self {
        let mut copy = self.clone();
        copy.position += offset;
        copy
    }

    /// Adds the force of every external field to this particle.
    pub fn apply_external_forces(&mut self, forces: &[ExternalForce]) -> Result<(), ParticleError> {
        for force in forces {
            let contribution = force.force_on(self);
            self.add_to_force(&contribution)?;
        }
        Ok(())
    }

    /// Sum of the forces `source` exerts on this particle through `interactions`.
    ///
    /// Only the force on `self` is computed; the reaction on `source` needs a
    /// second call with the roles swapped.
    ///
    /// # Errors
    ///
    /// [`ParticleError::SelfInteraction`] if `source` is this particle (same id).
    pub fn interaction_force_from(
        &self,
        source: &Particle,
        interactions: &[Interaction],
    ) -> Result<Vector, ParticleError> {
        if source.id == self.id {
            return Err(ParticleError::SelfInteraction(self.id));
        }
        self.position.ensure_same_dimension(&source.position)?;
        let mut total = Vector::zeros(self.dimension())?;
        for interaction in interactions {
            total += &interaction.force_on(source, self);
        }
        Ok(total)
    }

    /// Adds the force `source` exerts on this particle through `interactions`.
    pub fn apply_interactions_from(
        &mut self,
        source: &Particle,
        interactions: &[Interaction],
    ) -> Result<(), ParticleError> {
        let force = self.interaction_force_from(source, interactions)?;
        self.add_to_force(&force)
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Particle {}", self.id)?;
        writeln!(f, "    name = {}", self.name)?;
        writeln!(f, "    mass = {}", self.mass)?;
        writeln!(f, "    position = {}", self.position)?;
        writeln!(f, "    velocity = {}", self.velocity)?;
        write!(f, "    force = {}", self.force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn particle(id: u64, position: Vector) -> Particle {
        let velocity = Vector::zeros(position.dimension()).unwrap();
        Particle::new(id, format!("p{id}"), position, velocity, 1.0).unwrap()
    }

    fn constant_push(value: f64) -> Interaction {
        Interaction::new("push", move |_source: &Particle, target: &Particle| {
            let mut force = Vector::zeros(target.dimension()).unwrap();
            force[0] = value;
            force
        })
    }

    #[test]
    fn new_rejects_mismatched_position_and_velocity() {
        let result = Particle::new(0, "a", Vector::new2(0.0, 0.0), Vector::new1(0.0), 1.0);
        assert!(matches!(result, Err(ParticleError::Vector { .. })));
    }

    #[test]
    fn new_rejects_non_positive_mass() {
        let result = Particle::new(0, "a", Vector::new1(0.0), Vector::new1(0.0), 0.0);
        assert_eq!(result, Err(ParticleError::NonPositiveMass(0.0)));
        let result = Particle::new(0, "a", Vector::new1(0.0), Vector::new1(0.0), f64::NAN);
        assert!(matches!(result, Err(ParticleError::NonPositiveMass(_))));
    }

    #[test]
    fn force_accumulation_adds_and_resets() {
        let mut p = particle(1, Vector::new2(0.0, 0.0));
        p.add_to_force(&Vector::new2(1.0, 2.0)).unwrap();
        p.add_to_force_coord(1, 0.5).unwrap();
        assert_eq!(*p.force(), Vector::new2(1.0, 2.5));

        p.store_previous_force();
        p.reset_force();
        assert_eq!(*p.force(), Vector::new2(0.0, 0.0));
        assert_eq!(*p.previous_force(), Vector::new2(1.0, 2.5));
    }

    #[test]
    fn coordinate_primitives_reject_out_of_range_axes() {
        let mut p = particle(1, Vector::new2(0.0, 0.0));
        assert!(p.add_to_force_coord(2, 1.0).is_err());
        assert!(p.set_position_coord(5, 1.0).is_err());
        assert!(p.invert_velocity_coord(2).is_err());
        assert!(p.add_to_force(&Vector::new3(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn invert_velocity_coord_flips_only_that_axis() {
        let mut p = Particle::new(0, "a", Vector::new2(0.0, 0.0), Vector::new2(1.0, -2.0), 1.0)
            .unwrap();
        p.invert_velocity_coord(1).unwrap();
        assert_eq!(*p.velocity(), Vector::new2(1.0, 2.0));
    }

    #[test]
    fn interaction_with_itself_is_rejected() {
        let p = particle(7, Vector::new1(0.0));
        let same = p.clone();
        let result = p.interaction_force_from(&same, &[constant_push(1.0)]);
        assert_eq!(result, Err(ParticleError::SelfInteraction(7)));
    }

    #[test]
    fn apply_interactions_from_sums_every_interaction_onto_target_only() {
        let source = particle(1, Vector::new2(1.0, 0.0));
        let mut target = particle(2, Vector::new2(0.0, 0.0));
        target
            .apply_interactions_from(&source, &[constant_push(1.5), constant_push(0.5)])
            .unwrap();
        assert!((target.force()[0] - 2.0).abs() < TOLERANCE);
        assert_eq!(*source.force(), Vector::new2(0.0, 0.0));
    }

    #[test]
    fn translated_copy_keeps_identity_and_shifts_position() {
        let p = particle(3, Vector::new2(1.0, 1.0));
        let copy = p.translated(&Vector::new2(-10.0, 0.0));
        assert_eq!(copy.id(), 3);
        assert_eq!(*copy.position(), Vector::new2(-9.0, 1.0));
        assert_eq!(*p.position(), Vector::new2(1.0, 1.0));
    }

    #[test]
    fn kinetic_energy_is_half_mass_times_speed_squared() {
        let p = Particle::new(0, "a", Vector::new2(0.0, 0.0), Vector::new2(3.0, 4.0), 2.0).unwrap();
        assert!((p.kinetic_energy() - 25.0).abs() < TOLERANCE);
    }
}
