use super::potentials::{
    gravitational_force, lennard_jones_force, uniform_gravity_force, wall_force,
};
use crate::core::math::vector::Vector;
use crate::core::models::particle::Particle;
use std::fmt;
use std::sync::Arc;

pub type PairForceFn = dyn Fn(&Particle, &Particle) -> Vector + Send + Sync;
pub type FieldForceFn = dyn Fn(&Particle) -> Vector + Send + Sync;

/// A named pairwise interaction.
///
/// The wrapped function receives `(source, target)` and returns the force the
/// source exerts on the target. Nothing is applied to the source: callers that
/// want the reaction evaluate the interaction again with the roles swapped.
#[derive(Clone)]
pub struct Interaction {
    name: String,
    function: Arc<PairForceFn>,
}

impl Interaction {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Particle, &Particle) -> Vector + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    /// Newtonian gravity with unit gravitational constant.
    pub fn gravity() -> Self {
        Self::new("gravity", |source: &Particle, target: &Particle| {
            gravitational_force(
                source.position(),
                source.mass(),
                target.position(),
                target.mass(),
            )
        })
    }

    pub fn lennard_jones(epsilon: f64, sigma: f64) -> Self {
        Self::new(
            format!("lennard-jones(epsilon={epsilon}, sigma={sigma})"),
            move |source: &Particle, target: &Particle| {
                lennard_jones_force(source.position(), target.position(), epsilon, sigma)
            },
        )
    }

    /// Truncates this interaction: pairs further apart than `cutoff` exert no force.
    ///
    /// A gridded universe only sees pairs in adjacent cells, so its results match
    /// the all-pairs pass exactly when every interaction is truncated at or below
    /// the cell side.
    pub fn with_cutoff(self, cutoff: f64) -> Self {
        let inner = self.function;
        let cutoff2 = cutoff * cutoff;
        Self {
            name: format!("{} (cutoff {cutoff})", self.name),
            function: Arc::new(move |source: &Particle, target: &Particle| {
                let delta = *source.position() - *target.position();
                if delta.norm_squared() > cutoff2 {
                    delta * 0.0
                } else {
                    inner(source, target)
                }
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn force_on(&self, source: &Particle, target: &Particle) -> Vector {
        (self.function)(source, target)
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction").field("name", &self.name).finish()
    }
}

/// A named single-particle force field.
#[derive(Clone)]
pub struct ExternalForce {
    name: String,
    function: Arc<FieldForceFn>,
}

impl ExternalForce {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Particle) -> Vector + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    /// `-m·g` along the last axis.
    pub fn uniform_gravity(g: f64) -> Self {
        Self::new(format!("uniform-gravity(g={g})"), move |target: &Particle| {
            uniform_gravity_force(target.position(), target.mass(), g)
        })
    }

    /// Short-range repulsion from the faces of the box `[lower, upper]`.
    pub fn walls(lower: Vector, upper: Vector, epsilon: f64, sigma: f64) -> Self {
        Self::new(
            format!("walls(epsilon={epsilon}, sigma={sigma})"),
            move |target: &Particle| wall_force(target.position(), &lower, &upper, epsilon, sigma),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn force_on(&self, target: &Particle) -> Vector {
        (self.function)(target)
    }
}

impl fmt::Debug for ExternalForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalForce")
            .field("name", &self.name)
            .finish()
    }
}
