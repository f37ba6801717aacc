use super::boundary::BoundaryPolicy;
use super::domain::Domain;
use super::error::EngineError;
use super::integrator::Simulation;
use super::universe::Universe;
use crate::core::forcefield::interaction::ExternalForce;
use crate::core::math::vector::Vector;
use crate::core::models::ids::ParticleKey;
use std::fmt;
use tracing::info;

/// A universe confined to a box, with a policy for particles that leave it.
#[derive(Debug, Clone)]
pub struct FiniteUniverse {
    universe: Universe,
    domain: Domain,
    policy: BoundaryPolicy,
    walls: Option<ExternalForce>,
}

impl FiniteUniverse {
    pub fn new(lower: Vector, upper: Vector) -> Result<Self, EngineError> {
        let domain = Domain::new(lower, upper)?;
        let universe = Universe::new(domain.dimension())?;
        info!(%domain, "Creating finite universe.");
        Ok(Self {
            universe,
            domain,
            policy: BoundaryPolicy::default(),
            walls: None,
        })
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn boundary_policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn walls(&self) -> Option<&ExternalForce> {
        self.walls.as_ref()
    }

    /// # Errors
    ///
    /// [`EngineError::NotImplemented`] for [`BoundaryPolicy::Periodic`]: wrap-around
    /// forces need the ghost cells of a gridded universe.
    pub fn set_boundary_policy(&mut self, policy: BoundaryPolicy) -> Result<(), EngineError> {
        if policy == BoundaryPolicy::Periodic {
            return Err(EngineError::NotImplemented(
                "periodic boundaries require a gridded universe",
            ));
        }
        self.set_boundary_policy_unchecked(policy);
        Ok(())
    }

    pub(crate) fn set_boundary_policy_unchecked(&mut self, policy: BoundaryPolicy) {
        if policy != BoundaryPolicy::Reflect {
            self.walls = None;
        }
        self.policy = policy;
    }

    /// Switches to reflection and adds a short-range repulsion from every face.
    pub fn enable_reflective_walls(&mut self, epsilon: f64, sigma: f64) -> Result<(), EngineError> {
        if !(epsilon > 0.0 && sigma > 0.0) {
            return Err(EngineError::Configuration(format!(
                "wall epsilon and sigma must be positive, got {epsilon} and {sigma}"
            )));
        }
        self.policy = BoundaryPolicy::Reflect;
        self.walls = Some(ExternalForce::walls(
            *self.domain.lower(),
            *self.domain.upper(),
            epsilon,
            sigma,
        ));
        Ok(())
    }

    /// # Errors
    ///
    /// [`EngineError::OutOfDomain`] if `position` is outside the domain.
    pub fn add_particle(
        &mut self,
        position: Vector,
        velocity: Vector,
        mass: f64,
        name: Option<String>,
    ) -> Result<ParticleKey, EngineError> {
        if !self.domain.contains(&position)? {
            return Err(EngineError::OutOfDomain {
                position,
                lower: *self.domain.lower(),
                upper: *self.domain.upper(),
            });
        }
        self.universe.add_particle(position, velocity, mass, name)
    }

    pub fn apply_boundary(&mut self) -> Result<usize, EngineError> {
        self.policy.apply(&self.domain, &mut self.universe)
    }

    /// Zeroes forces and applies every single-particle field, walls included.
    pub(crate) fn apply_field_forces(&mut self) -> Result<(), EngineError> {
        self.universe.reset_forces();
        self.universe.apply_external_forces()?;
        if let Some(walls) = &self.walls {
            self.universe.apply_field(walls)?;
        }
        Ok(())
    }
}

impl Simulation for FiniteUniverse {
    fn universe(&self) -> &Universe {
        &self.universe
    }

    fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }

    fn bounds(&self) -> Option<(Vector, Vector)> {
        Some((*self.domain.lower(), *self.domain.upper()))
    }

    fn update_forces(&mut self) -> Result<(), EngineError> {
        self.apply_field_forces()?;
        self.universe.apply_pairwise_interactions()
    }

    fn update_positions(&mut self, dt: f64) -> Result<(), EngineError> {
        self.universe.verlet_position_step(dt)?;
        self.apply_boundary()?;
        Ok(())
    }
}

impl fmt::Display for FiniteUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.universe)?;
        writeln!(f, "    domain = {}", self.domain)?;
        write!(f, "    boundary = {}", self.policy)?;
        if let Some(walls) = &self.walls {
            write!(f, " with {}", walls.name())?;
        }
        Ok(())
    }
}
