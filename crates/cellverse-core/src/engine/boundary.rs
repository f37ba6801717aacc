use super::config::ConfigError;
use super::domain::Domain;
use super::error::EngineError;
use super::universe::Universe;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// What happens to a particle that leaves the domain during a position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoundaryPolicy {
    /// The particle is removed from the universe.
    #[default]
    Absorb,
    /// The coordinate is mirrored on the crossed face and that velocity component inverted.
    Reflect,
    /// The coordinate is translated back by the domain extent.
    Periodic,
}

impl BoundaryPolicy {
    /// Brings every particle of `universe` back into `domain` according to this policy.
    ///
    /// Returns how many particles were absorbed, reflected or wrapped.
    pub fn apply(self, domain: &Domain, universe: &mut Universe) -> Result<usize, EngineError> {
        let affected = match self {
            BoundaryPolicy::Absorb => absorb(domain, universe)?,
            BoundaryPolicy::Reflect => reflect(domain, universe)?,
            BoundaryPolicy::Periodic => wrap(domain, universe)?,
        };
        if affected > 0 {
            debug!(policy = %self, affected, "Applied boundary policy.");
        }
        Ok(affected)
    }
}

fn absorb(domain: &Domain, universe: &mut Universe) -> Result<usize, EngineError> {
    let mut escaped = Vec::new();
    for (key, particle) in universe.iter() {
        if !domain.contains(particle.position())? {
            escaped.push(key);
        }
    }
    Ok(universe.remove_particles(&escaped))
}

fn reflect(domain: &Domain, universe: &mut Universe) -> Result<usize, EngineError> {
    let mut affected = 0;
    for particle in universe.particles_mut() {
        let mut touched = false;
        for axis in 0..domain.dimension() {
            let x = particle.position()[axis];
            let (reflected, flipped) = domain.reflect(axis, x)?;
            if reflected != x {
                particle.set_position_coord(axis, reflected)?;
                touched = true;
            }
            if flipped {
                particle.invert_velocity_coord(axis)?;
            }
        }
        affected += usize::from(touched);
    }
    Ok(affected)
}

fn wrap(domain: &Domain, universe: &mut Universe) -> Result<usize, EngineError> {
    let (lower, upper) = (*domain.lower(), *domain.upper());
    let mut affected = 0;
    for particle in universe.particles_mut() {
        let mut touched = false;
        for axis in 0..domain.dimension() {
            let x = particle.position()[axis];
            if !x.is_finite() {
                return Err(EngineError::NumericalDivergence(format!(
                    "cannot wrap non-finite coordinate {x} on axis {axis}"
                )));
            }
            if x < lower[axis] || x > upper[axis] {
                particle.set_position_coord(axis, domain.wrap(axis, x))?;
                touched = true;
            }
        }
        affected += usize::from(touched);
    }
    Ok(affected)
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoundaryPolicy::Absorb => "absorb",
            BoundaryPolicy::Reflect => "reflect",
            BoundaryPolicy::Periodic => "periodic",
        };
        f.write_str(name)
    }
}

impl FromStr for BoundaryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absorb" => Ok(BoundaryPolicy::Absorb),
            "reflect" => Ok(BoundaryPolicy::Reflect),
            "periodic" => Ok(BoundaryPolicy::Periodic),
            other => Err(ConfigError::InvalidValue {
                parameter: "boundary",
                reason: format!("unknown boundary policy '{other}'"),
            }),
        }
    }
}
