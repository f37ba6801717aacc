use thiserror::Error;

use super::config::ConfigError;
use crate::core::math::vector::{Vector, VectorError};
use crate::core::models::ids::ParticleKey;
use crate::core::models::particle::ParticleError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid bounds: upper {upper} must be strictly greater than lower {lower} on every axis")]
    InvalidBounds { lower: Vector, upper: Vector },

    #[error("Position {position} lies outside the domain [{lower}, {upper}]")]
    OutOfDomain {
        position: Vector,
        lower: Vector,
        upper: Vector,
    },

    #[error("Position {position} does not belong to any interior cell")]
    OutOfGrid { position: Vector },

    #[error("Cell references particle {0:?}, which is no longer in the universe")]
    UnknownParticle(ParticleKey),

    #[error("Cell grid construction failed: {0}")]
    GridConstruction(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Numerical divergence: {0}")]
    NumericalDivergence(String),

    #[error("Particle operation failed: {source}")]
    Particle {
        #[from]
        source: ParticleError,
    },

    #[error("Vector operation failed: {source}")]
    Vector {
        #[from]
        source: VectorError,
    },

    #[error("Configuration build failed: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}
