//! # Core Models Module
//!
//! Data structures describing the simulated bodies.
//!
//! - [`particle`] - Physical state of a point particle and its force-accumulation primitives
//! - [`ids`] - Arena handles used to reference particles without owning them
//!
//! Particles are owned by a universe's arena and referenced everywhere else through
//! [`ids::ParticleKey`] handles, so spatial cells never alias the particles they bucket.

pub mod ids;
pub mod particle;
