//! # Core Module
//!
//! Stateless building blocks shared by every universe kind.
//!
//! ## Architecture
//!
//! - **Geometry** ([`math`]) - The fixed-dimension [`math::vector::Vector`] used for positions,
//!   velocities and forces.
//! - **Particles** ([`models`]) - [`models::particle::Particle`] with its force accumulators and
//!   mutation primitives, plus the arena handle type used by the engine.
//! - **Forces** ([`forcefield`]) - Force kernels and the interaction/external-force wrappers.
//!
//! Nothing here knows about time stepping, bounds or cells; that lives in the engine.

pub mod forcefield;
pub mod math;
pub mod models;
