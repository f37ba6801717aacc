//! # Force Field Module
//!
//! Force kernels and the callable wrappers the engine invokes uniformly.
//!
//! ## Key Components
//!
//! - [`potentials`] - Pure force kernels on positions and masses: Newtonian gravity,
//!   12-6 Lennard-Jones, a uniform field along the last axis and the reflective-wall
//!   repulsion.
//! - [`interaction`] - [`interaction::Interaction`] (pairwise, source acts on target)
//!   and [`interaction::ExternalForce`] (single-particle field). Both are cheap to clone
//!   and can be shared across threads; the engine never inspects what they compute.
//!
//! ## Usage
//!
//! ```ignore
//! use cellverse::core::forcefield::interaction::Interaction;
//!
//! let lj = Interaction::lennard_jones(5.0, 1.0).with_cutoff(2.5);
//! let force_on_b = lj.force_on(&a, &b);
//! ```

pub mod interaction;
pub mod potentials;
