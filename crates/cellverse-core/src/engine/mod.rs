//! # Engine Module
//!
//! Stateful simulation: universes, boundaries, the cell grid and the time integrator.
//!
//! ## Architecture
//!
//! - **Universes** ([`universe`], [`finite`], [`gridded`]) - An unbounded [`universe::Universe`]
//!   with the all-pairs force pass; a [`finite::FiniteUniverse`] that owns a universe plus a
//!   [`domain::Domain`] and a [`boundary::BoundaryPolicy`]; a [`gridded::GriddedUniverse`] that
//!   owns a finite universe plus a [`grid::CellGrid`] and replaces the all-pairs pass with a
//!   cell-local one.
//! - **Spatial Grid** ([`grid`]) - Interior and periodic ghost cells addressed by index, rebuilt
//!   every step.
//! - **Integration** ([`integrator`]) - The [`integrator::Simulation`] capability and the
//!   Störmer-Verlet step loop with the kinetic-energy clamp.
//! - **Configuration** ([`config`]) - Builder-validated run parameters.
//! - **Observation** ([`progress`], [`recorder`]) - Progress events and per-step snapshots for
//!   external consumers.
//! - **Error Handling** ([`error`]) - The umbrella [`error::EngineError`].
//!
//! Composition replaces inheritance: each universe kind wraps the previous one and
//! implements [`integrator::Simulation`] by delegating what it does not change.

pub mod boundary;
pub mod config;
pub mod domain;
pub mod error;
pub mod finite;
pub mod grid;
pub mod gridded;
pub mod integrator;
pub mod progress;
pub mod recorder;
pub mod universe;
