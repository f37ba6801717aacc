//! # Cellverse Core Library
//!
//! Point-particle dynamics under pairwise interactions and external fields, advanced
//! with the Störmer-Verlet integrator, with a cell-grid interaction engine that brings
//! short-range force evaluation on bounded and periodic domains close to linear time.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: the fixed-dimension `Vector`,
//!   `Particle` with its force accumulators, and the force kernels wrapped as pluggable
//!   interactions and external fields.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: `Universe`, `FiniteUniverse` with its
//!   boundary policies, the `CellGrid` of interior and ghost cells, `GriddedUniverse`, and the
//!   Störmer-Verlet driver with its kinetic-energy clamp.
//!
//! - **[`workflows`]: The Public API.** One call that builds the right universe from a
//!   `SimulationConfig`, seeds it and runs the integration while reporting progress and
//!   handing per-step snapshots to a recorder.

pub mod core;
pub mod engine;
pub mod workflows;
