//! # Workflows Module
//!
//! High-level entry points that tie the `engine` and `core` layers together.
//!
//! - **Simulation Workflow** ([`simulate`]) - Builds an unbounded, finite or gridded universe
//!   from a [`crate::engine::config::SimulationConfig`], registers its forces, seeds particles
//!   and lattices, then runs the Störmer-Verlet loop.

pub mod simulate;
