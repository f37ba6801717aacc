//! Uniform cell decomposition of a bounded domain.
//!
//! The grid owns every cell. Interior cells are stored with axis 0 varying
//! fastest, so the cell at coordinates `c` lives at index `Σ c[i]·m[i]` where
//! `m[0] = 1` and `m[i] = m[i-1]·count[i-1]`. Ghost cells exist only while a
//! periodic boundary is active and always refer to interior cells by index.

pub mod cell;

use self::cell::{CellCoords, GhostCell, InternCell, SpatialCell};
use super::domain::Domain;
use super::error::EngineError;
use super::universe::Universe;
use crate::core::forcefield::interaction::Interaction;
use crate::core::math::vector::Vector;
use crate::core::models::ids::ParticleKey;
use crate::core::models::particle::Particle;
use itertools::Itertools;
use slotmap::SlotMap;
use std::fmt;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Upper limit on interior plus ghost cells.
pub const MAX_CELLS: usize = 1 << 24;

/// Periodic images are only unambiguous when no cell neighbours its own image.
pub const MIN_PERIODIC_CELLS_PER_AXIS: usize = 3;

/// Relative slack when deciding whether an extent is a whole number of cells.
const CELL_FIT_TOLERANCE: f64 = 1e-9;

/// Number of cells of `cell_side` needed to cover `extent`.
///
/// Ratios within [`CELL_FIT_TOLERANCE`] of an integer snap to it, so that
/// `10 / (10 / 3)` gives three cells rather than four.
fn cells_along(extent: f64, cell_side: f64) -> usize {
    let ratio = extent / cell_side;
    let count = if fits_whole_cells(extent, cell_side) {
        ratio.round()
    } else {
        ratio.ceil()
    };
    (count as usize).max(1)
}

fn fits_whole_cells(extent: f64, cell_side: f64) -> bool {
    let ratio = extent / cell_side;
    (ratio - ratio.round()).abs() <= CELL_FIT_TOLERANCE * ratio.max(1.0)
}

type Contributions = Vec<(ParticleKey, Vector)>;

#[derive(Debug, Clone)]
pub struct CellGrid {
    lower: Vector,
    upper: Vector,
    extent: Vector,
    cell_side: f64,
    counts: Vec<usize>,
    multipliers: Vec<usize>,
    intern: Vec<InternCell>,
    ghosts: Vec<GhostCell>,
    binned: usize,
}

impl CellGrid {
    /// Builds the interior cells of `domain` and links Chebyshev neighbours.
    ///
    /// Each axis gets `ceil(extent / cell_side)` cells (at least one).
    /// Periodic boundaries additionally require the ratio to be whole, see
    /// [`CellGrid::build_ghost_layer`].
    pub fn new(domain: &Domain, cell_side: f64) -> Result<Self, EngineError> {
        if !(cell_side > 0.0 && cell_side.is_finite()) {
            return Err(EngineError::Configuration(format!(
                "cell side must be positive and finite, got {cell_side}"
            )));
        }

        let counts: Vec<usize> = domain
            .extent()
            .iter()
            .map(|extent| cells_along(extent, cell_side))
            .collect();
        let total = counts
            .iter()
            .try_fold(1usize, |acc, &count| acc.checked_mul(count))
            .filter(|&total| total <= MAX_CELLS)
            .ok_or_else(|| {
                EngineError::GridConstruction(format!(
                    "{counts:?} cells per axis exceeds the limit of {MAX_CELLS} cells"
                ))
            })?;
        let multipliers: Vec<usize> = counts
            .iter()
            .scan(1usize, |acc, &count| {
                let multiplier = *acc;
                *acc *= count;
                Some(multiplier)
            })
            .collect();

        let mut grid = Self {
            lower: *domain.lower(),
            upper: *domain.upper(),
            extent: *domain.extent(),
            cell_side,
            counts,
            multipliers,
            intern: Vec::with_capacity(total),
            ghosts: Vec::new(),
            binned: 0,
        };
        grid.create_intern_cells(total)?;
        grid.link_intern_neighbours();

        info!(
            cells_per_axis = ?grid.counts,
            cell_side,
            cells = grid.intern.len(),
            "Built cell grid."
        );
        Ok(grid)
    }

    fn create_intern_cells(&mut self, total: usize) -> Result<(), EngineError> {
        for index in 0..total {
            let coords = self.coords_of_index(index);
            if self.index_of(coords.as_slice()) != Some(index) {
                return Err(EngineError::GridConstruction(format!(
                    "interior cell {coords} does not map back to index {index}"
                )));
            }
            self.intern.push(InternCell::new(coords));
        }
        Ok(())
    }

    fn link_intern_neighbours(&mut self) {
        let links: Vec<Vec<usize>> = self
            .intern
            .iter()
            .map(|cell| self.intern_cells_around(cell.coords(), false))
            .collect();
        for (cell, neighbours) in self.intern.iter_mut().zip(links) {
            for neighbour in neighbours {
                cell.add_neighbour(neighbour);
            }
        }
    }

    /// Interior cells within Chebyshev distance 1 of `coords`.
    fn intern_cells_around(&self, coords: &CellCoords, include_self: bool) -> Vec<usize> {
        let dimension = coords.dimension();
        (0..dimension)
            .map(|_| -1i64..=1)
            .multi_cartesian_product()
            .filter(|offset| include_self || offset.iter().any(|&d| d != 0))
            .filter_map(|offset| {
                let candidate: Vec<i64> = coords
                    .as_slice()
                    .iter()
                    .zip(&offset)
                    .map(|(c, d)| c + d)
                    .collect();
                self.index_of(&candidate)
            })
            .collect()
    }

    fn coords_of_index(&self, index: usize) -> CellCoords {
        let values: Vec<i64> = self
            .counts
            .iter()
            .zip(&self.multipliers)
            .map(|(&count, &multiplier)| ((index / multiplier) % count) as i64)
            .collect();
        CellCoords::from_slice(&values)
    }

    /// Index of the interior cell at `coords`, or `None` when outside the grid.
    pub fn index_of(&self, coords: &[i64]) -> Option<usize> {
        if coords.len() != self.counts.len() {
            return None;
        }
        coords
            .iter()
            .zip(&self.counts)
            .zip(&self.multipliers)
            .try_fold(0usize, |index, ((&c, &count), &multiplier)| {
                (c >= 0 && (c as usize) < count).then(|| index + c as usize * multiplier)
            })
    }

    /// Creates the periodic ghost layer: one ghost for every coordinate in
    /// `[-1, count]` per axis that falls outside the grid on at least one axis.
    ///
    /// Does nothing if the layer already exists.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] if an axis has fewer than
    /// [`MIN_PERIODIC_CELLS_PER_AXIS`] cells or is not a whole number of cells
    /// long (its last cell would be narrower than the others, and pairs
    /// reaching across the face from the second-to-last cell would be lost),
    /// and [`EngineError::GridConstruction`]
    /// if a ghost ends up with a degenerate offset or neighbour set.
    pub fn build_ghost_layer(&mut self) -> Result<(), EngineError> {
        if !self.ghosts.is_empty() {
            return Ok(());
        }
        if self.counts.iter().any(|&c| c < MIN_PERIODIC_CELLS_PER_AXIS) {
            return Err(EngineError::Configuration(format!(
                "periodic boundaries need at least {MIN_PERIODIC_CELLS_PER_AXIS} cells per axis, got {:?}",
                self.counts
            )));
        }
        if let Some(axis) = (0..self.counts.len())
            .find(|&axis| !fits_whole_cells(self.extent[axis], self.cell_side))
        {
            return Err(EngineError::Configuration(format!(
                "periodic boundaries need whole cells: axis {axis} spans {} which is not a multiple of the cell side {}",
                self.extent[axis], self.cell_side
            )));
        }
        let expanded = self
            .counts
            .iter()
            .try_fold(1usize, |acc, &count| acc.checked_mul(count + 2))
            .filter(|&total| total <= MAX_CELLS)
            .ok_or_else(|| {
                EngineError::GridConstruction("ghost layer exceeds the cell limit".to_string())
            })?;

        let mut ghosts = Vec::with_capacity(expanded - self.intern.len());
        for values in self
            .counts
            .iter()
            .map(|&count| -1i64..=count as i64)
            .multi_cartesian_product()
        {
            if self.index_of(&values).is_some() {
                continue;
            }
            ghosts.push(self.create_ghost(CellCoords::from_slice(&values))?);
        }

        debug!(ghosts = ghosts.len(), "Built periodic ghost layer.");
        self.ghosts = ghosts;
        Ok(())
    }

    fn create_ghost(&self, coords: CellCoords) -> Result<GhostCell, EngineError> {
        let mut source = Vec::with_capacity(coords.dimension());
        let mut offset = self.extent;
        offset.set_zero();
        for (axis, (&c, &count)) in coords.as_slice().iter().zip(&self.counts).enumerate() {
            let count = count as i64;
            if c == -1 {
                source.push(count - 1);
                offset[axis] = -self.extent[axis];
            } else if c == count {
                source.push(0);
                offset[axis] = self.extent[axis];
            } else if (0..count).contains(&c) {
                source.push(c);
            } else {
                return Err(EngineError::GridConstruction(format!(
                    "ghost cell {coords} lies more than one cell outside the grid"
                )));
            }
        }
        if offset.norm_squared() == 0.0 {
            return Err(EngineError::GridConstruction(format!(
                "ghost cell {coords} has a zero offset"
            )));
        }
        let source_index = self.index_of(&source).ok_or_else(|| {
            EngineError::GridConstruction(format!("ghost cell {coords} has no source cell"))
        })?;

        let neighbours = self.intern_cells_around(&coords, true);
        if neighbours.is_empty() || neighbours.len() >= self.intern.len() {
            return Err(EngineError::GridConstruction(format!(
                "ghost cell {coords} has {} interior neighbours out of {}",
                neighbours.len(),
                self.intern.len()
            )));
        }

        let mut ghost = GhostCell::new(coords, source_index, offset);
        for neighbour in neighbours {
            ghost.add_neighbour(neighbour);
        }
        Ok(ghost)
    }

    pub fn drop_ghost_layer(&mut self) {
        self.ghosts.clear();
    }

    pub fn has_ghost_layer(&self) -> bool {
        !self.ghosts.is_empty()
    }

    pub fn cells_per_axis(&self) -> &[usize] {
        &self.counts
    }

    pub fn cell_side(&self) -> f64 {
        self.cell_side
    }

    pub fn intern_cells(&self) -> &[InternCell] {
        &self.intern
    }

    pub fn ghost_cells(&self) -> &[GhostCell] {
        &self.ghosts
    }

    pub fn intern_cell_count(&self) -> usize {
        self.intern.len()
    }

    pub fn ghost_cell_count(&self) -> usize {
        self.ghosts.len()
    }

    /// Coordinates of the interior cell containing `position`.
    ///
    /// A position on the upper face belongs to the last cell of that axis.
    pub fn cell_coords_of(&self, position: &Vector) -> Result<CellCoords, EngineError> {
        if position.dimension() != self.counts.len() {
            return Err(EngineError::OutOfGrid {
                position: *position,
            });
        }
        let mut values = Vec::with_capacity(self.counts.len());
        for (axis, &count) in self.counts.iter().enumerate() {
            let x = position[axis];
            if !(x >= self.lower[axis] && x <= self.upper[axis]) {
                return Err(EngineError::OutOfGrid {
                    position: *position,
                });
            }
            let c = ((x - self.lower[axis]) / self.cell_side).floor() as i64;
            values.push(c.min(count as i64 - 1));
        }
        Ok(CellCoords::from_slice(&values))
    }

    pub fn cell_index_of(&self, position: &Vector) -> Result<usize, EngineError> {
        let coords = self.cell_coords_of(position)?;
        self.index_of(coords.as_slice())
            .ok_or(EngineError::OutOfGrid {
                position: *position,
            })
    }

    /// Empties every cell, ghosts included.
    pub fn clear(&mut self) {
        self.intern.iter_mut().for_each(SpatialCell::clear);
        self.ghosts.iter_mut().for_each(SpatialCell::clear);
        self.binned = 0;
    }

    /// Number of particles currently held by interior cells.
    pub fn binned_particle_count(&self) -> usize {
        self.binned
    }

    /// Bins every live particle of `universe`, then refreshes ghost copies.
    pub fn fill(&mut self, universe: &Universe) -> Result<(), EngineError> {
        for (key, particle) in universe.iter() {
            let index = self.cell_index_of(particle.position())?;
            self.intern[index].insert(key);
            self.binned += 1;
        }
        for ghost in &mut self.ghosts {
            for &key in self.intern[ghost.source()].particles() {
                let particle = universe
                    .particle(key)
                    .ok_or(EngineError::UnknownParticle(key))?;
                ghost.insert_copy(key, particle);
            }
        }
        Ok(())
    }

    pub fn rebuild(&mut self, universe: &Universe) -> Result<(), EngineError> {
        self.clear();
        self.fill(universe)
    }

    /// Adds the pairwise interaction forces of `universe` using cell locality.
    ///
    /// Every target particle receives the force of all other particles in its own
    /// cell and in the neighbouring cells, plus the force of the ghost copies next
    /// to its cell. Forces are gathered per cell from frozen positions first and
    /// only then added to the particles. Membership must be current.
    pub fn accumulate_forces(&self, universe: &mut Universe) -> Result<(), EngineError> {
        if universe.interactions().is_empty() {
            return Ok(());
        }
        let contributions = {
            let particles = universe.arena();
            let interactions = universe.interactions();
            let mut contributions = self.gather_intern_forces(particles, interactions)?;
            contributions.extend(self.gather_ghost_forces(particles, interactions)?);
            contributions
        };
        for (key, force) in contributions {
            universe
                .particle_mut(key)
                .ok_or(EngineError::UnknownParticle(key))?
                .add_to_force(&force)?;
        }
        Ok(())
    }

    fn gather_intern_forces(
        &self,
        particles: &SlotMap<ParticleKey, Particle>,
        interactions: &[Interaction],
    ) -> Result<Contributions, EngineError> {
        #[cfg(not(feature = "parallel"))]
        let iterator = self.intern.iter();

        #[cfg(feature = "parallel")]
        let iterator = self.intern.par_iter();

        let per_cell = iterator
            .map(|cell| self.intern_cell_forces(cell, particles, interactions))
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(per_cell.into_iter().flatten().collect())
    }

    fn gather_ghost_forces(
        &self,
        particles: &SlotMap<ParticleKey, Particle>,
        interactions: &[Interaction],
    ) -> Result<Contributions, EngineError> {
        #[cfg(not(feature = "parallel"))]
        let iterator = self.ghosts.iter();

        #[cfg(feature = "parallel")]
        let iterator = self.ghosts.par_iter();

        let per_cell = iterator
            .map(|ghost| self.ghost_cell_forces(ghost, particles, interactions))
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(per_cell.into_iter().flatten().collect())
    }

    fn intern_cell_forces(
        &self,
        cell: &InternCell,
        particles: &SlotMap<ParticleKey, Particle>,
        interactions: &[Interaction],
    ) -> Result<Contributions, EngineError> {
        let mut contributions = Vec::with_capacity(cell.len());
        for &target_key in cell.particles() {
            let target = lookup(particles, target_key)?;
            let mut total = Vector::zeros(target.dimension())?;
            let sources = cell.particles().iter().chain(
                cell.neighbours()
                    .iter()
                    .flat_map(|&n| self.intern[n].particles()),
            );
            for &source_key in sources {
                if source_key == target_key {
                    continue;
                }
                let source = lookup(particles, source_key)?;
                total += &target.interaction_force_from(source, interactions)?;
            }
            contributions.push((target_key, total));
        }
        Ok(contributions)
    }

    fn ghost_cell_forces(
        &self,
        ghost: &GhostCell,
        particles: &SlotMap<ParticleKey, Particle>,
        interactions: &[Interaction],
    ) -> Result<Contributions, EngineError> {
        let mut contributions = Vec::new();
        if ghost.is_empty() {
            return Ok(contributions);
        }
        for &neighbour in ghost.neighbours() {
            for &target_key in self.intern[neighbour].particles() {
                let target = lookup(particles, target_key)?;
                let mut total = Vector::zeros(target.dimension())?;
                // A particle never feels its own image.
                for copy in ghost.copies().iter().filter(|c| c.source != target_key) {
                    total += &target.interaction_force_from(&copy.particle, interactions)?;
                }
                contributions.push((target_key, total));
            }
        }
        Ok(contributions)
    }
}

fn lookup(
    particles: &SlotMap<ParticleKey, Particle>,
    key: ParticleKey,
) -> Result<&Particle, EngineError> {
    particles.get(key).ok_or(EngineError::UnknownParticle(key))
}

impl fmt::Display for CellGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    cell side = {}", self.cell_side)?;
        writeln!(f, "    cells per axis = {:?}", self.counts)?;
        write!(
            f,
            "    cells = {} interior, {} ghost",
            self.intern.len(),
            self.ghosts.len()
        )
    }
}
