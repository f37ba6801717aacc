use crate::core::math::vector::{MAX_DIMENSION, Vector};
use crate::core::models::ids::ParticleKey;
use crate::core::models::particle::Particle;
use std::fmt;

/// Integer coordinates of a cell; ghost cells use `-1` and `count` on wrapped axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoords {
    dimension: usize,
    values: [i64; MAX_DIMENSION],
}

impl CellCoords {
    pub(crate) fn from_slice(values: &[i64]) -> Self {
        let mut coords = [0; MAX_DIMENSION];
        coords[..values.len()].copy_from_slice(values);
        Self {
            dimension: values.len(),
            values: coords,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.values[..self.dimension]
    }

    /// Largest per-axis difference.
    pub fn chebyshev_distance(&self, other: &CellCoords) -> i64 {
        self.as_slice()
            .iter()
            .zip(other.as_slice())
            .map(|(a, b)| (a - b).abs())
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for CellCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Shared behaviour of interior and ghost cells.
///
/// Neighbours are always interior cells, referenced by their index in the grid.
pub trait SpatialCell {
    fn coords(&self) -> &CellCoords;
    fn neighbours(&self) -> &[usize];
    fn add_neighbour(&mut self, intern_index: usize);
    fn clear(&mut self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A cell of the real grid; holds handles to the live particles it contains.
#[derive(Debug, Clone)]
pub struct InternCell {
    coords: CellCoords,
    neighbours: Vec<usize>,
    particles: Vec<ParticleKey>,
}

impl InternCell {
    pub(crate) fn new(coords: CellCoords) -> Self {
        Self {
            coords,
            neighbours: Vec::new(),
            particles: Vec::new(),
        }
    }

    pub fn particles(&self) -> &[ParticleKey] {
        &self.particles
    }

    pub(crate) fn insert(&mut self, key: ParticleKey) {
        self.particles.push(key);
    }
}

impl SpatialCell for InternCell {
    fn coords(&self) -> &CellCoords {
        &self.coords
    }

    fn neighbours(&self) -> &[usize] {
        &self.neighbours
    }

    fn add_neighbour(&mut self, intern_index: usize) {
        self.neighbours.push(intern_index);
    }

    fn clear(&mut self) {
        self.particles.clear();
    }

    fn len(&self) -> usize {
        self.particles.len()
    }
}

/// A translated copy of a live particle held by a ghost cell.
#[derive(Debug, Clone)]
pub struct GhostParticle {
    pub source: ParticleKey,
    pub particle: Particle,
}

/// A periodic image of one interior cell, sitting just outside the grid.
///
/// It owns copies of the source cell's particles shifted by `offset`, which is
/// `±extent` on every wrapped axis and zero elsewhere.
#[derive(Debug, Clone)]
pub struct GhostCell {
    coords: CellCoords,
    source: usize,
    offset: Vector,
    neighbours: Vec<usize>,
    copies: Vec<GhostParticle>,
}

impl GhostCell {
    pub(crate) fn new(coords: CellCoords, source: usize, offset: Vector) -> Self {
        Self {
            coords,
            source,
            offset,
            neighbours: Vec::new(),
            copies: Vec::new(),
        }
    }

    /// Index of the interior cell this ghost mirrors.
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn offset(&self) -> &Vector {
        &self.offset
    }

    pub fn copies(&self) -> &[GhostParticle] {
        &self.copies
    }

    pub(crate) fn insert_copy(&mut self, source: ParticleKey, particle: &Particle) {
        self.copies.push(GhostParticle {
            source,
            particle: particle.translated(&self.offset),
        });
    }
}

impl SpatialCell for GhostCell {
    fn coords(&self) -> &CellCoords {
        &self.coords
    }

    fn neighbours(&self) -> &[usize] {
        &self.neighbours
    }

    fn add_neighbour(&mut self, intern_index: usize) {
        self.neighbours.push(intern_index);
    }

    fn clear(&mut self) {
        self.copies.clear();
    }

    fn len(&self) -> usize {
        self.copies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_distance_is_largest_axis_difference() {
        let a = CellCoords::from_slice(&[0, 3, -1]);
        let b = CellCoords::from_slice(&[1, 1, -1]);
        assert_eq!(a.chebyshev_distance(&b), 2);
        assert_eq!(a.chebyshev_distance(&a), 0);
        assert_eq!(a.to_string(), "(0, 3, -1)");
    }

    #[test]
    fn ghost_copies_are_translated_by_offset_and_keep_source() {
        let mut ghost = GhostCell::new(CellCoords::from_slice(&[-1]), 3, Vector::new1(-10.0));
        let particle = Particle::new(4, "p", Vector::new1(9.5), Vector::new1(0.0), 1.0).unwrap();
        let key = ParticleKey::default();
        ghost.insert_copy(key, &particle);
        assert_eq!(ghost.len(), 1);
        assert_eq!(ghost.copies()[0].source, key);
        assert_eq!(*ghost.copies()[0].particle.position(), Vector::new1(-0.5));
        ghost.clear();
        assert!(ghost.is_empty());
    }
}
