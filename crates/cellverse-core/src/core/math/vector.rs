use nalgebra::Vector3;
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};
use thiserror::Error;

/// Largest number of coordinates a [`Vector`] can carry.
pub const MAX_DIMENSION: usize = 3;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VectorError {
    #[error("Unsupported dimension {0}: only 1, 2 and 3 coordinates are allowed")]
    UnsupportedDimension(usize),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Axis {axis} is out of range for a vector of dimension {dimension}")]
    AxisOutOfRange { axis: usize, dimension: usize },
}

/// A real-valued coordinate tuple of fixed dimension (1, 2 or 3).
///
/// Storage is a `nalgebra::Vector3<f64>`; axes beyond `dimension` are kept at
/// zero so that norms and component-wise operations on the backing vector are
/// exact for every dimension. The dimension is chosen at construction and never
/// changes afterwards.
///
/// The arithmetic operators panic when the operands have different dimensions,
/// like nalgebra's dynamically sized matrices do. Callers that cannot guarantee
/// matching dimensions validate first with [`Vector::ensure_same_dimension`] or
/// use the fallible helpers ([`min`], [`max`], [`Vector::is_in_bounds`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    dimension: usize,
    data: Vector3<f64>,
}

impl Vector {
    /// Creates the zero vector of the given dimension.
    pub fn zeros(dimension: usize) -> Result<Self, VectorError> {
        check_dimension(dimension)?;
        Ok(Self {
            dimension,
            data: Vector3::zeros(),
        })
    }

    /// Creates a vector from its coordinates; the slice length is the dimension.
    pub fn from_slice(coords: &[f64]) -> Result<Self, VectorError> {
        check_dimension(coords.len())?;
        let mut data = Vector3::zeros();
        for (slot, value) in data.iter_mut().zip(coords) {
            *slot = *value;
        }
        Ok(Self {
            dimension: coords.len(),
            data,
        })
    }

    pub fn new1(x: f64) -> Self {
        Self {
            dimension: 1,
            data: Vector3::new(x, 0.0, 0.0),
        }
    }

    pub fn new2(x: f64, y: f64) -> Self {
        Self {
            dimension: 2,
            data: Vector3::new(x, y, 0.0),
        }
    }

    pub fn new3(x: f64, y: f64, z: f64) -> Self {
        Self {
            dimension: 3,
            data: Vector3::new(x, y, z),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data.as_slice()[..self.dimension]
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }

    pub fn get(&self, axis: usize) -> Option<f64> {
        self.as_slice().get(axis).copied()
    }

    pub fn set(&mut self, axis: usize, value: f64) -> Result<(), VectorError> {
        self.check_axis(axis)?;
        self.data[axis] = value;
        Ok(())
    }

    pub fn check_axis(&self, axis: usize) -> Result<(), VectorError> {
        if axis < self.dimension {
            Ok(())
        } else {
            Err(VectorError::AxisOutOfRange {
                axis,
                dimension: self.dimension,
            })
        }
    }

    pub fn ensure_same_dimension(&self, other: &Vector) -> Result<(), VectorError> {
        if self.dimension == other.dimension {
            Ok(())
        } else {
            Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                found: other.dimension,
            })
        }
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        self.data.norm()
    }

    #[inline]
    pub fn norm_squared(&self) -> f64 {
        self.data.norm_squared()
    }

    /// Whether every coordinate lies in the closed interval `[lower[i], upper[i]]`.
    pub fn is_in_bounds(&self, lower: &Vector, upper: &Vector) -> Result<bool, VectorError> {
        self.ensure_same_dimension(lower)?;
        self.ensure_same_dimension(upper)?;
        Ok(self
            .iter()
            .zip(lower.iter().zip(upper.iter()))
            .all(|(x, (lo, hi))| x >= lo && x <= hi))
    }

    /// Whether every coordinate is strictly greater than the matching one in `other`.
    pub fn all_greater_than(&self, other: &Vector) -> Result<bool, VectorError> {
        self.ensure_same_dimension(other)?;
        Ok(self.iter().zip(other.iter()).all(|(a, b)| a > b))
    }

    /// Sets every coordinate back to zero, keeping the dimension.
    pub fn set_zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn is_finite(&self) -> bool {
        self.iter().all(f64::is_finite)
    }

    #[inline]
    fn assert_same_dimension(&self, other: &Vector) {
        assert_eq!(
            self.dimension, other.dimension,
            "vector dimension mismatch: {} vs {}",
            self.dimension, other.dimension
        );
    }
}

fn check_dimension(dimension: usize) -> Result<(), VectorError> {
    if (1..=MAX_DIMENSION).contains(&dimension) {
        Ok(())
    } else {
        Err(VectorError::UnsupportedDimension(dimension))
    }
}

/// Component-wise minimum of two vectors of equal dimension.
pub fn min(a: &Vector, b: &Vector) -> Result<Vector, VectorError> {
    a.ensure_same_dimension(b)?;
    Ok(Vector {
        dimension: a.dimension,
        data: a.data.inf(&b.data),
    })
}

/// Component-wise maximum of two vectors of equal dimension.
pub fn max(a: &Vector, b: &Vector) -> Result<Vector, VectorError> {
    a.ensure_same_dimension(b)?;
    Ok(Vector {
        dimension: a.dimension,
        data: a.data.sup(&b.data),
    })
}

impl Index<usize> for Vector {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        &self.as_slice()[axis]
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, axis: usize) -> &mut f64 {
        assert!(
            axis < self.dimension,
            "axis {axis} out of range for dimension {}",
            self.dimension
        );
        &mut self.data[axis]
    }
}

impl AddAssign<&Vector> for Vector {
    fn add_assign(&mut self, rhs: &Vector) {
        self.assert_same_dimension(rhs);
        self.data += rhs.data;
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        *self += &rhs;
    }
}

impl SubAssign<&Vector> for Vector {
    fn sub_assign(&mut self, rhs: &Vector) {
        self.assert_same_dimension(rhs);
        self.data -= rhs.data;
    }
}

impl SubAssign for Vector {
    fn sub_assign(&mut self, rhs: Vector) {
        *self -= &rhs;
    }
}

impl MulAssign<f64> for Vector {
    fn mul_assign(&mut self, scalar: f64) {
        self.data *= scalar;
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(mut self, rhs: Vector) -> Vector {
        self += &rhs;
        self
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(mut self, rhs: Vector) -> Vector {
        self -= &rhs;
        self
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(mut self, scalar: f64) -> Vector {
        self *= scalar;
        self
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        self * -1.0
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn zeros_rejects_unsupported_dimensions() {
        assert_eq!(Vector::zeros(0), Err(VectorError::UnsupportedDimension(0)));
        assert_eq!(Vector::zeros(4), Err(VectorError::UnsupportedDimension(4)));
        assert_eq!(Vector::zeros(2).unwrap().dimension(), 2);
    }

    #[test]
    fn from_slice_keeps_coordinates_and_dimension() {
        let v = Vector::from_slice(&[1.0, -2.0]).unwrap();
        assert_eq!(v.dimension(), 2);
        assert_eq!(v.as_slice(), &[1.0, -2.0]);
        assert_eq!(v.get(2), None);
    }

    #[test]
    fn in_place_arithmetic_is_element_wise() {
        let mut v = Vector::new3(1.0, 2.0, 3.0);
        v += &Vector::new3(1.0, 1.0, 1.0);
        v -= &Vector::new3(0.5, 0.0, 2.0);
        v *= 2.0;
        assert_eq!(v, Vector::new3(3.0, 6.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn adding_vectors_of_different_dimensions_panics() {
        let mut v = Vector::new2(1.0, 2.0);
        v += &Vector::new3(1.0, 2.0, 3.0);
    }

    #[test]
    fn norm_ignores_unused_axes() {
        assert!((Vector::new2(3.0, 4.0).norm() - 5.0).abs() < TOLERANCE);
        assert!((Vector::new1(-2.0).norm() - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn min_and_max_bracket_both_operands_on_every_axis() {
        let pairs = [
            (Vector::new3(1.0, -5.0, 2.5), Vector::new3(0.0, 3.0, 2.5)),
            (Vector::new2(-1.0, 7.0), Vector::new2(4.0, -7.0)),
            (Vector::new1(0.1), Vector::new1(-0.1)),
        ];
        for (a, b) in pairs {
            let lo = min(&a, &b).unwrap();
            let hi = max(&a, &b).unwrap();
            for axis in 0..a.dimension() {
                assert!(lo[axis] <= a[axis] && lo[axis] <= b[axis]);
                assert!(a[axis] <= hi[axis] && b[axis] <= hi[axis]);
            }
        }
    }

    #[test]
    fn min_fails_on_dimension_mismatch() {
        let result = min(&Vector::new1(1.0), &Vector::new2(1.0, 2.0));
        assert_eq!(
            result,
            Err(VectorError::DimensionMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn is_in_bounds_uses_closed_intervals() {
        let lower = Vector::new2(0.0, 0.0);
        let upper = Vector::new2(10.0, 5.0);
        assert!(Vector::new2(10.0, 0.0).is_in_bounds(&lower, &upper).unwrap());
        assert!(!Vector::new2(10.0001, 1.0).is_in_bounds(&lower, &upper).unwrap());
        assert!(!Vector::new2(1.0, -0.1).is_in_bounds(&lower, &upper).unwrap());
    }

    #[test]
    fn all_greater_than_is_strict() {
        let a = Vector::new2(1.0, 2.0);
        assert!(a.all_greater_than(&Vector::new2(0.0, 1.0)).unwrap());
        assert!(!a.all_greater_than(&Vector::new2(1.0, 1.0)).unwrap());
    }

    #[test]
    fn set_rejects_axis_beyond_dimension() {
        let mut v = Vector::new2(0.0, 0.0);
        assert!(v.set(1, 4.0).is_ok());
        assert_eq!(
            v.set(2, 1.0),
            Err(VectorError::AxisOutOfRange {
                axis: 2,
                dimension: 2
            })
        );
        assert_eq!(v, Vector::new2(0.0, 4.0));
    }

    #[test]
    fn display_lists_coordinates() {
        assert_eq!(Vector::new3(1.0, 2.5, -3.0).to_string(), "(1, 2.5, -3)");
    }
}
