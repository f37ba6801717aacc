use super::error::EngineError;
use crate::core::math::vector::{Vector, VectorError};
use std::fmt;

/// An axis-aligned box `[lower, upper]`, strictly non-degenerate on every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    lower: Vector,
    upper: Vector,
    extent: Vector,
}

impl Domain {
    pub fn new(lower: Vector, upper: Vector) -> Result<Self, EngineError> {
        lower.ensure_same_dimension(&upper)?;
        if !lower.is_finite() || !upper.is_finite() || !upper.all_greater_than(&lower)? {
            return Err(EngineError::InvalidBounds { lower, upper });
        }
        Ok(Self {
            lower,
            upper,
            extent: upper - lower,
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.lower.dimension()
    }

    pub fn lower(&self) -> &Vector {
        &self.lower
    }

    pub fn upper(&self) -> &Vector {
        &self.upper
    }

    /// `upper - lower`
    pub fn extent(&self) -> &Vector {
        &self.extent
    }

    /// Closed-interval membership on every axis.
    pub fn contains(&self, position: &Vector) -> Result<bool, VectorError> {
        position.is_in_bounds(&self.lower, &self.upper)
    }

    /// Maps `x` back into `[lower, upper)` on `axis` by periodic translation.
    pub fn wrap(&self, axis: usize, x: f64) -> f64 {
        let lower = self.lower[axis];
        lower + (x - lower).rem_euclid(self.extent[axis])
    }

    /// Folds `x` back into `[lower, upper]` on `axis` by mirroring on the faces.
    ///
    /// The result is the same as reflecting repeatedly on whichever face was
    /// crossed until the coordinate is back inside. The boolean reports whether an
    /// odd number of reflections happened, i.e. whether the velocity component
    /// must be inverted.
    pub fn reflect(&self, axis: usize, x: f64) -> Result<(f64, bool), EngineError> {
        if !x.is_finite() {
            return Err(EngineError::NumericalDivergence(format!(
                "cannot reflect non-finite coordinate {x} on axis {axis}"
            )));
        }
        let (lower, upper, extent) = (self.lower[axis], self.upper[axis], self.extent[axis]);
        if x >= lower && x <= upper {
            return Ok((x, false));
        }
        let folded = (x - lower).rem_euclid(2.0 * extent);
        if folded > extent {
            Ok((upper - (folded - extent), true))
        } else {
            Ok((lower + folded, false))
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn unit_box() -> Domain {
        Domain::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 5.0)).unwrap()
    }

    #[test]
    fn new_rejects_degenerate_or_inverted_bounds() {
        let flat = Domain::new(Vector::new2(0.0, 0.0), Vector::new2(1.0, 0.0));
        assert!(matches!(flat, Err(EngineError::InvalidBounds { .. })));
        let inverted = Domain::new(Vector::new1(1.0), Vector::new1(-1.0));
        assert!(matches!(inverted, Err(EngineError::InvalidBounds { .. })));
        let mixed = Domain::new(Vector::new1(0.0), Vector::new2(1.0, 1.0));
        assert!(matches!(mixed, Err(EngineError::Vector { .. })));
    }

    #[test]
    fn wrap_is_non_negative_relative_to_lower_bound() {
        let domain = Domain::new(Vector::new1(-5.0), Vector::new1(5.0)).unwrap();
        assert!((domain.wrap(0, 6.0) - -4.0).abs() < TOLERANCE);
        assert!((domain.wrap(0, -5.5) - 4.5).abs() < TOLERANCE);
        assert!((domain.wrap(0, -27.0) - 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn reflect_mirrors_across_the_crossed_face() {
        let domain = unit_box();
        let (x, flipped) = domain.reflect(0, -1.5).unwrap();
        assert!((x - 1.5).abs() < TOLERANCE && flipped);
        let (y, flipped) = domain.reflect(1, 5.25).unwrap();
        assert!((y - 4.75).abs() < TOLERANCE && flipped);
    }

    #[test]
    fn reflect_handles_multiple_crossings() {
        let domain = unit_box();
        // -12 -> 12 -> 8: two reflections, velocity restored.
        let (x, flipped) = domain.reflect(0, -12.0).unwrap();
        assert!((x - 8.0).abs() < TOLERANCE);
        assert!(!flipped);
        // 23 -> -3 -> 3: two reflections.
        let (x, flipped) = domain.reflect(0, 23.0).unwrap();
        assert!((x - 3.0).abs() < TOLERANCE);
        assert!(!flipped);
    }

    #[test]
    fn reflect_leaves_inside_coordinates_untouched() {
        assert_eq!(unit_box().reflect(0, 10.0).unwrap(), (10.0, false));
    }

    #[test]
    fn reflect_rejects_non_finite_coordinates() {
        assert!(unit_box().reflect(0, f64::INFINITY).is_err());
    }
}
