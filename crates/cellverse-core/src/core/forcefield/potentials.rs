use crate::core::math::vector::Vector;

/// Distance below which a wall is considered touching; keeps the wall force finite.
pub const MIN_WALL_DISTANCE: f64 = 1e-6;

/// Newtonian attraction exerted by `source` on `target`, with unit gravitational constant.
///
/// `F = (x_s - x_t) · m_s · m_t / r³`. Coincident particles exert no force.
#[inline]
pub fn gravitational_force(
    source_position: &Vector,
    source_mass: f64,
    target_position: &Vector,
    target_mass: f64,
) -> Vector {
    let delta = *source_position - *target_position;
    let r2 = delta.norm_squared();
    if r2 == 0.0 {
        return delta;
    }
    let r = r2.sqrt();
    delta * (source_mass * target_mass / (r2 * r))
}

/// 12-6 Lennard-Jones force exerted by `source` on `target`.
///
/// `F = (x_s - x_t) · 24ε/r² · (σ/r)⁶ · (1 - 2(σ/r)⁶)`, repulsive below `σ·2^(1/6)`.
#[inline]
pub fn lennard_jones_force(
    source_position: &Vector,
    target_position: &Vector,
    epsilon: f64,
    sigma: f64,
) -> Vector {
    let delta = *source_position - *target_position;
    let r2 = delta.norm_squared();
    if r2 == 0.0 {
        return delta;
    }
    let rho6 = (sigma * sigma / r2).powi(3);
    delta * (24.0 * epsilon / r2 * rho6 * (1.0 - 2.0 * rho6))
}

/// Constant field `-m·g` along the last axis.
#[inline]
pub fn uniform_gravity_force(target_position: &Vector, target_mass: f64, g: f64) -> Vector {
    let mut force = *target_position;
    force.set_zero();
    let last = force.dimension() - 1;
    force[last] = -target_mass * g;
    force
}

/// Range of the wall repulsion: `σ·2^(1/6)`.
#[inline]
pub fn wall_cutoff(sigma: f64) -> f64 {
    sigma * 2f64.powf(1.0 / 6.0)
}

/// Signed wall magnitude at distance `r` from the wall, mirrored particle at `2r`.
///
/// `24ε/(2r) · (σ/2r)⁶ · (1 - 2(σ/2r)⁶)`; negative when the wall pushes back.
#[inline]
pub fn wall_magnitude(r: f64, epsilon: f64, sigma: f64) -> f64 {
    let r = r.max(MIN_WALL_DISTANCE);
    let rho6 = (sigma / (2.0 * r)).powi(6);
    24.0 * epsilon / (2.0 * r) * rho6 * (1.0 - 2.0 * rho6)
}

/// Force of the two walls of every axis on a particle inside `[lower, upper]`.
pub fn wall_force(
    target_position: &Vector,
    lower: &Vector,
    upper: &Vector,
    epsilon: f64,
    sigma: f64,
) -> Vector {
    let cutoff = wall_cutoff(sigma);
    let mut force = *target_position;
    force.set_zero();
    for axis in 0..target_position.dimension() {
        let x = target_position[axis];
        let to_lower = x - lower[axis];
        if to_lower < cutoff {
            force[axis] -= wall_magnitude(to_lower, epsilon, sigma);
        }
        let to_upper = upper[axis] - x;
        if to_upper < cutoff {
            force[axis] += wall_magnitude(to_upper, epsilon, sigma);
        }
    }
    force
}
