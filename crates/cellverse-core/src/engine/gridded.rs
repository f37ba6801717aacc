use super::boundary::BoundaryPolicy;
use super::domain::Domain;
use super::error::EngineError;
use super::finite::FiniteUniverse;
use super::grid::CellGrid;
use super::integrator::Simulation;
use super::universe::Universe;
use crate::core::math::vector::Vector;
use crate::core::models::ids::ParticleKey;
use std::fmt;
use tracing::info;

/// A finite universe whose pairwise forces are computed cell by cell.
///
/// Correct only when every interaction is negligible beyond `cell_side`: pairs
/// further apart than one cell are never visited.
#[derive(Debug, Clone)]
pub struct GriddedUniverse {
    finite: FiniteUniverse,
    grid: CellGrid,
    membership_stale: bool,
}

impl GriddedUniverse {
    pub fn new(lower: Vector, upper: Vector, cell_side: f64) -> Result<Self, EngineError> {
        let finite = FiniteUniverse::new(lower, upper)?;
        let grid = CellGrid::new(finite.domain(), cell_side)?;
        info!(
            cells = grid.intern_cell_count(),
            cell_side, "Creating gridded universe."
        );
        Ok(Self {
            finite,
            grid,
            membership_stale: true,
        })
    }

    pub fn finite(&self) -> &FiniteUniverse {
        &self.finite
    }

    pub fn domain(&self) -> &Domain {
        self.finite.domain()
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn boundary_policy(&self) -> BoundaryPolicy {
        self.finite.boundary_policy()
    }

    /// Periodic boundaries build the ghost layer; other policies drop it.
    pub fn set_boundary_policy(&mut self, policy: BoundaryPolicy) -> Result<(), EngineError> {
        if policy == BoundaryPolicy::Periodic {
            self.grid.build_ghost_layer()?;
            self.finite.set_boundary_policy_unchecked(policy);
        } else {
            self.finite.set_boundary_policy(policy)?;
            self.grid.drop_ghost_layer();
        }
        self.membership_stale = true;
        Ok(())
    }

    pub fn enable_reflective_walls(&mut self, epsilon: f64, sigma: f64) -> Result<(), EngineError> {
        self.finite.enable_reflective_walls(epsilon, sigma)?;
        self.grid.drop_ghost_layer();
        self.membership_stale = true;
        Ok(())
    }

    pub fn add_particle(
        &mut self,
        position: Vector,
        velocity: Vector,
        mass: f64,
        name: Option<String>,
    ) -> Result<ParticleKey, EngineError> {
        let key = self.finite.add_particle(position, velocity, mass, name)?;
        self.membership_stale = true;
        Ok(key)
    }

    /// Re-bins every live particle and refreshes ghost copies.
    pub fn rebuild_cells(&mut self) -> Result<(), EngineError> {
        self.grid.rebuild(self.finite.universe())?;
        self.membership_stale = false;
        Ok(())
    }

    fn ensure_membership(&mut self) -> Result<(), EngineError> {
        let binned = self.grid.binned_particle_count();
        if self.membership_stale || binned != self.finite.universe().particle_count() {
            self.rebuild_cells()?;
        }
        Ok(())
    }
}

impl Simulation for GriddedUniverse {
    fn universe(&self) -> &Universe {
        self.finite.universe()
    }

    fn universe_mut(&mut self) -> &mut Universe {
        self.finite.universe_mut()
    }

    fn bounds(&self) -> Option<(Vector, Vector)> {
        self.finite.bounds()
    }

    fn prepare(&mut self) -> Result<(), EngineError> {
        self.rebuild_cells()
    }

    fn update_forces(&mut self) -> Result<(), EngineError> {
        self.ensure_membership()?;
        self.finite.apply_field_forces()?;
        self.grid.accumulate_forces(self.finite.universe_mut())
    }

    fn update_positions(&mut self, dt: f64) -> Result<(), EngineError> {
        self.finite.update_positions(dt)?;
        self.rebuild_cells()
    }
}

impl fmt::Display for GriddedUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.finite)?;
        write!(f, "{}", self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::interaction::{ExternalForce, Interaction};
    use crate::engine::grid::cell::SpatialCell;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::recorder::NullRecorder;

    const TOLERANCE: f64 = 1e-9;

    const CUTOFF: f64 = 2.5;

    fn truncated_lj() -> Interaction {
        Interaction::lennard_jones(1.0, 1.0).with_cutoff(CUTOFF)
    }

    /// Deterministic scatter of points in `[0, width)²` with no two closer than 0.9.
    fn scattered_positions(width: f64, count: usize) -> Vec<Vector> {
        let mut positions: Vec<Vector> = Vec::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 11) as f64 / (1u64 << 53) as f64
        };
        while positions.len() < count {
            let candidate = Vector::new2(next() * width, next() * width);
            if positions.iter().all(|p| (*p - candidate).norm() > 0.9) {
                positions.push(candidate);
            }
        }
        positions
    }

    fn baseline_forces(positions: &[Vector]) -> Vec<Vector> {
        let mut universe = Universe::new(2).unwrap();
        universe.add_interaction(truncated_lj());
        for position in positions {
            universe
                .add_particle(*position, Vector::new2(0.0, 0.0), 1.0, None)
                .unwrap();
        }
        universe.update_forces().unwrap();
        universe.particles().map(|p| *p.force()).collect()
    }

    fn gridded_forces(width: f64, cell_side: f64, positions: &[Vector]) -> Vec<Vector> {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(width, width), cell_side)
                .unwrap();
        universe.universe_mut().add_interaction(truncated_lj());
        for position in positions {
            universe
                .add_particle(*position, Vector::new2(0.0, 0.0), 1.0, None)
                .unwrap();
        }
        universe.update_forces().unwrap();
        universe.universe().particles().map(|p| *p.force()).collect()
    }

    fn assert_forces_match(expected: &[Vector], actual: &[Vector]) {
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual) {
            let scale = e.norm().max(1.0);
            assert!((*e - *a).norm() < TOLERANCE * scale, "expected {e}, got {a}");
        }
    }

    #[test]
    fn gridded_forces_match_quadratic_baseline_without_periodicity() {
        let width = 10.0;
        let positions = scattered_positions(width, 40);
        let expected = baseline_forces(&positions);
        // One to four cells per axis, all with side >= cutoff. Side 3 leaves
        // a narrow last cell.
        for cell_side in [10.0, 5.0, 10.0 / 3.0, 3.0, 2.5] {
            let actual = gridded_forces(width, cell_side, &positions);
            assert_forces_match(&expected, &actual);
        }
    }

    #[test]
    fn gridded_forces_sum_to_zero() {
        let positions = scattered_positions(10.0, 30);
        let forces = gridded_forces(10.0, 2.5, &positions);
        let total = forces
            .iter()
            .fold(Vector::new2(0.0, 0.0), |acc, f| acc + *f);
        assert!(total.norm() < 1e-8);
    }

    #[test]
    fn periodic_ghosts_reproduce_wrapped_pair_force() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 2.5).unwrap();
        universe.set_boundary_policy(BoundaryPolicy::Periodic).unwrap();
        universe.universe_mut().add_interaction(truncated_lj());
        let a = universe
            .add_particle(Vector::new2(0.5, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        let b = universe
            .add_particle(Vector::new2(9.5, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        universe.update_forces().unwrap();

        let mut reference = Universe::new(2).unwrap();
        reference.add_interaction(truncated_lj());
        let ra = reference
            .add_particle(Vector::new2(0.5, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        reference
            .add_particle(Vector::new2(-0.5, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        reference.update_forces().unwrap();
        let expected = *reference.particle(ra).unwrap().force();

        let on_a = *universe.universe().particle(a).unwrap().force();
        let on_b = *universe.universe().particle(b).unwrap().force();
        assert!((on_a - expected).norm() < TOLERANCE);
        assert!((on_b + expected).norm() < TOLERANCE);
        assert!(expected.norm() > 1.0);
    }

    /// Force on a particle at `first` from a single partner at `second`.
    fn isolated_pair_force(first: Vector, second: Vector) -> Vector {
        let mut reference = Universe::new(2).unwrap();
        reference.add_interaction(truncated_lj());
        let key = reference
            .add_particle(first, Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        reference
            .add_particle(second, Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        reference.update_forces().unwrap();
        *reference.particle(key).unwrap().force()
    }

    #[test]
    fn periodic_ghosts_reproduce_corner_wrapped_pair_force() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 2.5).unwrap();
        universe.set_boundary_policy(BoundaryPolicy::Periodic).unwrap();
        universe.universe_mut().add_interaction(truncated_lj());
        let a = universe
            .add_particle(Vector::new2(0.4, 0.4), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        let b = universe
            .add_particle(Vector::new2(9.6, 9.6), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        universe.update_forces().unwrap();

        // The nearest image of b sits diagonally across the lower-left corner.
        let expected = isolated_pair_force(Vector::new2(0.4, 0.4), Vector::new2(-0.4, -0.4));
        let on_a = *universe.universe().particle(a).unwrap().force();
        let on_b = *universe.universe().particle(b).unwrap().force();
        assert!(expected.norm() > 1.0);
        assert!((expected[0] - expected[1]).abs() < TOLERANCE * expected.norm());
        assert!((on_a - expected).norm() < TOLERANCE * expected.norm());
        assert!((on_b + expected).norm() < TOLERANCE * expected.norm());
    }

    #[test]
    fn periodic_policy_rejects_extent_that_is_not_whole_cells() {
        // Side 3 leaves a last cell one unit wide, so a pair 2 apart across
        // the face would straddle a non-adjacent cell.
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 3.0).unwrap();
        assert!(matches!(
            universe.set_boundary_policy(BoundaryPolicy::Periodic),
            Err(EngineError::Configuration(_))
        ));
        assert_eq!(universe.boundary_policy(), BoundaryPolicy::Absorb);
        assert!(!universe.grid().has_ghost_layer());

        // The same pair on a grid of whole cells sees the wrapped force.
        let mut whole =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 10.0 / 3.0)
                .unwrap();
        whole.set_boundary_policy(BoundaryPolicy::Periodic).unwrap();
        whole
            .universe_mut()
            .add_interaction(Interaction::lennard_jones(1.0, 1.0).with_cutoff(3.0));
        let a = whole
            .add_particle(Vector::new2(0.5, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        whole
            .add_particle(Vector::new2(8.5, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        whole.update_forces().unwrap();
        let on_a = *whole.universe().particle(a).unwrap().force();
        assert!((on_a - Vector::new2(-0.181640625, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn periodic_universe_wraps_particles_across_faces() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 2.5).unwrap();
        universe.set_boundary_policy(BoundaryPolicy::Periodic).unwrap();
        let key = universe
            .add_particle(Vector::new2(9.9, 5.0), Vector::new2(1.0, 0.0), 1.0, None)
            .unwrap();
        universe
            .simulate_stormer_verlet(0.5, 0.5, &mut NullRecorder, &ProgressReporter::new())
            .unwrap();
        let particle = universe.universe().particle(key).unwrap();
        assert!((particle.position()[0] - 0.4).abs() < 1e-12);
        let cell = universe.grid().cell_index_of(particle.position()).unwrap();
        assert_eq!(universe.grid().intern_cells()[cell].particles(), &[key]);
    }

    #[test]
    fn periodic_policy_needs_three_cells_per_axis() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 5.0).unwrap();
        assert!(universe.set_boundary_policy(BoundaryPolicy::Periodic).is_err());
        assert_eq!(universe.boundary_policy(), BoundaryPolicy::Absorb);
    }

    #[test]
    fn switching_away_from_periodic_drops_ghosts() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 2.5).unwrap();
        universe.set_boundary_policy(BoundaryPolicy::Periodic).unwrap();
        assert!(universe.grid().has_ghost_layer());
        universe.set_boundary_policy(BoundaryPolicy::Reflect).unwrap();
        assert!(!universe.grid().has_ghost_layer());
    }

    #[test]
    fn absorbed_particle_leaves_universe_and_its_cell() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 2.5).unwrap();
        universe
            .add_particle(Vector::new2(9.9, 5.0), Vector::new2(1.0, 0.0), 1.0, None)
            .unwrap();
        let stays = universe
            .add_particle(Vector::new2(5.0, 5.0), Vector::new2(0.0, 0.0), 1.0, None)
            .unwrap();
        universe
            .simulate_stormer_verlet(0.5, 0.5, &mut NullRecorder, &ProgressReporter::new())
            .unwrap();
        assert_eq!(universe.universe().particle_count(), 1);
        let occupied: Vec<_> = universe
            .grid()
            .intern_cells()
            .iter()
            .flat_map(|c| c.particles().iter().copied())
            .collect();
        assert_eq!(occupied, vec![stays]);
        let last_column = universe.grid().index_of(&[3, 2]).unwrap();
        assert!(universe.grid().intern_cells()[last_column].is_empty());
    }

    #[test]
    fn external_fields_and_walls_still_apply_on_a_grid() {
        let mut universe =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(10.0, 10.0), 2.5).unwrap();
        universe.enable_reflective_walls(1.0, 1.0).unwrap();
        universe
            .universe_mut()
            .add_external_force(ExternalForce::uniform_gravity(1.0));
        let key = universe
            .add_particle(Vector::new2(0.5, 5.0), Vector::new2(0.0, 0.0), 2.0, None)
            .unwrap();
        universe.update_forces().unwrap();
        let force = *universe.universe().particle(key).unwrap().force();
        assert!(force[0] > 0.0);
        assert!((force[1] + 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn long_run_matches_all_pairs_integration() {
        let positions: Vec<Vector> = (0..5)
            .flat_map(|i| (0..5).map(move |j| Vector::new2(3.0 + i as f64 * 1.12, 3.0 + j as f64 * 1.12)))
            .collect();

        let mut gridded =
            GriddedUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(12.0, 12.0), 3.0).unwrap();
        gridded.set_boundary_policy(BoundaryPolicy::Reflect).unwrap();
        gridded.universe_mut().add_interaction(truncated_lj());
        let mut finite = FiniteUniverse::new(Vector::new2(0.0, 0.0), Vector::new2(12.0, 12.0)).unwrap();
        finite.set_boundary_policy(BoundaryPolicy::Reflect).unwrap();
        finite.universe_mut().add_interaction(truncated_lj());
        for position in &positions {
            let velocity = Vector::new2(0.3, -0.2);
            gridded.add_particle(*position, velocity, 1.0, None).unwrap();
            finite.add_particle(*position, velocity, 1.0, None).unwrap();
        }

        let reporter = ProgressReporter::new();
        gridded
            .simulate_stormer_verlet(0.001, 0.05, &mut NullRecorder, &reporter)
            .unwrap();
        finite
            .simulate_stormer_verlet(0.001, 0.05, &mut NullRecorder, &reporter)
            .unwrap();

        for (g, f) in gridded.universe().particles().zip(finite.universe().particles()) {
            assert!((*g.position() - *f.position()).norm() < 1e-8);
        }
    }
}
