use cellverse::engine::boundary::BoundaryPolicy;
use cellverse::engine::config::DEFAULT_KINETIC_ENERGY_CEILING;

pub struct DefaultsConfig {
    pub kinetic_energy_ceiling: f64,
    pub boundary: BoundaryPolicy,
    pub particle_mass: f64,
    pub lattice_spacing: f64,
    pub wall_epsilon: f64,
    pub wall_sigma: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            kinetic_energy_ceiling: DEFAULT_KINETIC_ENERGY_CEILING,
            boundary: BoundaryPolicy::Absorb,
            particle_mass: 1.0,
            // Equilibrium distance of a Lennard-Jones pair with sigma = 1.
            lattice_spacing: 2f64.powf(1.0 / 6.0),
            wall_epsilon: 1.0,
            wall_sigma: 1.0,
        }
    }
}
