mod defaults;

use crate::cli::ScenarioArgs;
use crate::error::{CliError, Result};
use cellverse::engine::boundary::BoundaryPolicy;
use cellverse::engine::config as core_config;
use defaults::DefaultsConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialWallConfig {
    epsilon: Option<f64>,
    sigma: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialDomainConfig {
    #[serde(rename = "lower-bound")]
    lower_bound: Vec<f64>,
    #[serde(rename = "upper-bound")]
    upper_bound: Vec<f64>,
    boundary: Option<String>,
    #[serde(rename = "cell-side")]
    cell_side: Option<f64>,
    wall: Option<PartialWallConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", tag = "type")]
enum PartialInteraction {
    Gravity,
    LennardJones {
        epsilon: f64,
        sigma: f64,
        cutoff: Option<f64>,
    },
}

impl From<PartialInteraction> for core_config::InteractionKind {
    fn from(p: PartialInteraction) -> Self {
        match p {
            PartialInteraction::Gravity => core_config::InteractionKind::Gravity,
            PartialInteraction::LennardJones {
                epsilon,
                sigma,
                cutoff,
            } => core_config::InteractionKind::LennardJones {
                epsilon,
                sigma,
                cutoff,
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", tag = "type")]
enum PartialExternalForce {
    UniformGravity { g: f64 },
}

impl From<PartialExternalForce> for core_config::ExternalForceKind {
    fn from(p: PartialExternalForce) -> Self {
        match p {
            PartialExternalForce::UniformGravity { g } => {
                core_config::ExternalForceKind::UniformGravity { g }
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialParticle {
    name: Option<String>,
    position: Vec<f64>,
    velocity: Option<Vec<f64>>,
    mass: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialLattice {
    origin: Vec<f64>,
    counts: Vec<usize>,
    spacing: Option<f64>,
    velocity: Option<Vec<f64>>,
    mass: Option<f64>,
}

/// A scenario file as written on disk: every scalar may be missing and is
/// filled from the command line or from [`DefaultsConfig`] during the merge.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialScenarioConfig {
    dimension: Option<usize>,
    #[serde(rename = "time-step")]
    time_step: Option<f64>,
    #[serde(rename = "final-time")]
    final_time: Option<f64>,
    #[serde(rename = "kinetic-energy-ceiling")]
    kinetic_energy_ceiling: Option<f64>,
    domain: Option<PartialDomainConfig>,
    #[serde(default)]
    interactions: Vec<PartialInteraction>,
    #[serde(rename = "external-forces", default)]
    external_forces: Vec<PartialExternalForce>,
    #[serde(default)]
    particles: Vec<PartialParticle>,
    #[serde(default)]
    lattices: Vec<PartialLattice>,
}

impl PartialScenarioConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading scenario from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &ScenarioArgs) -> Result<core_config::SimulationConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let dimension = self
            .dimension
            .or_else(|| self.domain.as_ref().map(|d| d.lower_bound.len()))
            .ok_or_else(|| {
                CliError::Config(
                    "`dimension` is required when the scenario has no [domain] section."
                        .to_string(),
                )
            })?;
        let zero_velocity = vec![0.0; dimension];

        let mut builder = core_config::SimulationConfigBuilder::new()
            .dimension(dimension)
            .kinetic_energy_ceiling(
                args.energy_ceiling
                    .or(self.kinetic_energy_ceiling)
                    .unwrap_or(defaults.kinetic_energy_ceiling),
            );
        if let Some(dt) = args.time_step.or(self.time_step) {
            builder = builder.time_step(dt);
        }
        if let Some(time) = args.final_time.or(self.final_time) {
            builder = builder.final_time(time);
        }

        if let Some(domain) = self.domain {
            let boundary = match domain.boundary.as_deref() {
                Some(name) => name
                    .parse::<BoundaryPolicy>()
                    .map_err(|e| CliError::Config(e.to_string()))?,
                None => defaults.boundary,
            };
            let wall = domain.wall.map(|w| core_config::WallConfig {
                epsilon: w.epsilon.unwrap_or(defaults.wall_epsilon),
                sigma: w.sigma.unwrap_or(defaults.wall_sigma),
            });
            builder = builder.domain(core_config::DomainConfig {
                lower_bound: domain.lower_bound,
                upper_bound: domain.upper_bound,
                boundary,
                cell_side: domain.cell_side,
                wall,
            });
        }

        for interaction in self.interactions {
            builder = builder.interaction(interaction.into());
        }
        for force in self.external_forces {
            builder = builder.external_force(force.into());
        }
        for particle in self.particles {
            builder = builder.particle(core_config::ParticleSpec {
                name: particle.name,
                position: particle.position,
                velocity: particle.velocity.unwrap_or_else(|| zero_velocity.clone()),
                mass: particle.mass.unwrap_or(defaults.particle_mass),
            });
        }
        for lattice in self.lattices {
            builder = builder.lattice(core_config::LatticeSpec {
                origin: lattice.origin,
                counts: lattice.counts,
                spacing: lattice.spacing.unwrap_or(defaults.lattice_spacing),
                velocity: lattice.velocity.unwrap_or_else(|| zero_velocity.clone()),
                mass: lattice.mass.unwrap_or(defaults.particle_mass),
            });
        }

        builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        if set_values.is_empty() {
            return Ok(());
        }
        for kv_pair in set_values {
            let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
            if parts.len() != 2 {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            }
            let key = parts[0];
            let value_str = parts[1];

            let float = || -> Result<f64> {
                value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                })
            };

            match key {
                "dimension" => {
                    self.dimension = Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid integer value for {}: {}",
                            key, value_str
                        ))
                    })?);
                }
                "time-step" => self.time_step = Some(float()?),
                "final-time" => self.final_time = Some(float()?),
                "kinetic-energy-ceiling" => self.kinetic_energy_ceiling = Some(float()?),
                "domain.boundary" => {
                    self.domain_mut(key)?.boundary = Some(value_str.to_string());
                }
                "domain.cell-side" => {
                    let side = float()?;
                    self.domain_mut(key)?.cell_side = Some(side);
                }
                "domain.wall.epsilon" => {
                    let epsilon = float()?;
                    self.domain_mut(key)?
                        .wall
                        .get_or_insert_with(Default::default)
                        .epsilon = Some(epsilon);
                }
                "domain.wall.sigma" => {
                    let sigma = float()?;
                    self.domain_mut(key)?
                        .wall
                        .get_or_insert_with(Default::default)
                        .sigma = Some(sigma);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn domain_mut(&mut self, key: &str) -> Result<&mut PartialDomainConfig> {
        self.domain.as_mut().ok_or_else(|| {
            CliError::Config(format!(
                "Cannot set '{}': the scenario has no [domain] section.",
                key
            ))
        })
    }
}
