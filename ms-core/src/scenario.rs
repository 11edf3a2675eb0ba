//! Scenario configuration loader.
//!
//! Loads complete scenes (simulation settings, particles, springs, ropes and
//! initial forces) from YAML files, so new set-ups can be tried without
//! recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! scenarios/
//! ├── bouncing_ball.yaml
//! ├── newton_pair.yaml
//! ├── rope_pendulum.yaml
//! └── ...
//! ```
//!
//! Particles are named in the file and referred to by name from springs,
//! ropes and forces. Ids are handed out in file order, so the n-th particle
//! listed becomes `ParticleId(n)`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::constraint::{Anchor, Rope, Spring};
use crate::error::PhysicsError;
use crate::integrator::IntegrationMethod;
use crate::types::{constants, Friction, GroundResponse, Particle, ParticleId, Vec3};
use crate::world::{SimulationConfig, World};

/// Error type for scenario loading.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("scenario not found: {0}")]
    NotFound(String),

    #[error("unknown particle name: {0}")]
    UnknownParticle(String),

    #[error("particle name used twice: {0}")]
    DuplicateParticle(String),

    #[error("invalid scenario: {0}")]
    Physics(#[from] PhysicsError),
}

// =============================================================================
// Scenario Schema
// =============================================================================

fn default_restitution() -> f64 {
    1.0
}

fn default_tension_scale() -> f64 {
    constants::ROPE_TENSION_SCALE
}

/// One particle as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpec {
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    pub mass: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default = "default_restitution")]
    pub restitution: f64,
    #[serde(default)]
    pub friction: Friction,
    #[serde(default)]
    pub air_damping: f64,
    #[serde(default)]
    pub ground_response: GroundResponse,
    /// Overrides the scenario-wide integration scheme.
    #[serde(default)]
    pub integrator: Option<IntegrationMethod>,
}

/// Far end of a spring or rope, by particle name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorSpec {
    Fixed { position: Vec3 },
    Particle { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringSpec {
    pub particle: String,
    pub anchor: AnchorSpec,
    pub rest_length: f64,
    pub stiffness: f64,
    #[serde(default)]
    pub damping: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RopeSpec {
    pub particle: String,
    pub anchor: AnchorSpec,
    pub length: f64,
    #[serde(default = "default_tension_scale")]
    pub tension_scale: f64,
}

/// Force applied during the first tick only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSpec {
    pub particle: String,
    pub force: Vec3,
}

/// A complete scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub particles: Vec<ParticleSpec>,
    #[serde(default)]
    pub springs: Vec<SpringSpec>,
    #[serde(default)]
    pub ropes: Vec<RopeSpec>,
    #[serde(default)]
    pub initial_forces: Vec<ForceSpec>,
}

impl ScenarioConfig {
    /// Parse a scenario from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Id the named particle will have in the built world.
    pub fn particle_id(&self, name: &str) -> Option<ParticleId> {
        self.particles
            .iter()
            .position(|p| p.name == name)
            .map(ParticleId)
    }

    fn resolve(&self, name: &str) -> Result<ParticleId, ScenarioError> {
        self.particle_id(name)
            .ok_or_else(|| ScenarioError::UnknownParticle(name.to_string()))
    }

    fn resolve_anchor(&self, anchor: &AnchorSpec) -> Result<Anchor, ScenarioError> {
        match anchor {
            AnchorSpec::Fixed { position } => Ok(Anchor::Fixed(*position)),
            AnchorSpec::Particle { name } => Ok(Anchor::Particle(self.resolve(name)?)),
        }
    }

    /// Validate every entry and assemble a ready-to-tick world.
    pub fn build_world(&self) -> Result<World, ScenarioError> {
        let mut world = World::new(self.simulation.clone())?;

        let mut seen = HashSet::new();
        for spec in &self.particles {
            if !seen.insert(spec.name.as_str()) {
                return Err(ScenarioError::DuplicateParticle(spec.name.clone()));
            }
            let particle = Particle::new(spec.position, spec.mass, spec.radius)?
                .with_velocity(spec.velocity)
                .with_restitution(spec.restitution)?
                .with_friction(spec.friction)
                .with_air_damping(spec.air_damping)?
                .with_ground_response(spec.ground_response);
            let method = spec.integrator.unwrap_or(self.simulation.integrator);
            world.add_particle_with(particle, method)?;
        }

        for spec in &self.springs {
            let spring = Spring::new(
                self.resolve(&spec.particle)?,
                self.resolve_anchor(&spec.anchor)?,
                spec.rest_length,
                spec.stiffness,
                spec.damping,
            )?;
            world.add_spring(spring)?;
        }

        for spec in &self.ropes {
            let rope = Rope::new(
                self.resolve(&spec.particle)?,
                self.resolve_anchor(&spec.anchor)?,
                spec.length,
            )?
            .with_tension_scale(spec.tension_scale);
            world.add_rope(rope)?;
        }

        for spec in &self.initial_forces {
            world.apply_force(self.resolve(&spec.particle)?, spec.force)?;
        }

        Ok(world)
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Scenario loader with configurable base directory.
pub struct ScenarioLoader {
    base_path: PathBuf,
}

impl ScenarioLoader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load a scenario by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = ScenarioLoader::new("scenarios");
    /// let mut world = loader.load("bouncing_ball")?.build_world()?;
    /// ```
    pub fn load(&self, name: &str) -> Result<ScenarioConfig, ScenarioError> {
        let path = self.base_path.join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(ScenarioError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let scenario = ScenarioConfig::from_yaml(&contents)?;
        info!(
            scenario = name,
            particles = scenario.particles.len(),
            springs = scenario.springs.len(),
            ropes = scenario.ropes.len(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    /// List all available scenarios, sorted.
    pub fn list(&self) -> Result<Vec<String>, ScenarioError> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(".yaml") {
                names.push(name.trim_end_matches(".yaml").to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================
