//! Evolution configuration types and run reporting.
//!
//! A run is described by [`RunConfig`] (lattice, GA, scoring and device
//! settings) and summarized by [`RunReport`] once the generation budget is
//! spent.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CaConfig, ConfigError, DeviceConfig};

/// Top-level configuration for one evolutionary run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub ca: CaConfig,
    #[serde(default)]
    pub ga: GaConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_population_size() -> usize {
    100
}

fn default_generations() -> usize {
    100
}

fn default_mutation_rate() -> f32 {
    0.05
}

fn default_pool_size() -> usize {
    5
}

/// Genetic algorithm configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Fixed generation budget; runs never stop early.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Per-gene mutation probability.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Tournament draws per parent.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Number of top genomes exempt from death each generation.
    #[serde(default)]
    pub elitism: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generations: default_generations(),
            mutation_rate: default_mutation_rate(),
            pool_size: default_pool_size(),
            elitism: 0,
        }
    }
}

/// How observed outputs are compared with the truth table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Count of agreeing output bits.
    #[default]
    BitMatch,
    /// Scaled F1 over positive output bits.
    F1,
}

/// Fitness scoring settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub method: ScoringMethod,
}

// ============================================================================
// Progress & Results
// ============================================================================

/// Where the driver currently is in its state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    #[default]
    Idle,
    Initializing,
    Selecting,
    Repopulating,
    Expanding,
    Evaluating,
    Sorting,
    Recording,
    CheckingSolution,
    Reporting,
}

/// Fitness summary of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub max: u32,
    pub min: u32,
    pub median: f64,
    pub mean: f64,
    /// Genomes reaching the maximum score in this generation.
    #[serde(default)]
    pub solutions: usize,
}

/// First genome to reach the maximum score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Generation in which it was found (time to solution).
    pub generation: usize,
    pub genome_id: u64,
    pub dna: Vec<u8>,
}

/// Per-generation history plus the latched first solution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    pub generations: Vec<GenerationStats>,
    pub solution: Option<Solution>,
}

/// Serializable view of a genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeSnapshot {
    pub id: u64,
    pub fitness: u32,
    pub age: u32,
    pub rank: usize,
    pub dna: Vec<u8>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub statistics: RunStatistics,
    /// Best genomes of the final population, best first.
    pub top: Vec<GenomeSnapshot>,
    /// Score a genome must reach to count as a solution.
    pub max_score: u32,
    /// True when no evaluator was attached and scores are stand-ins.
    pub degraded: bool,
    pub elapsed_seconds: f64,
}

impl RunReport {
    /// Write the report as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a report written by [`RunReport::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Report persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Validation
// ============================================================================

/// Run configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum RunConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Generation budget must be positive")]
    NoGenerations,
    #[error("Mutation rate {0} outside [0, 1]")]
    InvalidMutationRate(f32),
    #[error("Tournament pool size must be positive")]
    EmptyPool,
    #[error("Elitism {elitism} must be below population size {population}")]
    TooManyElites { elitism: usize, population: usize },
    #[error("Lattice config validation failed: {0}")]
    Lattice(#[from] ConfigError),
}

impl GaConfig {
    /// Validate GA parameters.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.population_size < 2 {
            return Err(RunConfigError::PopulationTooSmall);
        }
        if self.generations == 0 {
            return Err(RunConfigError::NoGenerations);
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(RunConfigError::InvalidMutationRate(self.mutation_rate));
        }
        if self.pool_size == 0 {
            return Err(RunConfigError::EmptyPool);
        }
        if self.elitism >= self.population_size {
            return Err(RunConfigError::TooManyElites {
                elitism: self.elitism,
                population: self.population_size,
            });
        }
        Ok(())
    }
}

impl RunConfig {
    /// Validate the whole run configuration.
    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.ca.validate()?;
        self.ga.validate()?;
        if self.device.count == 0 {
            return Err(ConfigError::NoDevices.into());
        }
        Ok(())
    }
}
