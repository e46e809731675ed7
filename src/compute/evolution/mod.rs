//! Genetic search over cellular-automaton rule tables.
//!
//! # Overview
//!
//! - **Genomes** (`genome`): DNA validation, random generation, crossover, mutation
//! - **Population** (`population`): rank-based death and tournament rebirth
//! - **Statistics** (`stats`): per-generation summaries and solution latching
//! - **Driver** (`search`): the generation loop tying it all together
//!
//! # Example
//!
//! ```rust,no_run
//! use ca_circuit_evo::compute::{EvaluatorPool, SimulatedArray, evolution::SimulationDriver};
//! use ca_circuit_evo::schema::{RunConfig, TableMode, TruthRow, TruthTable};
//!
//! let table = TruthTable::new(
//!     vec![TruthRow::new(0b01, 0b10), TruthRow::new(0b10, 0b01)],
//!     TableMode::Combinational,
//! )
//! .unwrap();
//!
//! let devices = Ok(EvaluatorPool::single(SimulatedArray::default()));
//! let mut driver = SimulationDriver::new(RunConfig::default(), devices)
//!     .unwrap()
//!     .with_truth_table(table);
//!
//! let report = driver
//!     .run_with_callback(|p| println!("Generation {}: max {}", p.generation, p.stats.max))
//!     .unwrap();
//! println!("Solved at: {:?}", report.statistics.solution.map(|s| s.generation));
//! ```

mod genome;
mod population;
mod search;
mod stats;

pub use genome::{Genome, GenomeError, GenomeRng, parse_dna, validate_dna};
pub use population::{MAX_PARENT_ATTEMPTS, Population, Repopulation, Selection};
pub use search::{DriverError, GenerationProgress, REPORT_TOP, SimulationDriver};
