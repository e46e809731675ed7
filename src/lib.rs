//! Evolving logic circuits from cellular-automaton rule tables.
//!
//! Each genome is a CA rule table. The rule is unrolled from a seed row into a
//! 2-D grid of cell symbols, the grid is loaded into a reconfigurable cell
//! array, and the array's outputs are scored against a target truth table. A
//! genetic algorithm with rank-based death and tournament rebirth searches for
//! a rule whose circuit reproduces the table.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, truth tables and run reports
//! - `compute`: Rule expansion, evaluators, fitness scoring and the GA driver
//!
//! # Example
//!
//! ```rust,no_run
//! use ca_circuit_evo::{
//!     compute::{EvaluatorPool, RuleEngine},
//!     schema::{DeviceConfig, Expansion, RunConfig, TruthTable},
//!     SimulationDriver,
//! };
//!
//! // Expand a single rule by hand
//! let engine = RuleEngine::new(2, 3).unwrap();
//! let grid = engine
//!     .expand(&[0, 0, 1, 0, 0], &[0, 1, 1, 0, 0, 0, 0, 1], 5, Expansion::Bounce)
//!     .unwrap();
//! println!("Last row: {:?}", grid.last_row());
//!
//! // Or search for one
//! let table = TruthTable::load("xor.json").unwrap();
//! let config = RunConfig::default();
//! let devices = EvaluatorPool::simulated(&DeviceConfig::default());
//! let mut driver = SimulationDriver::new(config, devices)
//!     .unwrap()
//!     .with_truth_table(table);
//! let report = driver.run().unwrap();
//! println!("Best fitness: {} / {}", report.top[0].fitness, report.max_score);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{DriverError, SimulationDriver};
pub use compute::{Evaluator, EvaluatorPool, FitnessScorer, Grid, RuleEngine, SimulatedArray};
pub use schema::{RunConfig, RunReport, TruthTable};
