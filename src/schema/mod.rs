//! Schema module - Configuration, truth tables and run reporting types.

mod config;
mod evolution;
mod truth_table;

pub use config::*;
pub use evolution::*;
pub use truth_table::*;
