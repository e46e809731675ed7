//! Compute module - Rule expansion, evaluation and genetic search.

mod evaluator;
mod fitness;
mod grid;
mod rule;

pub mod evolution;

pub use evaluator::*;
pub use fitness::*;
pub use grid::*;
pub use rule::*;
