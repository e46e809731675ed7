//! Evaluator capability - the reconfigurable cell array a grid is loaded into.
//!
//! The search only talks to hardware through [`Evaluator`]. A software model
//! ([`SimulatedArray`]) is provided; physical arrays implement the same trait
//! outside this crate. Several devices can be grouped in an [`EvaluatorPool`].

mod pool;
mod simulated;

pub use pool::*;
pub use simulated::*;

use std::time::Duration;

use super::Grid;

/// Device access errors.
#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("No evaluator available: {0}")]
    Unavailable(String),
    #[error("Grid {width}x{height} does not fit device {max_width}x{max_height}")]
    GridTooLarge {
        width: usize,
        height: usize,
        max_width: usize,
        max_height: usize,
    },
    #[error("Output read before the device was configured")]
    NotConfigured,
    #[error("Evaluator pool is empty")]
    EmptyPool,
    #[error("Device {0} lock poisoned")]
    Poisoned(usize),
    #[error("Device fault: {0}")]
    Device(String),
}

/// A cell array that can be configured with a grid and sampled.
///
/// Callers must wait [`Evaluator::settle_time`] between
/// [`Evaluator::set_input`] and [`Evaluator::get_output`].
pub trait Evaluator: Send {
    /// Reset configuration and any retained state.
    fn clear(&mut self) -> Result<(), EvaluatorError>;

    /// Load one symbol per cell.
    fn configure(&mut self, grid: &Grid) -> Result<(), EvaluatorError>;

    /// Drive the input word into the first row.
    fn set_input(&mut self, input: u64) -> Result<(), EvaluatorError>;

    /// Sample the output word from the last row.
    fn get_output(&mut self) -> Result<u64, EvaluatorError>;

    /// Propagation delay before outputs are valid.
    fn settle_time(&self) -> Duration {
        Duration::ZERO
    }
}
