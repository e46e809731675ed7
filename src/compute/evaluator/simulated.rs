//! Software model of the cell array.

use std::time::Duration;

use crate::schema::{DeviceConfig, GateTable, PHYSICAL_HEIGHT, PHYSICAL_WIDTH};

use super::{Evaluator, EvaluatorError};
use crate::compute::Grid;

/// Combinational cell array evaluated in software.
///
/// Input bit `x` drives column `x` above the first row. Every cell reads the
/// left, center and right signals of the row above (zero past the edges) and
/// applies the gate its symbol maps to. Output bit `x` is column `x` of the
/// last row.
#[derive(Debug, Clone)]
pub struct SimulatedArray {
    gates: GateTable,
    settle: Duration,
    grid: Option<Grid>,
    input: u64,
}

impl SimulatedArray {
    pub fn new(gates: GateTable) -> Self {
        Self {
            gates,
            settle: Duration::ZERO,
            grid: None,
            input: 0,
        }
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(config.gates.clone()).with_settle_time(Duration::from_micros(config.settle_micros))
    }

    pub fn with_settle_time(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn gates(&self) -> &GateTable {
        &self.gates
    }

    /// Propagate `input` through `grid`.
    pub fn propagate(&self, grid: &Grid, input: u64) -> u64 {
        let width = grid.width();
        let mut signals: Vec<bool> = (0..width)
            .map(|x| x < 64 && (input >> x) & 1 == 1)
            .collect();
        let mut next = vec![false; width];
        for row in grid.rows() {
            for (x, out) in next.iter_mut().enumerate() {
                let left = x.checked_sub(1).map(|l| signals[l]).unwrap_or(false);
                let right = signals.get(x + 1).copied().unwrap_or(false);
                *out = self.gates.gate(row[x]).apply(left, signals[x], right);
            }
            std::mem::swap(&mut signals, &mut next);
        }
        signals
            .iter()
            .take(64)
            .enumerate()
            .fold(0u64, |word, (x, &bit)| word | (u64::from(bit) << x))
    }
}

impl Default for SimulatedArray {
    fn default() -> Self {
        Self::new(GateTable::default())
    }
}

impl Evaluator for SimulatedArray {
    fn clear(&mut self) -> Result<(), EvaluatorError> {
        self.grid = None;
        self.input = 0;
        Ok(())
    }

    fn configure(&mut self, grid: &Grid) -> Result<(), EvaluatorError> {
        if grid.width() > PHYSICAL_WIDTH || grid.height() > PHYSICAL_HEIGHT {
            return Err(EvaluatorError::GridTooLarge {
                width: grid.width(),
                height: grid.height(),
                max_width: PHYSICAL_WIDTH,
                max_height: PHYSICAL_HEIGHT,
            });
        }
        self.grid = Some(grid.clone());
        Ok(())
    }

    fn set_input(&mut self, input: u64) -> Result<(), EvaluatorError> {
        self.input = input;
        Ok(())
    }

    fn get_output(&mut self) -> Result<u64, EvaluatorError> {
        let grid = self.grid.as_ref().ok_or(EvaluatorError::NotConfigured)?;
        Ok(self.propagate(grid, self.input))
    }

    fn settle_time(&self) -> Duration {
        self.settle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Gate;

    fn grid_of(width: usize, rows: &[&[u8]]) -> Grid {
        let mut grid = Grid::new(width, rows.len());
        for (y, row) in rows.iter().enumerate() {
            grid.row_mut(y).copy_from_slice(row);
        }
        grid
    }

    #[test]
    fn test_forward_passes_input() {
        let array = SimulatedArray::new(GateTable(vec![Gate::Zero, Gate::Forward]));
        let grid = grid_of(4, &[&[1, 1, 1, 1], &[1, 1, 1, 1]]);
        assert_eq!(array.propagate(&grid, 0b1010), 0b1010);
    }

    #[test]
    fn test_pass_left_shifts_up() {
        // Each PassLeft cell copies its left neighbor: bits move to higher columns.
        let array = SimulatedArray::default();
        let grid = grid_of(4, &[&[1, 1, 1, 1]]);
        assert_eq!(array.propagate(&grid, 0b0011), 0b0110);
    }

    #[test]
    fn test_nand_cell() {
        let array = SimulatedArray::default();
        // Column 1 NANDs input bits 0 and 2; others are constant zero.
        let grid = grid_of(3, &[&[0, 3, 0]]);
        assert_eq!(array.propagate(&grid, 0b101), 0b000);
        assert_eq!(array.propagate(&grid, 0b001), 0b010);
    }

    #[test]
    fn test_evaluator_protocol() {
        let mut array = SimulatedArray::default();
        assert!(matches!(
            array.get_output(),
            Err(EvaluatorError::NotConfigured)
        ));
        let grid = grid_of(2, &[&[2, 0]]);
        array.configure(&grid).unwrap();
        array.set_input(0b10).unwrap();
        assert_eq!(array.get_output().unwrap(), 0b01);
        array.clear().unwrap();
        assert!(array.get_output().is_err());
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let mut array = SimulatedArray::default();
        let grid = Grid::new(4, PHYSICAL_HEIGHT + 1);
        assert!(matches!(
            array.configure(&grid),
            Err(EvaluatorError::GridTooLarge { .. })
        ));
    }
}
