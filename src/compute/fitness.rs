//! Fitness scoring of configured grids against a truth table.
//!
//! Two metrics are supported:
//!
//! - **Bit match**: agreeing output bits summed over rows. Comparisons are
//!   made at the device's native width with inactive bits forced to agree, and
//!   the `(64 - active_width)` free agreements per row are subtracted again, so
//!   the maximum is `active_width * rows`.
//! - **F1**: true/false positives and false negatives over the active output
//!   bits, scaled to `0..=F1_MAX`.
//!
//! Without an evaluator, a bounded pseudo-random stand-in score keeps the
//! search loop running.

use log::debug;
use rand::prelude::*;

use crate::schema::{ScoringMethod, TableMode, TruthTable};

use super::Grid;
use super::evaluator::{Evaluator, EvaluatorError, EvaluatorPool};

/// Native word width of the cell array.
pub const DEVICE_WIDTH: u32 = 64;
/// Score of a perfect F1 match.
pub const F1_MAX: u32 = 10_000;

/// Set bits in `x`.
#[inline]
pub const fn hamming_weight(x: u64) -> u32 {
    let x = x - ((x >> 1) & 0x5555_5555_5555_5555);
    let x = (x & 0x3333_3333_3333_3333) + ((x >> 2) & 0x3333_3333_3333_3333);
    let x = (x + (x >> 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    (x.wrapping_mul(0x0101_0101_0101_0101) >> 56) as u32
}

/// Fitness errors.
#[derive(Debug, thiserror::Error)]
pub enum FitnessError {
    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
    #[error("Observed {observed} outputs for {rows} truth-table rows")]
    RowCount { observed: usize, rows: usize },
    #[error("Inspection requires an attached evaluator")]
    NoEvaluator,
}

/// Drive one input and sample the output after the settle time.
pub fn sample(device: &mut dyn Evaluator, input: u64) -> Result<u64, EvaluatorError> {
    device.set_input(input)?;
    let settle = device.settle_time();
    if !settle.is_zero() {
        std::thread::sleep(settle);
    }
    device.get_output()
}

/// Apply every row of `table` to `grid` on `device`, returning outputs in row order.
///
/// Combinational tables clear and reconfigure the device before each row.
/// Sequential tables configure once and keep state between rows.
pub fn observe(
    device: &mut dyn Evaluator,
    grid: &Grid,
    table: &TruthTable,
) -> Result<Vec<u64>, EvaluatorError> {
    let mut observed = Vec::with_capacity(table.len());
    match table.mode() {
        TableMode::Combinational => {
            for row in table.rows() {
                device.clear()?;
                device.configure(grid)?;
                observed.push(sample(device, row.input)?);
            }
        }
        TableMode::Sequential => {
            device.clear()?;
            device.configure(grid)?;
            for row in table.rows() {
                observed.push(sample(device, row.input)?);
            }
        }
    }
    Ok(observed)
}

/// Best achievable score for `table` with a circuit `width` columns wide.
pub fn max_score(method: ScoringMethod, table: &TruthTable, width: usize) -> u32 {
    match method {
        ScoringMethod::BitMatch => {
            hamming_weight(table.active_mask(width)) * table.len() as u32
        }
        ScoringMethod::F1 => F1_MAX,
    }
}

/// Agreeing active bits summed over rows.
pub fn bit_match_score(table: &TruthTable, observed: &[u64], width: usize) -> Result<u32, FitnessError> {
    check_rows(table, observed)?;
    let active = table.active_mask(width);
    let correction = DEVICE_WIDTH - hamming_weight(active);
    let score = table
        .rows()
        .iter()
        .zip(observed)
        .map(|(row, &out)| {
            let agree = !(row.output ^ out) | !active;
            hamming_weight(agree) - correction
        })
        .sum();
    Ok(score)
}

/// Positive-bit confusion counts over a whole table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCounts {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl BitCounts {
    pub fn tally(table: &TruthTable, observed: &[u64], width: usize) -> Result<Self, FitnessError> {
        check_rows(table, observed)?;
        let active = table.active_mask(width);
        let mut counts = Self::default();
        for (row, &out) in table.rows().iter().zip(observed) {
            let expected = row.output & active;
            let out = out & active;
            counts.true_positives += u64::from(hamming_weight(expected & out));
            counts.false_positives += u64::from(hamming_weight(!expected & out));
            counts.false_negatives += u64::from(hamming_weight(expected & !out));
        }
        Ok(counts)
    }

    /// F1 in `[0, 1]`.
    ///
    /// Zero denominators make that ratio 0. With no positives anywhere and no
    /// errors the match is perfect.
    pub fn f1(&self) -> f64 {
        if self.false_positives == 0 && self.false_negatives == 0 {
            return 1.0;
        }
        let tp = self.true_positives as f64;
        let ratio = |den: u64| if den == 0 { 0.0 } else { tp / den as f64 };
        let precision = ratio(self.true_positives + self.false_positives);
        let recall = ratio(self.true_positives + self.false_negatives);
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

/// Scaled F1 score in `0..=F1_MAX`.
pub fn f1_score(table: &TruthTable, observed: &[u64], width: usize) -> Result<u32, FitnessError> {
    let counts = BitCounts::tally(table, observed, width)?;
    Ok((f64::from(F1_MAX) * counts.f1()).floor() as u32)
}

/// Score observed outputs with `method`.
pub fn score_outputs(
    method: ScoringMethod,
    table: &TruthTable,
    observed: &[u64],
    width: usize,
) -> Result<u32, FitnessError> {
    match method {
        ScoringMethod::BitMatch => bit_match_score(table, observed, width),
        ScoringMethod::F1 => f1_score(table, observed, width),
    }
}

fn check_rows(table: &TruthTable, observed: &[u64]) -> Result<(), FitnessError> {
    if observed.len() != table.len() {
        return Err(FitnessError::RowCount {
            observed: observed.len(),
            rows: table.len(),
        });
    }
    Ok(())
}

/// One row of an inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowObservation {
    pub input: u64,
    pub expected: u64,
    pub observed: u64,
    /// Expected and observed agree on every active bit.
    pub pass: bool,
}

/// Detailed evaluation of one grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub rows: Vec<RowObservation>,
    pub score: u32,
    pub max_score: u32,
}

impl Inspection {
    pub fn is_solution(&self) -> bool {
        self.score >= self.max_score
    }
}

/// Where scores come from.
enum Source {
    Devices(EvaluatorPool),
    /// Stand-in scores when no device is attached.
    Fallback(StdRng),
}

/// Scores grids against a truth table.
pub struct FitnessScorer {
    method: ScoringMethod,
    width: usize,
    source: Source,
}

impl FitnessScorer {
    /// Scorer backed by devices.
    pub fn new(method: ScoringMethod, width: usize, pool: EvaluatorPool) -> Self {
        Self {
            method,
            width,
            source: Source::Devices(pool),
        }
    }

    /// Scorer with no device; scores are pseudo-random in `[0, max_score)`.
    pub fn fallback(method: ScoringMethod, width: usize, seed: u64) -> Self {
        Self {
            method,
            width,
            source: Source::Fallback(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn method(&self) -> ScoringMethod {
        self.method
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Follow a change of circuit width; masks and the maximum score depend on it.
    pub fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    /// True when scores are stand-ins.
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, Source::Fallback(_))
    }

    pub fn max_score(&self, table: &TruthTable) -> u32 {
        max_score(self.method, table, self.width)
    }

    /// Score one grid.
    pub fn score(&mut self, grid: &Grid, table: &TruthTable) -> Result<u32, FitnessError> {
        let mut scores = self.score_batch(std::slice::from_ref(grid), table)?;
        Ok(scores.pop().unwrap_or(0))
    }

    /// Score grids, returning scores in input order.
    pub fn score_batch(&mut self, grids: &[Grid], table: &TruthTable) -> Result<Vec<u32>, FitnessError> {
        let max = self.max_score(table);
        let (method, width) = (self.method, self.width);
        match &mut self.source {
            Source::Devices(pool) => pool.dispatch(grids, |device, grid| -> Result<u32, FitnessError> {
                let observed = observe(device, grid, table)?;
                score_outputs(method, table, &observed, width)
            }),
            Source::Fallback(rng) => {
                debug!("Scoring {} grids with stand-in scores", grids.len());
                Ok(grids
                    .iter()
                    .map(|_| if max == 0 { 0 } else { rng.gen_range(0..max) })
                    .collect())
            }
        }
    }

    /// Evaluate one grid row by row on the first device.
    pub fn inspect(&self, grid: &Grid, table: &TruthTable) -> Result<Inspection, FitnessError> {
        let Source::Devices(pool) = &self.source else {
            return Err(FitnessError::NoEvaluator);
        };
        let observed = pool.with_device(0, |device| observe(device, grid, table))?;
        let score = score_outputs(self.method, table, &observed, self.width)?;
        let active = table.active_mask(self.width);
        let rows = table
            .rows()
            .iter()
            .zip(&observed)
            .map(|(row, &out)| RowObservation {
                input: row.input,
                expected: row.output,
                observed: out,
                pass: (row.output ^ out) & active == 0,
            })
            .collect();
        Ok(Inspection {
            rows,
            score,
            max_score: self.max_score(table),
        })
    }
}

impl std::fmt::Debug for FitnessScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitnessScorer")
            .field("method", &self.method)
            .field("width", &self.width)
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::compute::SimulatedArray;
    use crate::schema::TruthRow;

    fn table(rows: &[(u64, u64)], mode: TableMode) -> TruthTable {
        TruthTable::new(
            rows.iter().map(|&(i, o)| TruthRow::new(i, o)).collect(),
            mode,
        )
        .unwrap()
    }

    #[test]
    fn test_hamming_weight_matches_reference() {
        let samples = [
            0u64,
            1,
            u64::MAX,
            0x8000_0000_0000_0000,
            0xdead_beef_cafe_f00d,
            0x5555_5555_5555_5555,
        ];
        for x in samples {
            assert_eq!(hamming_weight(x), x.count_ones());
        }
        let mut x = 0x9e37_79b9_7f4a_7c15u64;
        for _ in 0..1000 {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            assert_eq!(hamming_weight(x), x.count_ones());
        }
    }

    #[test]
    fn test_bit_match_all_zero_row() {
        // Expected and observed both zero: every native bit agrees before correction.
        let t = table(&[(0, 0)], TableMode::Combinational);
        assert_eq!(hamming_weight(!(0u64 ^ 0u64)), DEVICE_WIDTH);
        assert_eq!(bit_match_score(&t, &[0], 64).unwrap(), 64);
        assert_eq!(bit_match_score(&t, &[0], 4).unwrap(), 4);
    }

    #[test]
    fn test_bit_match_bounded_and_partial() {
        let t = table(&[(0, 0b1010), (1, 0b0101)], TableMode::Combinational);
        assert_eq!(max_score(ScoringMethod::BitMatch, &t, 4), 8);
        assert_eq!(bit_match_score(&t, &[0b1010, 0b0101], 4).unwrap(), 8);
        assert_eq!(bit_match_score(&t, &[0b1011, 0b0101], 4).unwrap(), 7);
        // Bits past the circuit width never count.
        assert_eq!(bit_match_score(&t, &[0xf0 | 0b1010, 0b0101], 4).unwrap(), 8);
    }

    #[test]
    fn test_bit_match_respects_mask() {
        let t = table(&[(0, 0b11)], TableMode::Combinational).with_mask(0b01);
        assert_eq!(max_score(ScoringMethod::BitMatch, &t, 8), 1);
        assert_eq!(bit_match_score(&t, &[0b01], 8).unwrap(), 1);
        assert_eq!(bit_match_score(&t, &[0b10], 8).unwrap(), 0);
    }

    #[test]
    fn test_f1_perfect_and_zero() {
        let t = table(&[(0, 0b1), (1, 0b0)], TableMode::Combinational);
        assert_eq!(f1_score(&t, &[0b1, 0b0], 1).unwrap(), F1_MAX);
        assert_eq!(f1_score(&t, &[0b0, 0b1], 1).unwrap(), 0);
        // All-negative table matched exactly.
        let zeros = table(&[(0, 0), (1, 0)], TableMode::Combinational);
        assert_eq!(f1_score(&zeros, &[0, 0], 8).unwrap(), F1_MAX);
        assert_eq!(f1_score(&zeros, &[1, 0], 8).unwrap(), 0);
    }

    #[test]
    fn test_f1_partial() {
        // tp = 1, fp = 1, fn = 1: precision = recall = 0.5.
        let t = table(&[(0, 0b11)], TableMode::Combinational);
        assert_eq!(f1_score(&t, &[0b101], 3).unwrap(), 5_000);
    }

    #[test]
    fn test_row_count_mismatch() {
        let t = table(&[(0, 0)], TableMode::Combinational);
        assert!(matches!(
            bit_match_score(&t, &[], 8),
            Err(FitnessError::RowCount { .. })
        ));
    }

    #[test]
    fn test_fallback_scores_bounded() {
        let t = table(&[(0, 0), (1, 1)], TableMode::Combinational);
        let mut scorer = FitnessScorer::fallback(ScoringMethod::BitMatch, 8, 3);
        assert!(scorer.is_degraded());
        let grids = vec![Grid::new(8, 2); 50];
        let scores = scorer.score_batch(&grids, &t).unwrap();
        assert_eq!(scores.len(), 50);
        assert!(scores.iter().all(|&s| s < 16));
        assert!(matches!(
            scorer.inspect(&grids[0], &t),
            Err(FitnessError::NoEvaluator)
        ));
    }

    #[test]
    fn test_device_scoring_and_inspection() {
        // Row of PassLeft cells: output = input << 1 within 4 columns.
        let mut grid = Grid::new(4, 1);
        grid.row_mut(0).copy_from_slice(&[1, 1, 1, 1]);
        let t = table(
            &[(0b0001, 0b0010), (0b0011, 0b0110), (0b0100, 0b0000)],
            TableMode::Combinational,
        );
        let mut scorer = FitnessScorer::new(
            ScoringMethod::BitMatch,
            4,
            EvaluatorPool::single(SimulatedArray::default()),
        );
        assert_eq!(scorer.score(&grid, &t).unwrap(), 11);

        let inspection = scorer.inspect(&grid, &t).unwrap();
        assert_eq!(inspection.max_score, 12);
        assert_eq!(inspection.score, 11);
        assert!(!inspection.is_solution());
        let passes: Vec<bool> = inspection.rows.iter().map(|r| r.pass).collect();
        assert_eq!(passes, vec![true, true, false]);
        assert_eq!(inspection.rows[2].observed, 0b1000);
    }

    /// Counts resets and echoes the last input.
    struct Recorder {
        configures: usize,
        clears: usize,
        last: u64,
    }

    impl Evaluator for Recorder {
        fn clear(&mut self) -> Result<(), EvaluatorError> {
            self.clears += 1;
            Ok(())
        }

        fn configure(&mut self, _grid: &Grid) -> Result<(), EvaluatorError> {
            self.configures += 1;
            Ok(())
        }

        fn set_input(&mut self, input: u64) -> Result<(), EvaluatorError> {
            self.last = input;
            Ok(())
        }

        fn get_output(&mut self) -> Result<u64, EvaluatorError> {
            Ok(self.last)
        }
    }

    /// Reports an error if sampled before its settle time has passed.
    struct SlowDevice {
        settle: Duration,
        driven_at: Option<Instant>,
        early_reads: usize,
    }

    impl Evaluator for SlowDevice {
        fn clear(&mut self) -> Result<(), EvaluatorError> {
            self.driven_at = None;
            Ok(())
        }

        fn configure(&mut self, _grid: &Grid) -> Result<(), EvaluatorError> {
            Ok(())
        }

        fn set_input(&mut self, _input: u64) -> Result<(), EvaluatorError> {
            self.driven_at = Some(Instant::now());
            Ok(())
        }

        fn get_output(&mut self) -> Result<u64, EvaluatorError> {
            let driven_at = self
                .driven_at
                .ok_or_else(|| EvaluatorError::Device("output read before input".into()))?;
            if driven_at.elapsed() < self.settle {
                self.early_reads += 1;
                return Err(EvaluatorError::Device("output read before settling".into()));
            }
            Ok(1)
        }

        fn settle_time(&self) -> Duration {
            self.settle
        }
    }

    #[test]
    fn test_sample_waits_for_settle_time() {
        let mut device = SlowDevice {
            settle: Duration::from_millis(5),
            driven_at: None,
            early_reads: 0,
        };
        assert_eq!(sample(&mut device, 1).unwrap(), 1);

        let grid = Grid::new(4, 1);
        let t = table(&[(0, 1), (1, 1), (2, 1)], TableMode::Combinational);
        assert_eq!(observe(&mut device, &grid, &t).unwrap(), vec![1, 1, 1]);
        assert_eq!(device.early_reads, 0);
    }

    #[test]
    fn test_set_width_moves_active_columns() {
        let t = table(&[(0, 0xFF)], TableMode::Combinational);
        let mut scorer = FitnessScorer::fallback(ScoringMethod::BitMatch, 4, 1);
        assert_eq!(scorer.max_score(&t), 4);
        scorer.set_width(8);
        assert_eq!(scorer.width(), 8);
        assert_eq!(scorer.max_score(&t), 8);
    }

    #[test]
    fn test_combinational_reconfigures_each_row() {
        let grid = Grid::new(4, 1);
        let mut device = Recorder {
            configures: 0,
            clears: 0,
            last: 0,
        };
        let comb = table(&[(1, 1), (2, 2), (3, 3)], TableMode::Combinational);
        assert_eq!(observe(&mut device, &grid, &comb).unwrap(), vec![1, 2, 3]);
        assert_eq!((device.clears, device.configures), (3, 3));

        let mut device = Recorder {
            configures: 0,
            clears: 0,
            last: 0,
        };
        let seq = table(&[(1, 1), (2, 2), (3, 3)], TableMode::Sequential);
        observe(&mut device, &grid, &seq).unwrap();
        assert_eq!((device.clears, device.configures), (1, 1));
    }
}
