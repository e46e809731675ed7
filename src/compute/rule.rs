//! Rule engine: unrolls a rule table (the DNA) into a lattice.
//!
//! A neighborhood of `N` symbols over an alphabet of `K` colors is read as a
//! little-endian base-`K` number, `index = sum(neighbor[i] * K^i)`, which
//! selects the next symbol from the rule table. Cells outside the row read as
//! zero.

use crate::schema::{CaConfig, Expansion, MAX_RULE_TABLE_LEN};

use super::Grid;

/// Rule evaluation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Color count {0} must be at least 2 and fit a u8 symbol")]
    InvalidColors(usize),
    #[error("Neighborhood {0} must be odd and non-zero")]
    InvalidNeighbors(usize),
    #[error("Rule table {colors}^{neighbors} is too large")]
    TableTooLarge { colors: usize, neighbors: usize },
    #[error("Neighborhood has {actual} cells, expected {expected}")]
    NeighborhoodSize { expected: usize, actual: usize },
    #[error("Rule index {index} overflows table of length {len}")]
    IndexOverflow { index: usize, len: usize },
    #[error("DNA length {actual} does not match rule table length {expected}")]
    DnaLength { expected: usize, actual: usize },
    #[error("Seed row has {actual} cells, lattice is {expected} wide")]
    SeedWidth { expected: usize, actual: usize },
}

/// Rule-table lookups for a fixed `(colors, neighbors)` pair.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    colors: usize,
    neighbors: usize,
    /// `K^i` for each neighborhood position.
    powers: Vec<usize>,
    table_len: usize,
}

impl RuleEngine {
    /// Create an engine for `colors` symbols and an odd neighborhood.
    pub fn new(colors: usize, neighbors: usize) -> Result<Self, RuleError> {
        if colors < 2 || colors > usize::from(u8::MAX) + 1 {
            return Err(RuleError::InvalidColors(colors));
        }
        if neighbors == 0 || neighbors % 2 == 0 {
            return Err(RuleError::InvalidNeighbors(neighbors));
        }

        let mut powers = Vec::with_capacity(neighbors);
        let mut acc = 1usize;
        for _ in 0..neighbors {
            powers.push(acc);
            acc = acc
                .checked_mul(colors)
                .filter(|&len| len <= MAX_RULE_TABLE_LEN)
                .ok_or(RuleError::TableTooLarge { colors, neighbors })?;
        }

        Ok(Self {
            colors,
            neighbors,
            powers,
            table_len: acc,
        })
    }

    /// Engine matching a lattice configuration.
    pub fn from_config(config: &CaConfig) -> Result<Self, RuleError> {
        Self::new(config.colors, config.neighbors)
    }

    #[inline]
    pub fn colors(&self) -> usize {
        self.colors
    }

    #[inline]
    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Required DNA length, `colors ^ neighbors`.
    #[inline]
    pub fn rule_table_len(&self) -> usize {
        self.table_len
    }

    /// Rule-table index of a neighborhood tuple.
    pub fn index(&self, neighborhood: &[u8]) -> Result<usize, RuleError> {
        if neighborhood.len() != self.neighbors {
            return Err(RuleError::NeighborhoodSize {
                expected: self.neighbors,
                actual: neighborhood.len(),
            });
        }
        let index = neighborhood
            .iter()
            .zip(&self.powers)
            .map(|(&symbol, &power)| usize::from(symbol) * power)
            .sum();
        self.checked(index)
    }

    /// Next symbol for a neighborhood: `dna[index(neighborhood)]`.
    pub fn cell_function(&self, neighborhood: &[u8], dna: &[u8]) -> Result<u8, RuleError> {
        self.check_dna(dna)?;
        Ok(dna[self.index(neighborhood)?])
    }

    /// Compute the row following `prev` into `next` (same width).
    pub fn expand_row(&self, prev: &[u8], dna: &[u8], next: &mut [u8]) -> Result<(), RuleError> {
        self.check_dna(dna)?;
        if prev.len() != next.len() {
            return Err(RuleError::SeedWidth {
                expected: next.len(),
                actual: prev.len(),
            });
        }
        self.expand_row_unchecked(prev, dna, next)
    }

    /// Lattice of `rows` rows; row 0 is `seed`.
    pub fn generate_grid(&self, seed: &[u8], dna: &[u8], rows: usize) -> Result<Grid, RuleError> {
        self.check_dna(dna)?;
        let mut grid = Grid::new(seed.len(), rows);
        if rows == 0 {
            return Ok(grid);
        }
        grid.row_mut(0).copy_from_slice(seed);
        for y in 1..rows {
            let (prev, next) = grid.row_pair_mut(y);
            self.expand_row_unchecked(prev, dna, next)?;
        }
        Ok(grid)
    }

    /// Expand with the given strategy.
    ///
    /// [`Expansion::Bounce`] reseeds a second pass with the last row of the
    /// first and returns the second grid.
    pub fn expand(
        &self,
        seed: &[u8],
        dna: &[u8],
        rows: usize,
        expansion: Expansion,
    ) -> Result<Grid, RuleError> {
        let first = self.generate_grid(seed, dna, rows)?;
        match expansion {
            Expansion::Single => Ok(first),
            Expansion::Bounce if rows == 0 => Ok(first),
            Expansion::Bounce => self.generate_grid(first.last_row(), dna, rows),
        }
    }

    fn expand_row_unchecked(&self, prev: &[u8], dna: &[u8], next: &mut [u8]) -> Result<(), RuleError> {
        let width = prev.len() as isize;
        let offset = (self.neighbors / 2) as isize;
        for (j, cell) in next.iter_mut().enumerate() {
            let mut index = 0usize;
            for (n, &power) in self.powers.iter().enumerate() {
                let x = j as isize + n as isize - offset;
                if (0..width).contains(&x) {
                    index += usize::from(prev[x as usize]) * power;
                }
            }
            *cell = dna[self.checked(index)?];
        }
        Ok(())
    }

    #[inline]
    fn checked(&self, index: usize) -> Result<usize, RuleError> {
        if index >= self.table_len {
            return Err(RuleError::IndexOverflow {
                index,
                len: self.table_len,
            });
        }
        Ok(index)
    }

    fn check_dna(&self, dna: &[u8]) -> Result<(), RuleError> {
        if dna.len() != self.table_len {
            return Err(RuleError::DnaLength {
                expected: self.table_len,
                actual: dna.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// K=2, N=3 rule used across tests.
    const RULE: [u8; 8] = [0, 1, 1, 0, 0, 0, 0, 1];

    #[test]
    fn test_index_lsb_first() {
        let engine = RuleEngine::new(2, 3).unwrap();
        assert_eq!(engine.rule_table_len(), 8);
        assert_eq!(engine.index(&[1, 0, 0]).unwrap(), 1);
        assert_eq!(engine.index(&[0, 0, 1]).unwrap(), 4);
        assert_eq!(engine.index(&[1, 1, 1]).unwrap(), 7);
        assert_eq!(engine.cell_function(&[1, 0, 0], &RULE).unwrap(), 1);
    }

    #[test]
    fn test_index_overflow_is_error() {
        let engine = RuleEngine::new(2, 3).unwrap();
        assert!(matches!(
            engine.index(&[0, 1, 2]),
            Err(RuleError::IndexOverflow { index: 10, len: 8 })
        ));
        assert!(matches!(
            engine.index(&[3, 3, 3]),
            Err(RuleError::IndexOverflow { len: 8, .. })
        ));
        assert!(matches!(
            engine.index(&[1, 0]),
            Err(RuleError::NeighborhoodSize { .. })
        ));
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(RuleEngine::new(1, 3), Err(RuleError::InvalidColors(1))));
        assert!(matches!(RuleEngine::new(2, 2), Err(RuleError::InvalidNeighbors(2))));
        assert!(matches!(
            RuleEngine::new(64, 9),
            Err(RuleError::TableTooLarge { .. })
        ));
    }

    #[test]
    fn test_dna_length_checked() {
        let engine = RuleEngine::new(2, 3).unwrap();
        assert!(matches!(
            engine.generate_grid(&[0, 1, 0], &RULE[..7], 2),
            Err(RuleError::DnaLength {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_expand_row_zero_padding() {
        let engine = RuleEngine::new(2, 3).unwrap();
        let mut next = [0u8; 3];
        // Column 0 sees [pad, 1, 0] -> index 2; column 1 sees [1, 0, 0] -> 1;
        // column 2 sees [0, 0, pad] -> 0.
        engine.expand_row(&[1, 0, 0], &RULE, &mut next).unwrap();
        assert_eq!(next, [RULE[2], RULE[1], RULE[0]]);
    }

    #[test]
    fn test_generate_grid_rows_follow_rule() {
        let engine = RuleEngine::new(2, 3).unwrap();
        let seed = [0, 0, 1, 0, 0];
        let grid = engine.generate_grid(&seed, &RULE, 4).unwrap();
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.row(0), &seed);
        for y in 1..4 {
            let mut expected = [0u8; 5];
            engine.expand_row(grid.row(y - 1), &RULE, &mut expected).unwrap();
            assert_eq!(grid.row(y), &expected);
        }
    }

    #[test]
    fn test_bounce_reseeds_from_last_row() {
        let engine = RuleEngine::new(2, 3).unwrap();
        let seed = [0, 0, 1, 0, 0, 0];
        let first = engine.generate_grid(&seed, &RULE, 5).unwrap();
        let bounced = engine.expand(&seed, &RULE, 5, Expansion::Bounce).unwrap();
        assert_eq!(bounced.row(0), first.last_row());
        let second = engine.generate_grid(first.last_row(), &RULE, 5).unwrap();
        assert_eq!(bounced, second);

        let single = engine.expand(&seed, &RULE, 5, Expansion::Single).unwrap();
        assert_eq!(single, first);
    }

    #[test]
    fn test_multicolor_rule() {
        let engine = RuleEngine::new(3, 1).unwrap();
        // Rotation 0->1->2->0.
        let dna = [1, 2, 0];
        let grid = engine.generate_grid(&[0, 1, 2], &dna, 3).unwrap();
        assert_eq!(grid.row(1), &[1, 2, 0]);
        assert_eq!(grid.row(2), &[2, 0, 1]);
    }
}
