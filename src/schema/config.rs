//! Configuration types for the cellular-automaton lattice.

use serde::{Deserialize, Serialize};

/// Widest lattice row the cell array can hold (one bit per output column).
pub const PHYSICAL_WIDTH: usize = 64;
/// Tallest lattice the cell array can hold.
pub const PHYSICAL_HEIGHT: usize = 64;
/// Smallest usable alphabet.
pub const MIN_COLORS: usize = 2;
/// Largest alphabet; symbols are stored as `u8`.
pub const MAX_COLORS: usize = 64;
/// Largest neighborhood.
pub const MAX_NEIGHBORS: usize = 9;
/// Upper bound on `colors ^ neighbors`.
pub const MAX_RULE_TABLE_LEN: usize = 1 << 24;

fn default_width() -> usize {
    PHYSICAL_WIDTH
}

fn default_height() -> usize {
    PHYSICAL_HEIGHT
}

fn default_colors() -> usize {
    4
}

fn default_neighbors() -> usize {
    3
}

/// How a genome is unrolled into a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expansion {
    /// One pass from the seed row.
    Single,
    /// A second pass seeded with the last row of the first; the second grid is kept.
    #[default]
    Bounce,
}

/// First row of every grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeedRow {
    /// All zeros except symbol 1 in the middle column.
    #[default]
    Center,
    /// Explicit symbols, zero-padded or truncated to the lattice width.
    Custom { symbols: Vec<u8> },
}

impl SeedRow {
    /// Materialize the seed for a lattice of `width` columns.
    pub fn build(&self, width: usize) -> Vec<u8> {
        let mut row = vec![0u8; width];
        match self {
            SeedRow::Center => {
                if width > 0 {
                    row[width / 2] = 1;
                }
            }
            SeedRow::Custom { symbols } => {
                for (cell, &symbol) in row.iter_mut().zip(symbols) {
                    *cell = symbol;
                }
            }
        }
        row
    }
}

/// Lattice shape and rule alphabet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaConfig {
    /// Columns per row; also the active circuit width in bits.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Rows per grid.
    #[serde(default = "default_height")]
    pub height: usize,
    /// Alphabet size K.
    #[serde(default = "default_colors")]
    pub colors: usize,
    /// Neighborhood size N (odd).
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
    #[serde(default)]
    pub expansion: Expansion,
    #[serde(default)]
    pub seed: SeedRow,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            colors: default_colors(),
            neighbors: default_neighbors(),
            expansion: Expansion::default(),
            seed: SeedRow::default(),
        }
    }
}

impl CaConfig {
    /// Rule-table length `colors ^ neighbors`, or `None` on overflow.
    pub fn rule_table_len(&self) -> Option<usize> {
        u32::try_from(self.neighbors)
            .ok()
            .and_then(|n| self.colors.checked_pow(n))
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.width > PHYSICAL_WIDTH {
            return Err(ConfigError::InvalidWidth(self.width));
        }
        if self.height == 0 || self.height > PHYSICAL_HEIGHT {
            return Err(ConfigError::InvalidHeight(self.height));
        }
        if !(MIN_COLORS..=MAX_COLORS).contains(&self.colors) {
            return Err(ConfigError::InvalidColors(self.colors));
        }
        if self.neighbors == 0 || self.neighbors > MAX_NEIGHBORS || self.neighbors % 2 == 0 {
            return Err(ConfigError::InvalidNeighbors(self.neighbors));
        }
        match self.rule_table_len() {
            Some(len) if len <= MAX_RULE_TABLE_LEN => {}
            _ => {
                return Err(ConfigError::RuleTableTooLarge {
                    colors: self.colors,
                    neighbors: self.neighbors,
                });
            }
        }
        if let SeedRow::Custom { symbols } = &self.seed
            && let Some(&bad) = symbols.iter().find(|&&s| usize::from(s) >= self.colors)
        {
            return Err(ConfigError::InvalidSeedSymbol {
                symbol: bad,
                colors: self.colors,
            });
        }
        Ok(())
    }
}

/// Logic primitive a cell symbol is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Zero,
    One,
    PassLeft,
    PassRight,
    Forward,
    Nand,
    Xor,
}

impl Gate {
    /// Apply the gate to the left, center and right signals of the row above.
    #[inline]
    pub fn apply(self, left: bool, center: bool, right: bool) -> bool {
        match self {
            Gate::Zero => false,
            Gate::One => true,
            Gate::PassLeft => left,
            Gate::PassRight => right,
            Gate::Forward => center,
            Gate::Nand => !(left && right),
            Gate::Xor => left ^ right,
        }
    }
}

/// Symbol to gate mapping of a cell array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateTable(pub Vec<Gate>);

impl Default for GateTable {
    /// The four-state hardware cell.
    fn default() -> Self {
        Self(vec![Gate::Zero, Gate::PassLeft, Gate::PassRight, Gate::Nand])
    }
}

impl GateTable {
    /// Gate for `symbol`; unmapped symbols behave as [`Gate::Zero`].
    #[inline]
    pub fn gate(&self, symbol: u8) -> Gate {
        self.0.get(usize::from(symbol)).copied().unwrap_or(Gate::Zero)
    }
}

fn default_enabled() -> bool {
    true
}

/// Cell-array device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// When false no device is attached and scoring degrades to the fallback.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Propagation delay honored between driving inputs and sampling outputs.
    #[serde(default)]
    pub settle_micros: u64,
    /// Number of identical devices to dispatch over.
    #[serde(default = "default_device_count")]
    pub count: usize,
    #[serde(default)]
    pub gates: GateTable,
}

fn default_device_count() -> usize {
    1
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            settle_micros: 0,
            count: default_device_count(),
            gates: GateTable::default(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Width {0} outside 1..=64")]
    InvalidWidth(usize),
    #[error("Height {0} outside 1..=64")]
    InvalidHeight(usize),
    #[error("Color count {0} outside 2..=64")]
    InvalidColors(usize),
    #[error("Neighborhood {0} must be odd and at most 9")]
    InvalidNeighbors(usize),
    #[error("Rule table {colors}^{neighbors} exceeds 2^24 entries")]
    RuleTableTooLarge { colors: usize, neighbors: usize },
    #[error("Seed symbol {symbol} is not below color count {colors}")]
    InvalidSeedSymbol { symbol: u8, colors: usize },
    #[error("Device count must be non-zero")]
    NoDevices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rule_table_len(), Some(64));
    }

    #[test]
    fn test_even_neighborhood_rejected() {
        let config = CaConfig {
            neighbors: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNeighbors(4))
        ));
    }

    #[test]
    fn test_oversized_rule_table_rejected() {
        let config = CaConfig {
            colors: 64,
            neighbors: 9,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RuleTableTooLarge { .. })
        ));
    }

    #[test]
    fn test_center_seed() {
        let row = SeedRow::Center.build(8);
        assert_eq!(row, vec![0, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_custom_seed_padded() {
        let seed = SeedRow::Custom {
            symbols: vec![2, 1],
        };
        assert_eq!(seed.build(4), vec![2, 1, 0, 0]);
    }

    #[test]
    fn test_gate_table_defaults() {
        let gates = GateTable::default();
        assert_eq!(gates.gate(3), Gate::Nand);
        assert_eq!(gates.gate(200), Gate::Zero);
        assert!(Gate::Nand.apply(true, false, false));
        assert!(!Gate::Nand.apply(true, false, true));
    }

    #[test]
    fn test_serialization() {
        let config = CaConfig {
            expansion: Expansion::Single,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let sparse: CaConfig = serde_json::from_str(r#"{"colors": 3}"#).unwrap();
        assert_eq!(sparse.colors, 3);
        assert_eq!(sparse.width, PHYSICAL_WIDTH);
    }
}
