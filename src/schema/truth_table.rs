//! Target truth tables.
//!
//! Words in JSON may be plain numbers or `"0x..."` / `"0b..."` strings:
//!
//! ```json
//! { "mode": "combinational", "mask": "0x1",
//!   "rows": [ { "input": "0x0", "output": 0 }, { "input": "0x3", "output": 1 } ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How rows are applied to the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMode {
    /// Every row is independent; the evaluator is reset before each one.
    #[default]
    Combinational,
    /// Rows are a stimulus sequence against retained state.
    Sequential,
}

/// One input/expected-output pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthRow {
    #[serde(serialize_with = "serialize_word", deserialize_with = "deserialize_word")]
    pub input: u64,
    #[serde(serialize_with = "serialize_word", deserialize_with = "deserialize_word")]
    pub output: u64,
}

impl TruthRow {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }
}

fn default_mask() -> u64 {
    u64::MAX
}

#[derive(Deserialize)]
struct TruthTableRepr {
    #[serde(default)]
    mode: TableMode,
    #[serde(default = "default_mask", deserialize_with = "deserialize_word")]
    mask: u64,
    rows: Vec<TruthRow>,
}

/// Ordered rows plus the mask of output bits that count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruthTable {
    mode: TableMode,
    #[serde(serialize_with = "serialize_word")]
    mask: u64,
    rows: Vec<TruthRow>,
}

impl TruthTable {
    /// Build a table from rows; at least one row is required.
    pub fn new(rows: Vec<TruthRow>, mode: TableMode) -> Result<Self, TruthTableError> {
        if rows.is_empty() {
            return Err(TruthTableError::Empty);
        }
        Ok(Self {
            mode,
            mask: u64::MAX,
            rows,
        })
    }

    /// Restrict scoring to the output bits set in `mask`.
    pub fn with_mask(mut self, mask: u64) -> Self {
        self.mask = mask;
        self
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    pub fn rows(&self) -> &[TruthRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Output bits that are both masked in and inside a circuit of `width` columns.
    pub fn active_mask(&self, width: usize) -> u64 {
        let columns = if width >= 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        self.mask & columns
    }

    /// Parse a table from JSON text.
    pub fn from_json(json: &str) -> Result<Self, TruthTableError> {
        let repr: TruthTableRepr = serde_json::from_str(json)?;
        Ok(Self::new(repr.rows, repr.mode)?.with_mask(repr.mask))
    }

    /// Load a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TruthTableError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl<'de> Deserialize<'de> for TruthTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = TruthTableRepr::deserialize(deserializer)?;
        TruthTable::new(repr.rows, repr.mode)
            .map(|table| table.with_mask(repr.mask))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordRepr {
    Number(u64),
    Text(String),
}

fn parse_word(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let (digits, radix) = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = trimmed.strip_prefix("0b") {
        (bin, 2)
    } else {
        (trimmed, 10)
    };
    u64::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|e| format!("invalid word {text:?}: {e}"))
}

fn deserialize_word<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match WordRepr::deserialize(deserializer)? {
        WordRepr::Number(value) => Ok(value),
        WordRepr::Text(text) => parse_word(&text).map_err(serde::de::Error::custom),
    }
}

fn serialize_word<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{value:#x}"))
}

/// Truth table construction and loading errors.
#[derive(Debug, thiserror::Error)]
pub enum TruthTableError {
    #[error("Truth table has no rows")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
