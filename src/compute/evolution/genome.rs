//! Genomes and the random operators that create and vary them.

use rand::prelude::*;

use crate::schema::GenomeSnapshot;

/// Share of mutation events that replace a single gene.
const POINT_MUTATION_SHARE: f64 = 0.75;
/// Share of mutation events that swap two genes; the rest scramble a range.
const SWAP_MUTATION_SHARE: f64 = 0.20;

/// Genome construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenomeError {
    #[error("DNA has {actual} genes, rule table needs {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Gene {position} holds symbol {symbol}, not below color count {colors}")]
    SymbolOutOfRange {
        position: usize,
        symbol: u8,
        colors: usize,
    },
    #[error("Character {character:?} at position {position} is not a base-{colors} digit")]
    InvalidDigit {
        position: usize,
        character: char,
        colors: usize,
    },
}

/// One individual: a rule table plus its bookkeeping.
#[derive(Debug, Clone)]
pub struct Genome {
    pub(crate) id: u64,
    pub(crate) dna: Vec<u8>,
    pub(crate) fitness: u32,
    pub(crate) age: u32,
    pub(crate) rank: usize,
    pub(crate) evaluated: bool,
    pub(crate) elite: bool,
    pub(crate) alive: bool,
}

impl Genome {
    /// Wrap validated DNA for a `colors ^ neighbors` rule table.
    pub fn from_dna(
        id: u64,
        dna: Vec<u8>,
        colors: usize,
        table_len: usize,
    ) -> Result<Self, GenomeError> {
        validate_dna(&dna, colors, table_len)?;
        Ok(Self::fresh(id, dna))
    }

    pub(crate) fn fresh(id: u64, dna: Vec<u8>) -> Self {
        Self {
            id,
            dna,
            fitness: 0,
            age: 0,
            rank: 0,
            evaluated: false,
            elite: false,
            alive: true,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn dna(&self) -> &[u8] {
        &self.dna
    }

    pub fn fitness(&self) -> u32 {
        self.fitness
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn is_elite(&self) -> bool {
        self.elite
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Record a score for the current DNA.
    pub(crate) fn set_fitness(&mut self, fitness: u32) {
        self.fitness = fitness;
        self.evaluated = true;
    }

    /// Turn a dead slot into a newborn; DNA is written by the caller.
    pub(crate) fn rebirth(&mut self, id: u64) {
        self.id = id;
        self.fitness = 0;
        self.age = 0;
        self.evaluated = false;
        self.elite = false;
        self.alive = true;
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> GenomeSnapshot {
        GenomeSnapshot {
            id: self.id,
            fitness: self.fitness,
            age: self.age,
            rank: self.rank,
            dna: self.dna.clone(),
        }
    }
}

/// Check DNA length and that every symbol is below `colors`.
pub fn validate_dna(dna: &[u8], colors: usize, table_len: usize) -> Result<(), GenomeError> {
    if dna.len() != table_len {
        return Err(GenomeError::LengthMismatch {
            expected: table_len,
            actual: dna.len(),
        });
    }
    if let Some((position, &symbol)) = dna
        .iter()
        .enumerate()
        .find(|&(_, &s)| usize::from(s) >= colors)
    {
        return Err(GenomeError::SymbolOutOfRange {
            position,
            symbol,
            colors,
        });
    }
    Ok(())
}

/// Parse a rule table written as base-`colors` digits, rule index 0 first.
///
/// Digits above 9 use letters (`a` = 10), so alphabets up to 36 colors can be
/// written this way. Whitespace is ignored.
pub fn parse_dna(text: &str, colors: usize) -> Result<Vec<u8>, GenomeError> {
    let radix = u32::try_from(colors).unwrap_or(u32::MAX);
    text.chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .map(|(position, character)| {
            character
                .to_digit(36)
                .filter(|&d| d < radix)
                .map(|d| d as u8)
                .ok_or(GenomeError::InvalidDigit {
                    position,
                    character,
                    colors,
                })
        })
        .collect()
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Random DNA with every symbol uniform in `[0, colors)`.
    pub fn random_dna(&mut self, colors: usize, table_len: usize) -> Vec<u8> {
        (0..table_len)
            .map(|_| self.rng.gen_range(0..colors) as u8)
            .collect()
    }

    /// Uniform index in `[0, len)`.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Get next random seed (for child generators).
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Uniform crossover: each gene comes from either parent with equal odds.
    pub fn crossover_into(&mut self, child: &mut Vec<u8>, parent1: &[u8], parent2: &[u8]) {
        child.clear();
        child.extend(
            parent1
                .iter()
                .zip(parent2)
                .map(|(&a, &b)| if self.rng.gen_bool(0.5) { a } else { b }),
        );
    }

    /// Uniform crossover into a new buffer.
    pub fn crossover(&mut self, parent1: &[u8], parent2: &[u8]) -> Vec<u8> {
        let mut child = Vec::with_capacity(parent1.len());
        self.crossover_into(&mut child, parent1, parent2);
        child
    }

    /// Mutate in place; returns the number of operators applied.
    ///
    /// Each gene independently triggers one operator with probability `rate`:
    /// a point change (to `0`, `colors - 1` or a random symbol), a swap with a
    /// random gene, or a shuffle of the range between the gene and a random
    /// anchor.
    pub fn mutate(&mut self, dna: &mut [u8], rate: f32, colors: usize) -> usize {
        if dna.is_empty() || rate <= 0.0 {
            return 0;
        }
        let rate = f64::from(rate.min(1.0));
        let mut applied = 0;
        for i in 0..dna.len() {
            if !self.rng.gen_bool(rate) {
                continue;
            }
            applied += 1;
            let roll: f64 = self.rng.r#gen();
            if roll < POINT_MUTATION_SHARE {
                dna[i] = match self.rng.gen_range(0..3) {
                    0 => 0,
                    1 => (colors - 1) as u8,
                    _ => self.rng.gen_range(0..colors) as u8,
                };
            } else if roll < POINT_MUTATION_SHARE + SWAP_MUTATION_SHARE {
                let j = self.rng.gen_range(0..dna.len());
                dna.swap(i, j);
            } else {
                let anchor = self.rng.gen_range(0..dna.len());
                if anchor != i {
                    let (lo, hi) = (i.min(anchor), i.max(anchor));
                    dna[lo..=hi].shuffle(&mut self.rng);
                }
            }
        }
        applied
    }
}
