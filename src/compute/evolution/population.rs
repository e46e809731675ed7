//! Fixed-size population with rank-based death and tournament rebirth.
//!
//! Slots are never added or removed: `select` marks genomes dead and
//! `repopulate` overwrites exactly those slots with offspring of the
//! survivors, reusing their DNA buffers.

use log::warn;

use super::genome::{Genome, GenomeError, GenomeRng, validate_dna};

/// Attempts at drawing two distinct parents before falling back.
pub const MAX_PARENT_ATTEMPTS: usize = 100;

/// Outcome of a selection pass, as slot indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub alive: Vec<usize>,
    pub dead: Vec<usize>,
}

/// Summary of a repopulation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repopulation {
    pub offspring: usize,
    /// Births whose second parent came from the fallback draw.
    pub fallbacks: usize,
    pub mutations: usize,
}

/// Genome pool for one run.
#[derive(Debug, Clone)]
pub struct Population {
    genomes: Vec<Genome>,
    next_id: u64,
    colors: usize,
}

impl Population {
    /// `size` genomes with random DNA of `table_len` symbols below `colors`.
    pub fn random(size: usize, colors: usize, table_len: usize, rng: &mut GenomeRng) -> Self {
        let genomes = (0..size as u64)
            .map(|id| Genome::fresh(id, rng.random_dna(colors, table_len)))
            .collect();
        let mut population = Self {
            genomes,
            next_id: size as u64,
            colors,
        };
        population.assign_ranks();
        population
    }

    /// Build from existing genomes; they must share one alphabet and DNA length.
    pub fn from_genomes(genomes: Vec<Genome>, colors: usize) -> Result<Self, GenomeError> {
        let table_len = genomes.first().map(|g| g.dna.len()).unwrap_or(0);
        for genome in &genomes {
            validate_dna(&genome.dna, colors, table_len)?;
        }
        let next_id = genomes.iter().map(|g| g.id + 1).max().unwrap_or(0);
        let mut population = Self {
            genomes,
            next_id,
            colors,
        };
        population.assign_ranks();
        Ok(population)
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub(crate) fn genomes_mut(&mut self) -> &mut [Genome] {
        &mut self.genomes
    }

    pub fn get(&self, index: usize) -> Option<&Genome> {
        self.genomes.get(index)
    }

    /// Highest-ranked genome (meaningful after [`Population::sort`]).
    pub fn best(&self) -> Option<&Genome> {
        self.genomes.first()
    }

    pub fn colors(&self) -> usize {
        self.colors
    }

    /// Stable sort by descending fitness; rank becomes the slot index.
    pub fn sort(&mut self) {
        self.genomes.sort_by(|a, b| b.fitness.cmp(&a.fitness));
        self.assign_ranks();
    }

    /// Flag the first `count` slots as elite and clear the rest.
    pub fn mark_elites(&mut self, count: usize) {
        for (i, genome) in self.genomes.iter_mut().enumerate() {
            genome.elite = i < count;
        }
    }

    /// Rank-proportional death.
    ///
    /// Elites always survive. Every other genome draws `r` uniform in
    /// `[0, len)` and survives iff `r >= rank`, so rank 0 never dies and the
    /// last rank dies with probability `(len - 1) / len`.
    pub fn select(&mut self, rng: &mut GenomeRng) -> Selection {
        let size = self.genomes.len();
        let mut selection = Selection::default();
        for (i, genome) in self.genomes.iter_mut().enumerate() {
            genome.alive = genome.elite || rng.index(size) >= genome.rank;
            if genome.alive {
                selection.alive.push(i);
            } else {
                selection.dead.push(i);
            }
        }
        selection
    }

    /// Refill every dead slot with a child of two tournament winners.
    pub fn repopulate(
        &mut self,
        selection: &Selection,
        pool_size: usize,
        mutation_rate: f32,
        rng: &mut GenomeRng,
    ) -> Repopulation {
        let mut stats = Repopulation::default();
        if selection.alive.is_empty() {
            return stats;
        }

        let mut child = Vec::new();
        for &slot in &selection.dead {
            let first = self.tournament(&selection.alive, pool_size, rng);
            let mut second = self.tournament(&selection.alive, pool_size, rng);
            let mut attempts = 1;
            while second == first && attempts < MAX_PARENT_ATTEMPTS {
                second = self.tournament(&selection.alive, pool_size, rng);
                attempts += 1;
            }
            if second == first {
                second = selection.alive[rng.index(selection.alive.len())];
                stats.fallbacks += 1;
                warn!(
                    "No distinct parent after {MAX_PARENT_ATTEMPTS} tournaments; \
                     using random survivor {second} for slot {slot}"
                );
            }

            rng.crossover_into(&mut child, &self.genomes[first].dna, &self.genomes[second].dna);
            stats.mutations += rng.mutate(&mut child, mutation_rate, self.colors);

            let id = self.next_id;
            self.next_id += 1;
            let genome = &mut self.genomes[slot];
            genome.dna.copy_from_slice(&child);
            genome.rebirth(id);
            stats.offspring += 1;
        }
        stats
    }

    /// Draw `pool_size` survivors with replacement and return the winner.
    ///
    /// Highest fitness wins, then the younger genome, then a uniform pick
    /// among the remaining ties.
    pub fn tournament(&self, alive: &[usize], pool_size: usize, rng: &mut GenomeRng) -> usize {
        let mut best: Vec<usize> = Vec::with_capacity(pool_size);
        for _ in 0..pool_size.max(1) {
            let candidate = alive[rng.index(alive.len())];
            match best.first() {
                None => best.push(candidate),
                Some(&leader) => {
                    let (c, l) = (&self.genomes[candidate], &self.genomes[leader]);
                    let ordering = c.fitness.cmp(&l.fitness).then(l.age.cmp(&c.age));
                    match ordering {
                        std::cmp::Ordering::Greater => {
                            best.clear();
                            best.push(candidate);
                        }
                        std::cmp::Ordering::Equal => best.push(candidate),
                        std::cmp::Ordering::Less => {}
                    }
                }
            }
        }
        if best.len() == 1 {
            best[0]
        } else {
            best[rng.index(best.len())]
        }
    }

    /// Every genome gets one generation older.
    pub fn age_all(&mut self) {
        for genome in &mut self.genomes {
            genome.age = genome.age.saturating_add(1);
        }
    }

    /// Reallocate every genome for a new alphabet or neighborhood.
    ///
    /// DNA is re-randomized and all scores are invalidated.
    pub fn reshape(&mut self, colors: usize, table_len: usize, rng: &mut GenomeRng) {
        self.colors = colors;
        for genome in &mut self.genomes {
            genome.dna = rng.random_dna(colors, table_len);
            genome.fitness = 0;
            genome.evaluated = false;
            genome.elite = false;
            genome.alive = true;
        }
    }

    /// Slots whose current DNA has no score yet.
    pub fn unevaluated(&self) -> Vec<usize> {
        self.genomes
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.evaluated)
            .map(|(i, _)| i)
            .collect()
    }

    fn assign_ranks(&mut self) {
        for (i, genome) in self.genomes.iter_mut().enumerate() {
            genome.rank = i;
        }
    }
}
