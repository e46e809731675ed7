//! Simulation driver: the generation loop.

use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::compute::{
    EvaluatorError, EvaluatorPool, FitnessError, FitnessScorer, Grid, Inspection, RuleEngine,
    RuleError,
};
use crate::schema::{
    CaConfig, GenerationStats, GenomeSnapshot, RunConfig, RunConfigError, RunPhase, RunReport,
    RunStatistics, Solution, TruthTable,
};

use super::genome::{GenomeError, GenomeRng, validate_dna};
use super::population::Population;

/// Genomes listed in a report.
pub const REPORT_TOP: usize = 10;

/// Driver errors.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("No truth table loaded")]
    NotInitialized,
    #[error("Truth-table mask {mask:#x} selects no output column of a {width}-wide circuit")]
    NothingToScore { mask: u64, width: usize },
    #[error("Invalid configuration: {0}")]
    Config(#[from] RunConfigError),
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
    #[error("Genome error: {0}")]
    Genome(#[from] GenomeError),
    #[error("Fitness error: {0}")]
    Fitness(#[from] FitnessError),
}

/// Progress passed to run callbacks after every generation.
#[derive(Debug, Clone)]
pub struct GenerationProgress<'a> {
    pub generation: usize,
    pub total_generations: usize,
    pub stats: &'a GenerationStats,
    pub max_score: u32,
    /// Generation of the first solution, if any.
    pub solved_at: Option<usize>,
}

/// Owns a run: configuration, population, truth table and statistics.
pub struct SimulationDriver {
    config: RunConfig,
    engine: RuleEngine,
    seed_row: Vec<u8>,
    rng: GenomeRng,
    scorer: FitnessScorer,
    table: Option<TruthTable>,
    population: Population,
    statistics: RunStatistics,
    phase: RunPhase,
}

impl SimulationDriver {
    /// Create a driver.
    ///
    /// If `devices` is an error the driver runs degraded with stand-in scores.
    pub fn new(
        config: RunConfig,
        devices: Result<EvaluatorPool, EvaluatorError>,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        let engine = RuleEngine::from_config(&config.ca)?;
        let mut rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };

        let (method, width) = (config.scoring.method, config.ca.width);
        let scorer = match devices {
            Ok(pool) => FitnessScorer::new(method, width, pool),
            Err(e) => {
                warn!("Evaluator unavailable ({e}); scores will be stand-ins");
                FitnessScorer::fallback(method, width, rng.next_seed())
            }
        };

        let population = Population::random(
            config.ga.population_size,
            config.ca.colors,
            engine.rule_table_len(),
            &mut rng,
        );

        Ok(Self {
            seed_row: config.ca.seed.build(config.ca.width),
            config,
            engine,
            rng,
            scorer,
            table: None,
            population,
            statistics: RunStatistics::default(),
            phase: RunPhase::Idle,
        })
    }

    /// Load the target truth table.
    pub fn set_truth_table(&mut self, table: TruthTable) {
        self.table = Some(table);
    }

    pub fn with_truth_table(mut self, table: TruthTable) -> Self {
        self.set_truth_table(table);
        self
    }

    pub fn truth_table(&self) -> Option<&TruthTable> {
        self.table.as_ref()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    pub fn is_degraded(&self) -> bool {
        self.scorer.is_degraded()
    }

    /// Score needed to count as a solution, once a table is loaded.
    pub fn max_score(&self) -> Option<u32> {
        self.table.as_ref().map(|t| self.scorer.max_score(t))
    }

    /// Switch lattice settings; a new alphabet or neighborhood reshapes every genome.
    pub fn reconfigure(&mut self, ca: CaConfig) -> Result<(), DriverError> {
        ca.validate().map_err(RunConfigError::from)?;
        let engine = RuleEngine::from_config(&ca)?;
        if engine.rule_table_len() != self.engine.rule_table_len()
            || ca.colors != self.config.ca.colors
        {
            info!(
                "Reshaping population for {} colors, {} neighbors",
                ca.colors, ca.neighbors
            );
            self.population
                .reshape(ca.colors, engine.rule_table_len(), &mut self.rng);
        }
        self.seed_row = ca.seed.build(ca.width);
        self.scorer.set_width(ca.width);
        self.engine = engine;
        self.config.ca = ca;
        Ok(())
    }

    /// Fresh random population and empty statistics.
    pub fn initialize(&mut self) {
        self.phase = RunPhase::Initializing;
        self.population = Population::random(
            self.config.ga.population_size,
            self.config.ca.colors,
            self.engine.rule_table_len(),
            &mut self.rng,
        );
        self.statistics.clear();
    }

    /// Expand DNA into a grid with the configured lattice.
    pub fn expand(&self, dna: &[u8]) -> Result<Grid, RuleError> {
        self.engine.expand(
            &self.seed_row,
            dna,
            self.config.ca.height,
            self.config.ca.expansion,
        )
    }

    /// Loaded table, refused when its mask leaves no column to score.
    fn scoring_table(table: Option<&TruthTable>, width: usize) -> Result<&TruthTable, DriverError> {
        let table = table.ok_or(DriverError::NotInitialized)?;
        if table.active_mask(width) == 0 {
            return Err(DriverError::NothingToScore {
                mask: table.mask(),
                width,
            });
        }
        Ok(table)
    }

    /// Run one generation of select, repopulate, expand, evaluate, sort and record.
    pub fn step_generation(&mut self, generation: usize) -> Result<GenerationStats, DriverError> {
        let table = Self::scoring_table(self.table.as_ref(), self.config.ca.width)?;

        self.phase = RunPhase::Selecting;
        let selection = self.population.select(&mut self.rng);

        self.phase = RunPhase::Repopulating;
        let births = self.population.repopulate(
            &selection,
            self.config.ga.pool_size,
            self.config.ga.mutation_rate,
            &mut self.rng,
        );
        debug!(
            "Generation {generation}: {} survivors, {} offspring, {} mutations",
            selection.alive.len(),
            births.offspring,
            births.mutations
        );

        self.phase = RunPhase::Expanding;
        let pending = self.population.unevaluated();
        let genomes = self.population.genomes();
        let (engine, seed_row) = (&self.engine, &self.seed_row);
        let (height, expansion) = (self.config.ca.height, self.config.ca.expansion);
        let grids = pending
            .par_iter()
            .map(|&i| engine.expand(seed_row, genomes[i].dna(), height, expansion))
            .collect::<Result<Vec<Grid>, RuleError>>()?;

        self.phase = RunPhase::Evaluating;
        let scores = self.scorer.score_batch(&grids, table)?;
        let slots = self.population.genomes_mut();
        for (&i, score) in pending.iter().zip(scores) {
            slots[i].set_fitness(score);
        }
        self.population.age_all();

        self.phase = RunPhase::Sorting;
        self.population.sort();
        self.population.mark_elites(self.config.ga.elitism);

        self.phase = RunPhase::Recording;
        let max_score = self.scorer.max_score(table);
        let stats = self
            .statistics
            .record(generation, &self.population, max_score)
            .clone();

        self.phase = RunPhase::CheckingSolution;
        if let Some(best) = self.population.best()
            && best.fitness() >= max_score
        {
            let latched = self.statistics.latch_solution(Solution {
                generation,
                genome_id: best.id(),
                dna: best.dna().to_vec(),
            });
            if latched {
                info!(
                    "Solution found in generation {generation} (genome {})",
                    best.id()
                );
            }
        }
        Ok(stats)
    }

    /// Run the full generation budget, calling `callback` after each generation.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunReport, DriverError>
    where
        F: FnMut(&GenerationProgress<'_>),
    {
        let max_score = self
            .scorer
            .max_score(Self::scoring_table(self.table.as_ref(), self.config.ca.width)?);
        let start = Instant::now();
        let total = self.config.ga.generations;
        info!(
            "Starting run: {} genomes, {} generations, rule table {}{}",
            self.population.len(),
            total,
            self.engine.rule_table_len(),
            if self.is_degraded() { " (degraded)" } else { "" }
        );

        self.initialize();
        for generation in 0..total {
            let stats = match self.step_generation(generation) {
                Ok(stats) => stats,
                Err(e) => {
                    self.phase = RunPhase::Idle;
                    return Err(e);
                }
            };
            callback(&GenerationProgress {
                generation,
                total_generations: total,
                stats: &stats,
                max_score,
                solved_at: self.statistics.time_to_solution(),
            });
        }

        self.phase = RunPhase::Reporting;
        let report = RunReport {
            statistics: self.statistics.clone(),
            top: self.top(REPORT_TOP),
            max_score,
            degraded: self.is_degraded(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        info!(
            "Run complete in {:.2}s; best {} / {}, solution at {:?}",
            report.elapsed_seconds,
            report.top.first().map(|g| g.fitness).unwrap_or(0),
            max_score,
            report.statistics.solution.as_ref().map(|s| s.generation)
        );
        self.phase = RunPhase::Idle;
        Ok(report)
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<RunReport, DriverError> {
        self.run_with_callback(|_| {})
    }

    /// Best `count` genomes of the current population.
    pub fn top(&self, count: usize) -> Vec<GenomeSnapshot> {
        self.population
            .genomes()
            .iter()
            .take(count)
            .map(|g| g.to_snapshot())
            .collect()
    }

    /// Validate, expand and evaluate a single rule table row by row.
    pub fn inspect(&self, dna: &[u8]) -> Result<Inspection, DriverError> {
        let table = self.table.as_ref().ok_or(DriverError::NotInitialized)?;
        validate_dna(dna, self.config.ca.colors, self.engine.rule_table_len())?;
        let grid = self.expand(dna)?;
        Ok(self.scorer.inspect(&grid, table)?)
    }
}
