//! Per-generation fitness statistics and solution tracking.

use crate::schema::{GenerationStats, RunStatistics, Solution};

use super::population::Population;

impl GenerationStats {
    /// Summarize a population sorted by descending fitness.
    pub fn from_sorted(generation: usize, population: &Population, max_score: u32) -> Self {
        let scores: Vec<u32> = population.genomes().iter().map(|g| g.fitness()).collect();
        Self::from_scores(generation, &scores, max_score)
    }

    /// Summarize scores ordered best first; `max_score` decides what counts as solved.
    pub fn from_scores(generation: usize, scores: &[u32], max_score: u32) -> Self {
        if scores.is_empty() {
            return Self {
                generation,
                max: 0,
                min: 0,
                median: 0.0,
                mean: 0.0,
                solutions: 0,
            };
        }
        let n = scores.len();
        let median = if n % 2 == 0 {
            (f64::from(scores[n / 2 - 1]) + f64::from(scores[n / 2])) / 2.0
        } else {
            f64::from(scores[n / 2])
        };
        let mean = scores.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;
        Self {
            generation,
            max: scores[0],
            min: scores[n - 1],
            median,
            mean,
            solutions: scores.iter().take_while(|&&s| s >= max_score).count(),
        }
    }
}

impl RunStatistics {
    pub fn clear(&mut self) {
        self.generations.clear();
        self.solution = None;
    }

    /// Append the summary of a sorted population.
    pub fn record(
        &mut self,
        generation: usize,
        population: &Population,
        max_score: u32,
    ) -> &GenerationStats {
        self.generations
            .push(GenerationStats::from_sorted(generation, population, max_score));
        &self.generations[self.generations.len() - 1]
    }

    /// Latch the first solution; later calls are ignored. Returns true on latch.
    pub fn latch_solution(&mut self, solution: Solution) -> bool {
        if self.solution.is_some() {
            return false;
        }
        self.solution = Some(solution);
        true
    }

    /// Generation in which the first solution appeared.
    pub fn time_to_solution(&self) -> Option<usize> {
        self.solution.as_ref().map(|s| s.generation)
    }

    pub fn latest(&self) -> Option<&GenerationStats> {
        self.generations.last()
    }
}
