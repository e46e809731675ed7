//! Property-based tests for rule expansion, genetic operators and scoring.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use ca_circuit_evo::compute::evolution::{GenomeRng, Population, validate_dna};
use ca_circuit_evo::compute::{
    F1_MAX, RuleEngine, bit_match_score, f1_score, hamming_weight, max_score,
};
use ca_circuit_evo::schema::{ScoringMethod, TableMode, TruthRow, TruthTable};

/// Odd neighborhood sizes with a modest rule table.
fn shape() -> impl Strategy<Value = (usize, usize)> {
    prop_oneof![
        (2usize..=8).prop_map(|k| (k, 1)),
        (2usize..=8).prop_map(|k| (k, 3)),
        (2usize..=4).prop_map(|k| (k, 5)),
        Just((2, 7)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every in-alphabet neighborhood indexes inside the rule table.
    #[test]
    fn prop_index_in_bounds((colors, neighbors) in shape(), raw in prop::collection::vec(any::<u8>(), 7)) {
        let engine = RuleEngine::new(colors, neighbors).unwrap();
        let neighborhood: Vec<u8> = raw[..neighbors].iter().map(|&s| s % colors as u8).collect();
        let index = engine.index(&neighborhood).unwrap();
        prop_assert!(index < engine.rule_table_len());
    }

    /// Expanded grids only contain symbols from the DNA alphabet.
    #[test]
    fn prop_grid_symbols_in_alphabet((colors, neighbors) in shape(), seed in any::<u64>(), width in 1usize..=64) {
        let engine = RuleEngine::new(colors, neighbors).unwrap();
        let mut rng = GenomeRng::new(seed);
        let dna = rng.random_dna(colors, engine.rule_table_len());
        let row = rng.random_dna(colors, width);
        let grid = engine.generate_grid(&row, &dna, 8).unwrap();
        prop_assert_eq!(grid.width(), width);
        prop_assert!(grid.as_slice().iter().all(|&s| usize::from(s) < colors));
    }

    /// Crossover and mutation keep DNA valid.
    #[test]
    fn prop_operators_preserve_dna((colors, neighbors) in shape(), seed in any::<u64>(), rate in 0.0f32..=1.0) {
        let len = RuleEngine::new(colors, neighbors).unwrap().rule_table_len();
        let mut rng = GenomeRng::new(seed);
        let a = rng.random_dna(colors, len);
        let b = rng.random_dna(colors, len);
        let mut child = rng.crossover(&a, &b);
        for (i, &gene) in child.iter().enumerate() {
            prop_assert!(gene == a[i] || gene == b[i]);
        }
        rng.mutate(&mut child, rate, colors);
        prop_assert!(validate_dna(&child, colors, len).is_ok());
    }

    /// After any number of GA rounds: fixed size, sorted, rank == index.
    #[test]
    fn prop_population_invariants(seed in any::<u64>(), size in 2usize..40, rounds in 1usize..6) {
        let mut rng = GenomeRng::new(seed);
        let mut population = Population::random(size, 2, 8, &mut rng);
        for round in 0..rounds {
            let selection = population.select(&mut rng);
            prop_assert!(selection.alive.contains(&0));
            population.repopulate(&selection, 3, 0.1, &mut rng);
            population.age_all();
            population.sort();
            prop_assert_eq!(population.len(), size);
            prop_assert!(population.genomes().iter().all(|g| g.age() as usize <= round + 1));
        }
        for (i, g) in population.genomes().iter().enumerate() {
            prop_assert_eq!(g.rank(), i);
            prop_assert_eq!(g.dna().len(), 8);
        }
    }

    /// Scores never exceed the maximum, and matching outputs reach it.
    #[test]
    fn prop_scores_bounded(
        rows in prop::collection::vec((any::<u64>(), any::<u64>(), any::<u64>()), 1..16),
        mask in any::<u64>(),
        width in 1usize..=64,
    ) {
        let table = TruthTable::new(
            rows.iter().map(|&(i, o, _)| TruthRow::new(i, o)).collect(),
            TableMode::Combinational,
        )
        .unwrap()
        .with_mask(mask);
        let observed: Vec<u64> = rows.iter().map(|&(_, _, out)| out).collect();
        let expected: Vec<u64> = rows.iter().map(|&(_, o, _)| o).collect();

        let max = max_score(ScoringMethod::BitMatch, &table, width);
        prop_assert_eq!(max, hamming_weight(table.active_mask(width)) * rows.len() as u32);
        prop_assert!(bit_match_score(&table, &observed, width).unwrap() <= max);
        prop_assert_eq!(bit_match_score(&table, &expected, width).unwrap(), max);

        prop_assert!(f1_score(&table, &observed, width).unwrap() <= F1_MAX);
        prop_assert_eq!(f1_score(&table, &expected, width).unwrap(), F1_MAX);
    }

    /// The population-count routine agrees with the hardware instruction.
    #[test]
    fn prop_hamming_weight(x in any::<u64>()) {
        prop_assert_eq!(hamming_weight(x), x.count_ones());
    }
}
