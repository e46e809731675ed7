//! CA circuit evolver CLI - Run a search from JSON configuration.

use std::fs;
use std::path::PathBuf;

use ca_circuit_evo::{
    SimulationDriver,
    compute::{EvaluatorPool, evolution::parse_dna},
    schema::{RunConfig, TableMode, TruthRow, TruthTable},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 3 {
        eprintln!("Usage: {} <config.json> <table.json> [report.json]", args[0]);
        eprintln!("       {} <config.json> <table.json> --inspect <dna>", args[0]);
        eprintln!();
        eprintln!("Evolve a cellular-automaton rule whose circuit matches a truth table.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Run configuration (lattice, GA, scoring, device)");
        eprintln!("  table.json   Target truth table");
        eprintln!("  report.json  Where to write the run report (optional)");
        eprintln!("  --inspect    Evaluate one rule table given as base-K digits");
        eprintln!();
        eprintln!("Example files are printed with --example.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let table_path = PathBuf::from(&args[2]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let table = TruthTable::load(&table_path).unwrap_or_else(|e| {
        eprintln!("Error loading truth table: {}", e);
        std::process::exit(1);
    });

    let devices = EvaluatorPool::simulated(&config.device);
    let mut driver = SimulationDriver::new(config.clone(), devices)
        .unwrap_or_else(|e| {
            eprintln!("Error creating driver: {}", e);
            std::process::exit(1);
        })
        .with_truth_table(table);

    if args.get(3).map(String::as_str) == Some("--inspect") {
        let text = args.get(4).map(String::as_str).unwrap_or_default();
        inspect(&driver, text, config.ca.colors);
        return;
    }

    println!("CA Circuit Evolution");
    println!("====================");
    println!(
        "Lattice: {}x{} ({} colors, {} neighbors, {:?})",
        config.ca.width, config.ca.height, config.ca.colors, config.ca.neighbors, config.ca.expansion
    );
    println!(
        "Population: {}  Generations: {}  Mutation: {}  Pool: {}",
        config.ga.population_size, config.ga.generations, config.ga.mutation_rate, config.ga.pool_size
    );
    println!("Scoring: {:?}", config.scoring.method);
    if driver.is_degraded() {
        println!("Evaluator: none (stand-in scores)");
    }
    println!();

    let report = driver
        .run_with_callback(|p| {
            if (p.generation + 1) % (p.total_generations / 10).max(1) == 0 {
                println!(
                    "  Generation {}/{}: max={} min={} median={:.1} mean={:.2} solutions={}",
                    p.generation + 1,
                    p.total_generations,
                    p.stats.max,
                    p.stats.min,
                    p.stats.median,
                    p.stats.mean,
                    p.stats.solutions
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Top genomes (max score {}):", report.max_score);
    for genome in &report.top {
        println!(
            "  #{:<3} id={:<8} fitness={:<6} age={:<4} dna={}",
            genome.rank,
            genome.id,
            genome.fitness,
            genome.age,
            format_dna(&genome.dna)
        );
    }
    println!();
    match &report.statistics.solution {
        Some(solution) => println!(
            "Solution: generation {} (genome {})",
            solution.generation, solution.genome_id
        ),
        None => println!("Solution: none"),
    }
    println!("Time: {:.2}s", report.elapsed_seconds);

    if let Some(path) = args.get(3) {
        if let Err(e) = report.save(path) {
            eprintln!("Error writing report: {}", e);
            std::process::exit(1);
        }
        println!("Report written to {}", path);
    }
}

fn inspect(driver: &SimulationDriver, text: &str, colors: usize) {
    let dna = parse_dna(text, colors).unwrap_or_else(|e| {
        eprintln!("Invalid DNA: {}", e);
        std::process::exit(1);
    });
    let inspection = driver.inspect(&dna).unwrap_or_else(|e| {
        eprintln!("Inspection failed: {}", e);
        std::process::exit(1);
    });

    println!("{:>18} {:>18} {:>18}  pass", "input", "expected", "observed");
    for row in &inspection.rows {
        println!(
            "{:#018x} {:#018x} {:#018x}  {}",
            row.input,
            row.expected,
            row.observed,
            if row.pass { "yes" } else { "NO" }
        );
    }
    println!();
    println!("Score: {} / {}", inspection.score, inspection.max_score);
}

fn format_dna(dna: &[u8]) -> String {
    dna.iter()
        .map(|&s| char::from_digit(u32::from(s), 36).unwrap_or('?'))
        .collect()
}

fn print_example_config() {
    let config = RunConfig::default();
    let table = TruthTable::new(
        vec![
            TruthRow::new(0b00, 0),
            TruthRow::new(0b01, 1),
            TruthRow::new(0b10, 1),
            TruthRow::new(0b11, 0),
        ],
        TableMode::Combinational,
    )
    .map(|t| t.with_mask(1));

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
    println!();
    println!("Example truth table, two-input XOR (table.json):");
    match table.map(|t| serde_json::to_string_pretty(&t)) {
        Ok(Ok(json)) => println!("{}", json),
        Ok(Err(e)) => eprintln!("Error serializing table: {}", e),
        Err(e) => eprintln!("Error building table: {}", e),
    }
}
