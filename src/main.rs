use std::path::{Path, PathBuf};

use clap::Parser;
use pattern_cut::config::Config;
use pattern_cut::copies::CopyRounding;
use pattern_cut::input::parse_problem;
use pattern_cut::render;
use pattern_cut::report::OptimizationReport;
use pattern_cut::solver::Solver;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "pattern_cut",
    about = "Cutting-stock optimizer: few guillotine patterns, cheapest copy counts"
)]
struct Cli {
    /// Problem file: a JSON configuration (.json) or the LX/LY/m text format
    #[arg(long)]
    input: PathBuf,

    /// Population size
    #[arg(long)]
    population: Option<usize>,

    /// Number of generations
    #[arg(long)]
    generations: Option<usize>,

    /// Share of the population kept by each selection round, in (0, 1]
    #[arg(long)]
    selection: Option<f64>,

    /// Mutation probability per solution and generation, in [0, 1]
    #[arg(long)]
    mutation: Option<f64>,

    /// Random seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of distinct patterns
    #[arg(long)]
    max_patterns: Option<usize>,

    /// Disable piece rotation
    #[arg(long)]
    no_rotate: bool,

    /// Round copy counts up to whole sheets
    #[arg(long)]
    ceil_copies: bool,

    /// Print each generation's best cost to stderr
    #[arg(long)]
    progress: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show ASCII layout of each pattern
    #[arg(long)]
    layout: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_config(path: &Path) -> Result<Config, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&text).map_err(|e| format!("invalid JSON in '{}': {}", path.display(), e))
    } else {
        parse_problem(&text).map_err(|e| format!("'{}': {}", path.display(), e))
    }
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    let genetic = &mut config.genetic;
    if let Some(population) = cli.population {
        genetic.population_size = population;
    }
    if let Some(generations) = cli.generations {
        genetic.generation_count = generations;
    }
    if let Some(selection) = cli.selection {
        genetic.selection_fraction = selection;
    }
    if let Some(mutation) = cli.mutation {
        genetic.mutation_probability = mutation;
    }
    if cli.seed.is_some() {
        genetic.seed = cli.seed;
    }

    let sheet = &mut config.sheet;
    if let Some(max_patterns) = cli.max_patterns {
        sheet.max_pattern_count = max_patterns;
    }
    if cli.no_rotate {
        sheet.allow_rotate = false;
    }
    if cli.ceil_copies {
        sheet.copy_rounding = CopyRounding::Ceil;
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();

    let mut config = load_config(&cli.input).unwrap_or_else(|e| fail(e));
    apply_overrides(&cli, &mut config);

    let mut solver = Solver::new(&config).unwrap_or_else(|e| fail(e));
    let show_progress = cli.progress;
    let outcome = solver
        .solve_with_progress(|p| {
            if show_progress {
                eprintln!("generation {}: best cost {:.3}", p.generation + 1, p.best_cost);
            }
        })
        .unwrap_or_else(|e| fail(e));

    let report = OptimizationReport::new(&outcome, solver.evaluator().item_types());

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(e),
        }
        return;
    }

    for (i, sp) in outcome.best.patterns.iter().enumerate() {
        println!("Pattern {} ({:.3} copies):", i + 1, sp.copies);
        for p in &sp.pattern.placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!("  #{} {} @ ({}, {}){}", p.item_type, p.rect, p.x, p.y, rot);
        }
        if cli.layout {
            print!("{}", render::render_pattern(&sp.pattern));
        }
        println!();
    }

    for t in &report.per_item_type {
        println!(
            "Item #{}: {:.3} produced, {} required",
            t.id, t.total_produced_count, t.min_count
        );
    }
    println!(
        "Summary: cost {:.3}, {} pattern{}, {} ms",
        report.cost,
        report.patterns.len(),
        if report.patterns.len() == 1 { "" } else { "s" },
        report.time_ms,
    );
}
