use clap::Parser;
use tracing_subscriber::EnvFilter;

use parallel_mm::{Dimensions, ExperimentConfig, Orchestrator, RunRecord, Variant, MAX_MATRIX_VALUE};

/// Multiply random matrices with every parallel decomposition and verify each result
#[derive(Parser)]
#[command(name = "parallel-mm", version, about)]
struct Cli {
    /// Rows of A and C
    #[arg(short, default_value_t = 16)]
    m: usize,

    /// Columns of A, rows of B
    #[arg(short, default_value_t = 16)]
    n: usize,

    /// Columns of B and C
    #[arg(short, default_value_t = 16)]
    q: usize,

    /// Number of workers
    #[arg(short, long, default_value_t = 4, env = "MM_WORKERS")]
    workers: usize,

    /// Seed for A; B uses seed + 1
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Exclusive upper bound for generated entries
    #[arg(long, default_value_t = MAX_MATRIX_VALUE)]
    max_value: i64,

    /// Variants to run (data-parallel, 1d-shared, 1d-distributed, 2d-shared, 2d-distributed)
    #[arg(long = "variant", value_parser = parse_variant)]
    variants: Vec<Variant>,

    /// Field separator for the result records
    #[arg(long, default_value = ",")]
    separator: String,

    /// Log every round and every mismatching cell
    #[arg(long)]
    debug: bool,

    /// Do not log per-variant execution times
    #[arg(long)]
    no_timing: bool,
}

fn parse_variant(label: &str) -> Result<Variant, String> {
    Variant::from_label(label).ok_or_else(|| format!("unknown variant '{label}'"))
}

fn setup_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let mut config = ExperimentConfig::new(Dimensions::new(cli.m, cli.n, cli.q), cli.workers)
        .with_seed(cli.seed);
    config.max_value = cli.max_value;
    config.debug = cli.debug;
    config.report_timing = !cli.no_timing;
    if !cli.variants.is_empty() {
        config.variants = cli.variants;
    }

    let workers = config.workers;
    let report = match Orchestrator::new(config).run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", RunRecord::header(&cli.separator));
    for record in report.records(workers) {
        println!("{}", record.to_delimited(&cli.separator));
    }

    if !report.all_passed() {
        std::process::exit(2);
    }
}
