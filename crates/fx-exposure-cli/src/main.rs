mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::exposure::{AggregateArgs, NormalizeArgs, SummaryArgs};
use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::SimulateArgs;

/// FX exposure and hedging analysis for importers
#[derive(Parser)]
#[command(
    name = "fxe",
    version,
    about = "FX exposure aggregation and hedging simulation",
    long_about = "Analyse foreign-currency invoice exposure from a CSV source: \
                  normalize to a base currency, aggregate by month or quarter, \
                  simulate deterministic rate shocks with partial forward hedges, \
                  and run Monte Carlo P&L distributions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve conversion rates and compute base-currency exposure per record
    Normalize(NormalizeArgs),
    /// Aggregate exposure into monthly or quarterly buckets
    Exposure(AggregateArgs),
    /// Portfolio KPIs and per-currency exposure breakdown
    Summary(SummaryArgs),
    /// Simulate deterministic rate shocks with a partial forward hedge
    Simulate(SimulateArgs),
    /// Monte Carlo P&L distribution over random rate shocks
    MonteCarlo(MonteCarloArgs),
    /// Print a sample invoice CSV to get started
    Template,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Normalize(args) => commands::exposure::run_normalize(args),
        Commands::Exposure(args) => commands::exposure::run_aggregate(args),
        Commands::Summary(args) => commands::exposure::run_summary(args),
        Commands::Simulate(args) => commands::scenarios::run_simulate(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Template => {
            print!("{}", commands::exposure::SAMPLE_CSV);
            return;
        }
        Commands::Version => {
            println!("fxe {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
