use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fx_exposure_core::monte_carlo::{self, MonteCarloInput};

use crate::commands::exposure::SourceArgs;
use crate::input;

/// Latency guard: the interactive surface never runs more than this.
const MAX_SIMULATIONS: u32 = 5_000;

/// Arguments for Monte Carlo P&L distribution
#[derive(Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of simulated shocks (max 5000)
    #[arg(long, default_value = "1000")]
    pub simulations: u32,

    /// Annualised volatility, fractional (0.12 = 12%)
    #[arg(long, default_value = "0.12")]
    pub volatility: f64,

    /// Horizon in days over which the shock materialises
    #[arg(long, default_value = "90")]
    pub horizon_days: u32,

    /// RNG seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hedge ratio in percent (0-100)
    #[arg(long, default_value = "50", allow_hyphen_values = true)]
    pub hedge: Decimal,

    /// Forward rate as CCY=RATE (repeatable)
    #[arg(long = "forward", value_name = "CCY=RATE")]
    pub forwards: Vec<String>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.simulations > MAX_SIMULATIONS {
        return Err(format!(
            "--simulations {} exceeds the maximum of {MAX_SIMULATIONS}",
            args.simulations
        )
        .into());
    }

    let records = args.source.load_portfolio()?;
    let forward_rates = input::rates::build_rate_map(&args.forwards, None)?;
    let mc_input = MonteCarloInput {
        num_simulations: args.simulations,
        annual_volatility: args.volatility,
        horizon_days: args.horizon_days,
        seed: args.seed,
    };
    let result = monte_carlo::run_monte_carlo(&records, args.hedge, &forward_rates, &mc_input)?;
    Ok(serde_json::to_value(result)?)
}
