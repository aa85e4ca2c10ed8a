use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fx_exposure_core::scenarios::simulate_shocks;

use crate::commands::exposure::SourceArgs;
use crate::input;

/// Arguments for deterministic shock simulation
#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Comma-separated fractional shocks (e.g. "-0.1,0,0.1" for ±10%)
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_value = "-0.1,0,0.1"
    )]
    pub shocks: Vec<Decimal>,

    /// Hedge ratio in percent (0-100)
    #[arg(long, default_value = "50", allow_hyphen_values = true)]
    pub hedge: Decimal,

    /// Forward rate as CCY=RATE; currencies without one fall back to their
    /// booking rate (repeatable)
    #[arg(long = "forward", value_name = "CCY=RATE")]
    pub forwards: Vec<String>,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records = args.source.load_portfolio()?;
    let forward_rates = input::rates::build_rate_map(&args.forwards, None)?;
    let result = simulate_shocks(&records, args.hedge, &forward_rates, &args.shocks)?;
    Ok(serde_json::to_value(result)?)
}
