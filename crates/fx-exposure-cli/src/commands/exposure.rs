use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use fx_exposure_core::exposure::{
    aggregate_exposure, normalize_records, parse_records, summarize_portfolio, Granularity,
    NormalizedRecord,
};

use crate::input;

/// The sample invoice CSV printed by `fxe template`.
pub const SAMPLE_CSV: &str = "\
invoice_id,date,currency,amount_foreign,fx_rate_at_booking,description
INV-001,2025-01-15,USD,15000,0.92,macchinario
INV-002,2025-02-10,USD,8000,0.94,componenti
INV-003,2025-03-05,JPY,2000000,0.0069,materiale
INV-004,2025-04-20,EUR,10000,1.0,spese
";

/// Source and rate options shared by every analysis command.
#[derive(Args)]
pub struct SourceArgs {
    /// Path to the invoice CSV (reads piped stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Base (reporting) currency
    #[arg(long, default_value = "EUR")]
    pub base: String,

    /// Manual conversion rate as CCY=RATE, used when the CSV carries no
    /// booking rate (repeatable)
    #[arg(long = "rate", value_name = "CCY=RATE")]
    pub rates: Vec<String>,

    /// Static rate table file (.yaml or .json) mapping currency to rate
    #[arg(long = "rates", value_name = "FILE")]
    pub rates_file: Option<String>,
}

impl SourceArgs {
    /// Load, validate, and normalize the invoice set.
    pub fn load_portfolio(&self) -> Result<Vec<NormalizedRecord>, Box<dyn std::error::Error>> {
        let rows = match &self.input {
            Some(path) => input::csv_in::read_rows_from_path(path)?,
            None => match input::stdin::read_stdin()? {
                Some(text) => input::csv_in::read_rows_from_str(&text)?,
                None => {
                    return Err("--input <file.csv> or CSV piped on stdin required".into());
                }
            },
        };
        let records = parse_records(&rows)?;
        let rate_map = input::rates::build_rate_map(&self.rates, self.rates_file.as_deref())?;
        Ok(normalize_records(&records, &self.base, &rate_map)?)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GranularityArg {
    Month,
    Quarter,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Month => Granularity::Month,
            GranularityArg::Quarter => Granularity::Quarter,
        }
    }
}

/// Arguments for record normalization
#[derive(Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for period aggregation
#[derive(Args)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bucket width
    #[arg(long, default_value = "month")]
    pub granularity: GranularityArg,

    /// Emit zero-valued buckets for periods with no activity
    #[arg(long)]
    pub fill_gaps: bool,
}

/// Arguments for the portfolio summary
#[derive(Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Hedge ratio in percent (0-100)
    #[arg(long, default_value = "50", allow_hyphen_values = true)]
    pub hedge: Decimal,
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records = args.source.load_portfolio()?;
    let total: Decimal = records.iter().map(|r| r.exposure_base).sum();
    Ok(serde_json::json!({
        "base_currency": args.source.base,
        "record_count": records.len(),
        "total_exposure_base": total,
        "records": records,
    }))
}

pub fn run_aggregate(args: AggregateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records = args.source.load_portfolio()?;
    let result = aggregate_exposure(&records, args.granularity.into(), args.fill_gaps)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records = args.source.load_portfolio()?;
    let result = summarize_portfolio(&records, args.hedge)?;
    Ok(serde_json::to_value(result)?)
}

// Keep the worked sample and the parser honest against each other.
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sample_csv_parses_and_normalizes() {
        let rows = input::csv_in::read_rows_from_str(SAMPLE_CSV).unwrap();
        let records = parse_records(&rows).unwrap();
        assert_eq!(records.len(), 4);
        let normalized =
            normalize_records(&records, "EUR", &Default::default()).unwrap();
        let total: Decimal = normalized.iter().map(|r| r.exposure_base).sum();
        assert_eq!(total, dec!(45120));
    }
}
