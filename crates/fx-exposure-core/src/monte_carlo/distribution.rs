use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;

use crate::error::FxRiskError;
use crate::exposure::normalize::NormalizedRecord;
use crate::scenarios::shock::simulate_shock;
use crate::types::{ComputationMetadata, ComputationOutput, RateMap};
use crate::FxRiskResult;

/// Trading days per year, the convention used to scale annual volatility.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Helper: build ComputationOutput without requiring Decimal
// ---------------------------------------------------------------------------

fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for a Monte Carlo P&L run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloInput {
    /// Number of simulated shocks (minimum 1).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Annualised volatility of the shocked rates, fractional (0.12 = 12%).
    pub annual_volatility: f64,
    /// Horizon over which the shock materialises, in calendar days.
    pub horizon_days: u32,
    /// Seed for reproducible draws; entropy-seeded when absent.
    pub seed: Option<u64>,
}

fn default_num_simulations() -> u32 {
    1_000
}

/// Percentile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Descriptive statistics for one P&L series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlDistribution {
    pub count: u32,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: PlPercentiles,
    pub histogram: Vec<HistogramBin>,
}

/// Raw per-draw P&L totals, in draw order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlSamples {
    pub pl_unhedged: Vec<f64>,
    pub pl_hedged: Vec<f64>,
    pub pl_diff: Vec<f64>,
}

/// Output of a Monte Carlo P&L run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub num_simulations: u32,
    /// Shock standard deviation over the horizon:
    /// `annual_volatility * sqrt(horizon_days / 252)`.
    pub volatility_period: f64,
    /// Hedge ratio actually applied, after clamping to [0, 100].
    pub hedge_pct: Decimal,
    pub unhedged: PlDistribution,
    pub hedged: PlDistribution,
    pub diff: PlDistribution,
    /// Raw samples, sufficient to rebuild a histogram or a per-draw result
    /// file without re-running.
    pub samples: PlSamples,
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Compute the percentile value from a **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Build a histogram with `num_bins` equal-width bins.
fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let min_val = sorted[0];
    let max_val = sorted[sorted.len() - 1];

    // Degenerate distribution: one bin holding everything
    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| {
            let lower = min_val + i as f64 * bin_width;
            let upper = if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            };
            HistogramBin {
                lower,
                upper,
                count: 0,
                frequency: 0.0,
            }
        })
        .collect();

    for &val in sorted {
        let mut idx = ((val - min_val) / bin_width).floor() as usize;
        if idx >= num_bins {
            idx = num_bins - 1;
        }
        bins[idx].count += 1;
    }

    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }

    bins
}

/// Descriptive statistics over one P&L series. Sorts a copy; the caller's
/// draw-order sequence is untouched.
fn compute_distribution(series: &[f64]) -> PlDistribution {
    let mut sorted = series.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len() as f64;

    let mean = sorted.iter().sum::<f64>() / n;

    let median = if sorted.len() % 2 == 0 {
        let mid = sorted.len() / 2;
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    PlDistribution {
        count: sorted.len() as u32,
        mean,
        median,
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        percentiles: PlPercentiles {
            p5: percentile_sorted(&sorted, 5.0),
            p10: percentile_sorted(&sorted, 10.0),
            p25: percentile_sorted(&sorted, 25.0),
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
        },
        histogram: build_histogram(&sorted, HISTOGRAM_BINS),
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a Monte Carlo P&L distribution over the portfolio.
///
/// Draws `num_simulations` i.i.d. shocks from `Normal(0, volatility_period)`
/// where `volatility_period = annual_volatility * sqrt(horizon_days / 252)`,
/// feeds each through the deterministic shock simulator exactly once, and
/// summarises the unhedged, hedged, and difference series. A given seed
/// reproduces an identical sample sequence; no process-global RNG state is
/// touched.
pub fn run_monte_carlo(
    records: &[NormalizedRecord],
    hedge_pct: Decimal,
    forward_rates: &RateMap,
    input: &MonteCarloInput,
) -> FxRiskResult<ComputationOutput<MonteCarloOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // Validation
    if input.num_simulations < 1 {
        return Err(FxRiskError::InvalidInput {
            field: "num_simulations".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if !input.annual_volatility.is_finite() || input.annual_volatility <= 0.0 {
        return Err(FxRiskError::InvalidInput {
            field: "annual_volatility".into(),
            reason: "Must be a positive fraction, e.g. 0.12 for 12%".into(),
        });
    }
    if input.horizon_days < 1 {
        return Err(FxRiskError::InvalidInput {
            field: "horizon_days".into(),
            reason: "Must be at least 1".into(),
        });
    }

    let clamped = hedge_pct.clamp(Decimal::ZERO, dec!(100));
    if clamped != hedge_pct {
        warnings.push(format!(
            "hedge_pct {hedge_pct} outside [0, 100]; clamped to {clamped}"
        ));
    }
    if records.is_empty() {
        warnings.push("Empty portfolio: the P&L distribution is degenerate at zero".into());
    }

    let volatility_period =
        input.annual_volatility * (input.horizon_days as f64 / TRADING_DAYS_PER_YEAR).sqrt();

    let normal =
        Normal::new(0.0, volatility_period).map_err(|e| FxRiskError::InvalidInput {
            field: "annual_volatility".into(),
            reason: format!("Invalid Normal parameters: {e}"),
        })?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let n = input.num_simulations as usize;

    // Draws are separated from simulation so the loop below could be
    // parallelised without changing the sample sequence.
    let shocks: Vec<f64> = (0..n).map(|_| rng.sample(normal)).collect();

    let mut pl_unhedged = Vec::with_capacity(n);
    let mut pl_hedged = Vec::with_capacity(n);
    for &shock in &shocks {
        let shock_dec =
            Decimal::from_f64_retain(shock).ok_or_else(|| FxRiskError::InvalidInput {
                field: "shock".into(),
                reason: format!("Drawn shock {shock} is not representable"),
            })?;
        let scenario = simulate_shock(records, clamped, forward_rates, shock_dec);
        pl_unhedged.push(to_f64(scenario.total_pl_unhedged));
        pl_hedged.push(to_f64(scenario.total_pl_hedged));
    }

    let pl_diff: Vec<f64> = pl_hedged
        .iter()
        .zip(&pl_unhedged)
        .map(|(h, u)| h - u)
        .collect();

    let output = MonteCarloOutput {
        num_simulations: input.num_simulations,
        volatility_period,
        hedge_pct: clamped,
        unhedged: compute_distribution(&pl_unhedged),
        hedged: compute_distribution(&pl_hedged),
        diff: compute_distribution(&pl_diff),
        samples: PlSamples {
            pl_unhedged,
            pl_hedged,
            pl_diff,
        },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo FX P&L Distribution (Normal shocks, 252-day convention)",
        &serde_json::json!({
            "num_simulations": input.num_simulations,
            "annual_volatility": input.annual_volatility,
            "horizon_days": input.horizon_days,
            "volatility_period": volatility_period,
            "seed": input.seed,
            "hedge_pct": clamped.to_string(),
            "record_count": records.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn normalized(id: &str, ccy: &str, amount: Decimal, rate: Decimal) -> NormalizedRecord {
        NormalizedRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            currency: ccy.to_string(),
            amount_foreign: amount,
            description: None,
            fx_rate: rate,
            exposure_base: amount * rate,
        }
    }

    fn sample_records() -> Vec<NormalizedRecord> {
        vec![
            normalized("INV-001", "USD", dec!(15000), dec!(0.92)),
            normalized("INV-002", "USD", dec!(8000), dec!(0.94)),
            normalized("INV-003", "JPY", dec!(2000000), dec!(0.0069)),
            normalized("INV-004", "EUR", dec!(10000), dec!(1.0)),
        ]
    }

    fn input(sims: u32, seed: u64) -> MonteCarloInput {
        MonteCarloInput {
            num_simulations: sims,
            annual_volatility: 0.12,
            horizon_days: 90,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_same_seed_reproduces_identical_run() {
        let forwards = HashMap::from([("USD".to_string(), dec!(0.95))]);
        let a = run_monte_carlo(&sample_records(), dec!(50), &forwards, &input(500, 42)).unwrap();
        let b = run_monte_carlo(&sample_records(), dec!(50), &forwards, &input(500, 42)).unwrap();
        assert_eq!(a.result.samples.pl_unhedged, b.result.samples.pl_unhedged);
        assert_eq!(a.result.samples.pl_hedged, b.result.samples.pl_hedged);
        assert_eq!(a.result.unhedged.mean, b.result.unhedged.mean);
        assert_eq!(a.result.hedged.std_dev, b.result.hedged.std_dev);
        assert_eq!(
            a.result.unhedged.percentiles.p95,
            b.result.unhedged.percentiles.p95
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = run_monte_carlo(&sample_records(), dec!(50), &HashMap::new(), &input(200, 1))
            .unwrap();
        let b = run_monte_carlo(&sample_records(), dec!(50), &HashMap::new(), &input(200, 2))
            .unwrap();
        assert_ne!(a.result.samples.pl_unhedged, b.result.samples.pl_unhedged);
    }

    #[test]
    fn test_volatility_period_scaling() {
        let result =
            run_monte_carlo(&sample_records(), dec!(0), &HashMap::new(), &input(100, 7)).unwrap();
        let expected = 0.12 * (90.0_f64 / 252.0).sqrt();
        assert!((result.result.volatility_period - expected).abs() < 1e-12);
    }

    #[test]
    fn test_full_hedge_with_full_forwards_has_zero_std_dev() {
        let forwards = HashMap::from([
            ("USD".to_string(), dec!(0.95)),
            ("JPY".to_string(), dec!(0.0071)),
            ("EUR".to_string(), dec!(1.0)),
        ]);
        let result =
            run_monte_carlo(&sample_records(), dec!(100), &forwards, &input(300, 9)).unwrap();
        let hedged = &result.result.hedged;
        assert_eq!(hedged.std_dev, 0.0);
        assert_eq!(hedged.min, hedged.max);
        // Degenerate series collapses to a single histogram bin
        assert_eq!(hedged.histogram.len(), 1);
    }

    #[test]
    fn test_zero_hedge_makes_diff_series_zero() {
        let result =
            run_monte_carlo(&sample_records(), dec!(0), &HashMap::new(), &input(200, 3)).unwrap();
        assert!(result.result.samples.pl_diff.iter().all(|&d| d == 0.0));
        assert_eq!(result.result.diff.mean, 0.0);
    }

    #[test]
    fn test_histogram_counts_sum_to_simulations() {
        let result =
            run_monte_carlo(&sample_records(), dec!(30), &HashMap::new(), &input(500, 11))
                .unwrap();
        let unhedged = &result.result.unhedged;
        let total: u32 = unhedged.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 500);
        let freq_sum: f64 = unhedged.histogram.iter().map(|b| b.frequency).sum();
        assert!((freq_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_samples_kept_in_draw_order() {
        let result =
            run_monte_carlo(&sample_records(), dec!(0), &HashMap::new(), &input(50, 5)).unwrap();
        let samples = &result.result.samples.pl_unhedged;
        assert_eq!(samples.len(), 50);
        // A sorted sequence of 50 normal draws is monotone; draw order is not.
        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_ne!(*samples, sorted);
    }

    #[test]
    fn test_zero_simulations_rejected() {
        let bad = MonteCarloInput {
            num_simulations: 0,
            annual_volatility: 0.12,
            horizon_days: 90,
            seed: Some(1),
        };
        let err = run_monte_carlo(&sample_records(), dec!(0), &HashMap::new(), &bad).unwrap_err();
        assert!(matches!(err, FxRiskError::InvalidInput { ref field, .. } if field.as_str() == "num_simulations"));
    }

    #[test]
    fn test_non_positive_volatility_rejected() {
        let bad = MonteCarloInput {
            num_simulations: 100,
            annual_volatility: 0.0,
            horizon_days: 90,
            seed: Some(1),
        };
        let err = run_monte_carlo(&sample_records(), dec!(0), &HashMap::new(), &bad).unwrap_err();
        assert!(matches!(err, FxRiskError::InvalidInput { ref field, .. } if field.as_str() == "annual_volatility"));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let bad = MonteCarloInput {
            num_simulations: 100,
            annual_volatility: 0.12,
            horizon_days: 0,
            seed: Some(1),
        };
        let err = run_monte_carlo(&sample_records(), dec!(0), &HashMap::new(), &bad).unwrap_err();
        assert!(matches!(err, FxRiskError::InvalidInput { ref field, .. } if field.as_str() == "horizon_days"));
    }

    #[test]
    fn test_empty_portfolio_warns_and_degenerates_at_zero() {
        let result = run_monte_carlo(&[], dec!(50), &HashMap::new(), &input(100, 4)).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Empty portfolio")));
        assert_eq!(result.result.unhedged.mean, 0.0);
        assert_eq!(result.result.unhedged.std_dev, 0.0);
    }
}
