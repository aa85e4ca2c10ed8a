use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::exposure::normalize::NormalizedRecord;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, RateMap};
use crate::FxRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// P&L of the portfolio under one deterministic rate shock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockScenario {
    /// Fractional shock applied to every booking rate (-0.10 = -10%).
    pub shock_pct: Decimal,
    pub total_pl_unhedged: Money,
    pub total_pl_hedged: Money,
    /// `total_pl_hedged - total_pl_unhedged`.
    pub delta_hedge: Money,
}

/// Output of a multi-scenario shock simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockSimulationOutput {
    /// Hedge ratio actually applied, after clamping to [0, 100].
    pub hedge_pct: Decimal,
    pub scenarios: Vec<ShockScenario>,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Portfolio P&L under a single shock, with a partial forward hedge.
///
/// Per record: `spot = fx_rate * (1 + shock_pct)`; the forward rate is looked
/// up per currency and defaults to the record's own booking rate when absent
/// (an undefined forward is a valid state, not an error).
///
/// `pl_unhedged = (spot - fx_rate) * amount_foreign`
/// `pl_hedged   = ((1-h)*(spot - fx_rate) + h*(forward - fx_rate)) * amount_foreign`
///
/// with `h = hedge_pct / 100` after clamping to [0, 100]. By construction
/// `hedge_pct = 0` makes the hedged and unhedged P&L identical, and
/// `hedge_pct = 100` with a forward for every currency makes the hedged P&L
/// independent of the shock.
pub fn simulate_shock(
    records: &[NormalizedRecord],
    hedge_pct: Decimal,
    forward_rates: &RateMap,
    shock_pct: Decimal,
) -> ShockScenario {
    let h = hedge_pct.clamp(Decimal::ZERO, dec!(100)) / dec!(100);

    let mut total_pl_unhedged = Decimal::ZERO;
    let mut total_pl_hedged = Decimal::ZERO;

    for record in records {
        let spot: Rate = record.fx_rate * (Decimal::ONE + shock_pct);
        let forward: Rate = forward_rates
            .get(&record.currency)
            .copied()
            .unwrap_or(record.fx_rate);

        let spot_move = spot - record.fx_rate;
        let forward_move = forward - record.fx_rate;

        total_pl_unhedged += spot_move * record.amount_foreign;
        total_pl_hedged +=
            ((Decimal::ONE - h) * spot_move + h * forward_move) * record.amount_foreign;
    }

    ShockScenario {
        shock_pct,
        total_pl_unhedged,
        total_pl_hedged,
        delta_hedge: total_pl_hedged - total_pl_unhedged,
    }
}

/// Run one `ShockScenario` per input shock, preserving input order.
/// Duplicate shock values are computed independently, not deduplicated.
pub fn simulate_shocks(
    records: &[NormalizedRecord],
    hedge_pct: Decimal,
    forward_rates: &RateMap,
    shocks: &[Decimal],
) -> FxRiskResult<ComputationOutput<ShockSimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let clamped = hedge_pct.clamp(Decimal::ZERO, dec!(100));
    if clamped != hedge_pct {
        warnings.push(format!(
            "hedge_pct {hedge_pct} outside [0, 100]; clamped to {clamped}"
        ));
    }

    if clamped > Decimal::ZERO {
        let uncovered: BTreeSet<&str> = records
            .iter()
            .filter(|r| !forward_rates.contains_key(&r.currency))
            .map(|r| r.currency.as_str())
            .collect();
        if !uncovered.is_empty() {
            warnings.push(format!(
                "No forward rate for {}; hedged legs fall back to booking rates",
                uncovered.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    let scenarios: Vec<ShockScenario> = shocks
        .iter()
        .map(|&shock| simulate_shock(records, clamped, forward_rates, shock))
        .collect();

    let output = ShockSimulationOutput {
        hedge_pct: clamped,
        scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic FX Shock Simulation with Partial Forward Hedge",
        &serde_json::json!({
            "hedge_pct": clamped.to_string(),
            "shocks": shocks.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "forward_rates": forward_rates
                .iter()
                .map(|(c, r)| (c.clone(), r.to_string()))
                .collect::<std::collections::BTreeMap<_, _>>(),
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
