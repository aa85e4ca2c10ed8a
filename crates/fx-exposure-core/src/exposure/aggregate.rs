use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::exposure::normalize::NormalizedRecord;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::FxRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Calendar bucket width for exposure aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
}

impl Granularity {
    /// Truncate a date to the start of its bucket.
    fn truncate(&self, date: NaiveDate) -> NaiveDate {
        let month = match self {
            Granularity::Month => date.month(),
            Granularity::Quarter => (date.month0() / 3) * 3 + 1,
        };
        NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
    }

    /// The start of the bucket following `period`.
    fn advance(&self, period: NaiveDate) -> NaiveDate {
        let step = match self {
            Granularity::Month => 1,
            Granularity::Quarter => 3,
        };
        let month = period.month() + step;
        let (year, month) = if month > 12 {
            (period.year() + 1, month - 12)
        } else {
            (period.year(), month)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(period)
    }
}

/// Summed exposure for one calendar period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodBucket {
    /// Bucket start (month-start or quarter-start).
    pub period: NaiveDate,
    pub exposure_foreign_sum: Decimal,
    pub exposure_base_sum: Money,
    pub record_count: u32,
}

/// Output of a period aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationOutput {
    pub granularity: Granularity,
    pub buckets: Vec<PeriodBucket>,
}

/// Exposure summed over one currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyExposure {
    pub currency: String,
    pub amount_foreign_sum: Decimal,
    pub exposure_base_sum: Money,
    pub record_count: u32,
}

/// Portfolio-level KPIs plus the per-currency breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_exposure_base: Money,
    pub hedge_pct: Decimal,
    /// Theoretical covered exposure: `total * hedge_pct / 100`.
    pub hedged_exposure_base: Money,
    pub record_count: u32,
    pub by_currency: Vec<CurrencyExposure>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Bucket records into calendar periods and sum foreign and base exposure.
///
/// Buckets are sorted ascending by period; duplicates within a period
/// accumulate. Periods with no activity are absent unless `fill_gaps` is set,
/// in which case zero-valued buckets are emitted between the first and last
/// active period. An empty record set yields an empty bucket list.
pub fn aggregate_exposure(
    records: &[NormalizedRecord],
    granularity: Granularity,
    fill_gaps: bool,
) -> FxRiskResult<ComputationOutput<AggregationOutput>> {
    let start = Instant::now();
    let warnings: Vec<String> = Vec::new();

    let mut buckets: BTreeMap<NaiveDate, PeriodBucket> = BTreeMap::new();
    for record in records {
        let period = granularity.truncate(record.date);
        let bucket = buckets.entry(period).or_insert_with(|| PeriodBucket {
            period,
            exposure_foreign_sum: Decimal::ZERO,
            exposure_base_sum: Decimal::ZERO,
            record_count: 0,
        });
        bucket.exposure_foreign_sum += record.amount_foreign;
        bucket.exposure_base_sum += record.exposure_base;
        bucket.record_count += 1;
    }

    if fill_gaps {
        let bounds = (
            buckets.keys().next().copied(),
            buckets.keys().next_back().copied(),
        );
        if let (Some(first), Some(last)) = bounds {
            let mut period = first;
            while period < last {
                period = granularity.advance(period);
                buckets.entry(period).or_insert_with(|| PeriodBucket {
                    period,
                    exposure_foreign_sum: Decimal::ZERO,
                    exposure_base_sum: Decimal::ZERO,
                    record_count: 0,
                });
            }
        }
    }

    let output = AggregationOutput {
        granularity,
        buckets: buckets.into_values().collect(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Calendar-Period Exposure Aggregation",
        &serde_json::json!({
            "granularity": granularity,
            "fill_gaps": fill_gaps,
            "record_count": records.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Portfolio KPIs: total base exposure, theoretical hedged exposure at the
/// given hedge ratio, and a per-currency breakdown sorted by currency code.
pub fn summarize_portfolio(
    records: &[NormalizedRecord],
    hedge_pct: Decimal,
) -> FxRiskResult<ComputationOutput<PortfolioSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let clamped = hedge_pct.clamp(Decimal::ZERO, dec!(100));
    if clamped != hedge_pct {
        warnings.push(format!(
            "hedge_pct {hedge_pct} outside [0, 100]; clamped to {clamped}"
        ));
    }

    let mut by_currency: BTreeMap<String, CurrencyExposure> = BTreeMap::new();
    let mut total_exposure_base = Decimal::ZERO;
    for record in records {
        total_exposure_base += record.exposure_base;
        let entry = by_currency
            .entry(record.currency.clone())
            .or_insert_with(|| CurrencyExposure {
                currency: record.currency.clone(),
                amount_foreign_sum: Decimal::ZERO,
                exposure_base_sum: Decimal::ZERO,
                record_count: 0,
            });
        entry.amount_foreign_sum += record.amount_foreign;
        entry.exposure_base_sum += record.exposure_base;
        entry.record_count += 1;
    }

    let output = PortfolioSummary {
        total_exposure_base,
        hedge_pct: clamped,
        hedged_exposure_base: total_exposure_base * clamped / dec!(100),
        record_count: records.len() as u32,
        by_currency: by_currency.into_values().collect(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio Exposure Summary",
        &serde_json::json!({
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
    use rust_decimal_macros::dec;

    fn normalized(id: &str, date: (i32, u32, u32), ccy: &str, amount: Decimal, rate: Decimal) -> NormalizedRecord {
        NormalizedRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            currency: ccy.to_string(),
            amount_foreign: amount,
            description: None,
            fx_rate: rate,
            exposure_base: amount * rate,
        }
    }

    fn sample_records() -> Vec<NormalizedRecord> {
        vec![
            normalized("INV-001", (2025, 1, 15), "USD", dec!(15000), dec!(0.92)),
            normalized("INV-002", (2025, 2, 10), "USD", dec!(8000), dec!(0.94)),
            normalized("INV-003", (2025, 3, 5), "JPY", dec!(2000000), dec!(0.0069)),
            normalized("INV-004", (2025, 4, 20), "EUR", dec!(10000), dec!(1.0)),
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quarterly_buckets() {
        let result = aggregate_exposure(&sample_records(), Granularity::Quarter, false).unwrap();
        let buckets = &result.result.buckets;
        assert_eq!(buckets.len(), 2);

        // Q1 2025: three records
        assert_eq!(buckets[0].period, date(2025, 1, 1));
        assert_eq!(buckets[0].record_count, 3);
        assert_eq!(
            buckets[0].exposure_base_sum,
            dec!(13800) + dec!(7520) + dec!(13800)
        );

        // Q2 2025: one record
        assert_eq!(buckets[1].period, date(2025, 4, 1));
        assert_eq!(buckets[1].record_count, 1);
        assert_eq!(buckets[1].exposure_base_sum, dec!(10000));
    }

    #[test]
    fn test_monthly_buckets_sorted_ascending() {
        let result = aggregate_exposure(&sample_records(), Granularity::Month, false).unwrap();
        let buckets = &result.result.buckets;
        assert_eq!(buckets.len(), 4);
        let periods: Vec<NaiveDate> = buckets.iter().map(|b| b.period).collect();
        assert_eq!(
            periods,
            vec![date(2025, 1, 1), date(2025, 2, 1), date(2025, 3, 1), date(2025, 4, 1)]
        );
    }

    #[test]
    fn test_duplicates_within_period_accumulate() {
        let records = vec![
            normalized("A", (2025, 1, 5), "USD", dec!(100), dec!(0.9)),
            normalized("B", (2025, 1, 25), "USD", dec!(200), dec!(0.9)),
        ];
        let result = aggregate_exposure(&records, Granularity::Month, false).unwrap();
        let buckets = &result.result.buckets;
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].exposure_foreign_sum, dec!(300));
        assert_eq!(buckets[0].exposure_base_sum, dec!(270.0));
        assert_eq!(buckets[0].record_count, 2);
    }

    #[test]
    fn test_silent_months_absent_without_gap_filling() {
        let records = vec![
            normalized("A", (2025, 1, 5), "USD", dec!(100), dec!(0.9)),
            normalized("B", (2025, 4, 25), "USD", dec!(200), dec!(0.9)),
        ];
        let result = aggregate_exposure(&records, Granularity::Month, false).unwrap();
        assert_eq!(result.result.buckets.len(), 2);
    }

    #[test]
    fn test_gap_filling_emits_zero_buckets() {
        let records = vec![
            normalized("A", (2025, 1, 5), "USD", dec!(100), dec!(0.9)),
            normalized("B", (2025, 4, 25), "USD", dec!(200), dec!(0.9)),
        ];
        let result = aggregate_exposure(&records, Granularity::Month, true).unwrap();
        let buckets = &result.result.buckets;
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[1].period, date(2025, 2, 1));
        assert_eq!(buckets[1].exposure_base_sum, Decimal::ZERO);
        assert_eq!(buckets[1].record_count, 0);
        assert_eq!(buckets[2].period, date(2025, 3, 1));
        assert_eq!(buckets[2].record_count, 0);
    }

    #[test]
    fn test_quarter_gap_filling_crosses_year_end() {
        let records = vec![
            normalized("A", (2024, 11, 5), "USD", dec!(100), dec!(0.9)),
            normalized("B", (2025, 5, 25), "USD", dec!(200), dec!(0.9)),
        ];
        let result = aggregate_exposure(&records, Granularity::Quarter, true).unwrap();
        let periods: Vec<NaiveDate> = result.result.buckets.iter().map(|b| b.period).collect();
        assert_eq!(
            periods,
            vec![date(2024, 10, 1), date(2025, 1, 1), date(2025, 4, 1)]
        );
    }

    #[test]
    fn test_empty_records_yield_empty_buckets() {
        let result = aggregate_exposure(&[], Granularity::Quarter, true).unwrap();
        assert!(result.result.buckets.is_empty());
    }

    #[test]
    fn test_portfolio_summary_totals() {
        let result = summarize_portfolio(&sample_records(), dec!(50)).unwrap();
        let summary = &result.result;
        assert_eq!(summary.total_exposure_base, dec!(45120));
        assert_eq!(summary.hedged_exposure_base, dec!(22560));
        assert_eq!(summary.record_count, 4);

        // Sorted by currency code
        let codes: Vec<&str> = summary.by_currency.iter().map(|c| c.currency.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "JPY", "USD"]);
        let usd = &summary.by_currency[2];
        assert_eq!(usd.amount_foreign_sum, dec!(23000));
        assert_eq!(usd.exposure_base_sum, dec!(13800) + dec!(7520));
        assert_eq!(usd.record_count, 2);
    }

    #[test]
    fn test_summary_clamps_hedge_ratio_with_warning() {
        let result = summarize_portfolio(&sample_records(), dec!(140)).unwrap();
        assert_eq!(result.result.hedge_pct, dec!(100));
        assert_eq!(result.result.hedged_exposure_base, dec!(45120));
        assert_eq!(result.warnings.len(), 1);
    }
}
