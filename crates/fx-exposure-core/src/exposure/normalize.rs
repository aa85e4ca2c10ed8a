use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FxRiskError;
use crate::exposure::record::ExposureRecord;
use crate::types::{CurrencyCode, Money, Rate, RateMap};
use crate::FxRiskResult;

/// An exposure record with its conversion rate resolved and the
/// base-currency exposure computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    pub amount_foreign: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resolved rate: the record's own booking rate when present, otherwise
    /// the caller-supplied mapping (base currency implicitly 1.0).
    pub fx_rate: Rate,
    /// `amount_foreign * fx_rate`, unrounded.
    pub exposure_base: Money,
}

fn positive_rate(currency: &str, rate: Decimal) -> FxRiskResult<Rate> {
    if rate <= Decimal::ZERO {
        return Err(FxRiskError::InvalidRate {
            currency: currency.to_string(),
            value: rate.to_string(),
        });
    }
    Ok(rate)
}

/// Resolve `fx_rate` and compute `exposure_base` for every record.
///
/// Resolution order per record: explicit booking rate, then the base currency
/// itself (1.0), then `manual_rates`. A currency with no resolvable rate is a
/// hard `MissingRate` failure raised before any aggregate exists — there is no
/// silent default to 1.0. Deterministic: no clock, no network, no global
/// state; live-rate fetching and fallback tables are the caller's job.
pub fn normalize_records(
    records: &[ExposureRecord],
    base_currency: &str,
    manual_rates: &RateMap,
) -> FxRiskResult<Vec<NormalizedRecord>> {
    let mut normalized = Vec::with_capacity(records.len());

    for record in records {
        let fx_rate = match record.booking_rate {
            Some(rate) => positive_rate(&record.currency, rate)?,
            None if record.currency == base_currency => Decimal::ONE,
            None => match manual_rates.get(&record.currency) {
                Some(&rate) => positive_rate(&record.currency, rate)?,
                None => {
                    return Err(FxRiskError::MissingRate {
                        currency: record.currency.clone(),
                    })
                }
            },
        };

        normalized.push(NormalizedRecord {
            id: record.id.clone(),
            date: record.date,
            currency: record.currency.clone(),
            amount_foreign: record.amount_foreign,
            description: record.description.clone(),
            fx_rate,
            exposure_base: record.amount_foreign * fx_rate,
        });
    }

    Ok(normalized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
