use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FxRiskError;
use crate::types::CurrencyCode;
use crate::FxRiskResult;

/// One row of an uploaded tabular source, field-name → raw value.
/// Loaders deliver strings; numeric cells may arrive as JSON numbers.
pub type RawRow = serde_json::Map<String, Value>;

/// A single foreign-currency transaction, immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub id: String,
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    /// Foreign-currency amount, any sign. Sign carries economic meaning
    /// (refund vs charge) and is never clamped.
    pub amount_foreign: Decimal,
    /// Base units per 1 foreign unit, fixed when the transaction was booked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Required columns with their accepted header aliases. The first alias is
/// the canonical name reported in a schema error.
const REQUIRED: [&[&str]; 4] = [
    &["id", "invoice_id"],
    &["date"],
    &["currency"],
    &["amount_foreign"],
];

const BOOKING_RATE_ALIASES: [&str; 2] = ["booking_rate", "fx_rate_at_booking"];
const DATE_FORMAT: &str = "%Y-%m-%d";

fn lookup<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|a| row.get(*a))
}

/// Coerce a raw cell to a trimmed string. Null and blank cells count as absent.
fn cell_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn cell_display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn required_string(row: &RawRow, index: usize, aliases: &[&str]) -> FxRiskResult<String> {
    let raw = lookup(row, aliases);
    raw.and_then(cell_string)
        .ok_or_else(|| FxRiskError::InvalidField {
            row: index,
            field: aliases[0].to_string(),
            value: cell_display(raw),
        })
}

/// Parse and validate a raw row set into exposure records.
///
/// The schema check runs against the first row's columns and reports every
/// missing required column at once, not just the first. Per-row coercion
/// failures identify the zero-based row index and the offending raw value.
/// Empty input is valid and yields an empty collection.
pub fn parse_records(rows: &[RawRow]) -> FxRiskResult<Vec<ExposureRecord>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|aliases| lookup(first, aliases).is_none())
        .map(|aliases| aliases[0].to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FxRiskError::MissingColumns { columns: missing });
    }

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let id = required_string(row, index, REQUIRED[0])?;
        let currency = required_string(row, index, REQUIRED[2])?;

        let date_raw = required_string(row, index, REQUIRED[1])?;
        let date = NaiveDate::parse_from_str(&date_raw, DATE_FORMAT).map_err(|_| {
            FxRiskError::InvalidField {
                row: index,
                field: "date".into(),
                value: date_raw.clone(),
            }
        })?;

        let amount_raw = required_string(row, index, REQUIRED[3])?;
        let amount_foreign: Decimal =
            amount_raw
                .parse()
                .map_err(|_| FxRiskError::InvalidField {
                    row: index,
                    field: "amount_foreign".into(),
                    value: amount_raw.clone(),
                })?;

        // Optional booking rate: blank means absent, garbage is a rate error.
        let booking_rate = match lookup(row, &BOOKING_RATE_ALIASES).and_then(cell_string) {
            Some(raw) => Some(raw.parse::<Decimal>().map_err(|_| {
                FxRiskError::InvalidRate {
                    currency: currency.clone(),
                    value: raw.clone(),
                }
            })?),
            None => None,
        };

        let description = row.get("description").and_then(cell_string);

        records.push(ExposureRecord {
            id,
            date,
            currency,
            amount_foreign,
            booking_rate,
            description,
        });
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
