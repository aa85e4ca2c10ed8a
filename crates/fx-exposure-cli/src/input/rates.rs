use rust_decimal::Decimal;
use serde_json::Value;
use std::fs;
use std::path::Path;

use fx_exposure_core::types::RateMap;

/// Build the currency → rate mapping from a static rate table file and
/// repeated `CCY=RATE` flags. Flags override file entries, so a manual rate
/// can patch a stale table.
pub fn build_rate_map(
    pairs: &[String],
    file: Option<&str>,
) -> Result<RateMap, Box<dyn std::error::Error>> {
    let mut map = match file {
        Some(path) => read_rate_table(path)?,
        None => RateMap::new(),
    };
    for pair in pairs {
        let (currency, rate) = parse_pair(pair)?;
        map.insert(currency, rate);
    }
    Ok(map)
}

fn parse_pair(pair: &str) -> Result<(String, Decimal), Box<dyn std::error::Error>> {
    let (currency, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("Expected CCY=RATE, got '{pair}'"))?;
    let rate: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| format!("Invalid rate '{}' for {}", raw.trim(), currency.trim()))?;
    Ok((currency.trim().to_string(), rate))
}

/// Read a YAML or JSON rate table: a flat mapping of currency code to rate.
/// Rates may be written as numbers or strings.
fn read_rate_table(path: &str) -> Result<RateMap, Box<dyn std::error::Error>> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;

    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let value: Value = if extension == "yaml" || extension == "yml" {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{path}' as YAML: {e}"))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{path}' as JSON: {e}"))?
    };

    let Value::Object(entries) = value else {
        return Err(format!("'{path}' must be a flat mapping of currency to rate").into());
    };

    let mut map = RateMap::new();
    for (currency, raw) in entries {
        let text = match raw {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(
                    format!("Invalid rate for {currency} in '{path}': {other}").into()
                )
            }
        };
        let rate: Decimal = text
            .trim()
            .parse()
            .map_err(|_| format!("Invalid rate '{text}' for {currency} in '{path}'"))?;
        map.insert(currency, rate);
    }
    Ok(map)
}
