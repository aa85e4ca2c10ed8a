use serde_json::Value;
use std::io;
use tabled::{builder::Builder, Table};

use crate::OutputFormat;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => print_table(value),
        OutputFormat::Csv => print_csv(value),
        OutputFormat::Minimal => print_minimal(value),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Fields whose rows would drown the terminal; JSON output carries them.
const SUPPRESSED_IN_TABLE: [&str; 2] = ["samples", "histogram"];

fn print_table(value: &Value) {
    let Some(map) = value.as_object() else {
        println!("{}", value);
        return;
    };

    // Envelope-shaped output: result + warnings + methodology
    let result = map.get("result").unwrap_or(value);
    match result {
        Value::Object(fields) => print_object_tables(fields),
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", other),
    }

    if let Some(Value::Array(warnings)) = map.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }
    if let Some(Value::String(methodology)) = map.get("methodology") {
        println!("\nMethodology: {}", methodology);
    }
}

/// Scalar fields first as a field/value table, then one table per
/// array-of-objects field (scenarios, buckets, records, by_currency...).
fn print_object_tables(fields: &serde_json::Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut scalar_count = 0;
    for (key, val) in fields {
        if SUPPRESSED_IN_TABLE.contains(&key.as_str()) {
            continue;
        }
        match val {
            Value::Array(_) => continue,
            Value::Object(nested) => {
                for (sub, v) in nested {
                    if !matches!(v, Value::Array(_) | Value::Object(_)) {
                        builder.push_record([format!("{key}.{sub}"), flat_value(v)]);
                        scalar_count += 1;
                    }
                }
            }
            _ => {
                builder.push_record([key.clone(), flat_value(val)]);
                scalar_count += 1;
            }
        }
    }
    if scalar_count > 0 {
        println!("{}", Table::from(builder));
    }

    for (key, val) in fields {
        if SUPPRESSED_IN_TABLE.contains(&key.as_str()) {
            continue;
        }
        if let Value::Array(rows) = val {
            println!("\n{key}:");
            print_rows(rows);
        }
    }
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = rows.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for row in rows {
            if let Value::Object(map) = row {
                builder.push_record(
                    headers
                        .iter()
                        .map(|h| map.get(h.as_str()).map(flat_value).unwrap_or_default()),
                );
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for row in rows {
            println!("{}", flat_value(row));
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(fields) => {
            // Prefer the first array-of-objects field: that is the table the
            // caller wants to pipe onward.
            let rows = fields.values().find_map(|v| match v {
                Value::Array(rows) if matches!(rows.first(), Some(Value::Object(_))) => {
                    Some(rows)
                }
                _ => None,
            });
            match rows {
                Some(rows) => write_rows_csv(&mut wtr, rows),
                None => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in fields {
                        let _ = wtr.write_record([key.as_str(), &csv_value(val)]);
                    }
                }
            }
        }
        Value::Array(rows) => write_rows_csv(&mut wtr, rows),
        other => {
            let _ = wtr.write_record([&csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    if rows.is_empty() {
        return;
    }
    if let Some(Value::Object(first)) = rows.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);
        for row in rows {
            if let Value::Object(map) = row {
                let record: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&record);
            }
        }
    } else {
        for row in rows {
            let _ = wtr.write_record([&csv_value(row)]);
        }
    }
}

// ---------------------------------------------------------------------------
// Minimal
// ---------------------------------------------------------------------------

/// Print just the key answer value from the output.
fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // The headline figure per command family, first match wins
    let priority_keys = [
        "total_exposure_base",
        "hedged_exposure_base",
        "total_pl_hedged",
        "total_pl_unhedged",
    ];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", flat_value(val));
                    return;
                }
            }
        }
        // Monte Carlo: headline is the hedged mean
        if let Some(mean) = map.get("hedged").and_then(|h| h.get("mean")) {
            println!("{}", flat_value(mean));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, flat_value(val));
            return;
        }
    }

    println!("{}", flat_value(result));
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn flat_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(flat_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
