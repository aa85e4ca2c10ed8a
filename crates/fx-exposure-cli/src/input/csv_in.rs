use serde_json::Value;
use std::fs;

use fx_exposure_core::exposure::RawRow;

/// Read an invoice CSV file into raw rows for the core parser.
pub fn read_rows_from_path(path: &str) -> Result<Vec<RawRow>, Box<dyn std::error::Error>> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{path}': {e}"))?;
    read_rows_from_str(&contents)
}

/// Parse CSV text into raw rows: one field-name → string-value map per row.
/// All cells stay raw strings; type coercion is the core's job.
pub fn read_rows_from_str(text: &str) -> Result<Vec<RawRow>, Box<dyn std::error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format!("Unreadable CSV header: {e}"))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("Unreadable CSV at data row {index}: {e}"))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
