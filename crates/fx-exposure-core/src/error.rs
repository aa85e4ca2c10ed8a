use thiserror::Error;

#[derive(Debug, Error)]
pub enum FxRiskError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Row {row}: cannot parse field '{field}' from value '{value}'")]
    InvalidField {
        row: usize,
        field: String,
        value: String,
    },

    #[error("No conversion rate available for currency {currency}")]
    MissingRate { currency: String },

    #[error("Invalid rate for currency {currency}: '{value}' (must be a positive decimal)")]
    InvalidRate { currency: String, value: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FxRiskError {
    fn from(e: serde_json::Error) -> Self {
        FxRiskError::SerializationError(e.to_string())
    }
}
