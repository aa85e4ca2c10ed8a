pub mod error;
pub mod exposure;
pub mod types;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::FxRiskError;
pub use types::*;

/// Standard result type for all fx-exposure operations
pub type FxRiskResult<T> = Result<T, FxRiskError>;
