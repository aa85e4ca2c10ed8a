pub mod aggregate;
pub mod normalize;
pub mod record;

pub use aggregate::{aggregate_exposure, summarize_portfolio, Granularity, PeriodBucket};
pub use normalize::{normalize_records, NormalizedRecord};
pub use record::{parse_records, ExposureRecord, RawRow};
