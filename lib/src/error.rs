use thiserror::Error;

/// Invalid generalization options. Raised while building a generalizer,
/// before any data is fetched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for option {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("option {key} out of range: {value} ({reason})")]
    OutOfRange {
        key: String,
        value: String,
        reason: &'static str,
    },
}

/// A generalizer could not process a series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneralizationError {
    #[error("maximum number of entries exceeded for series {series} ({actual}>{allowed})")]
    MaxEntriesExceeded {
        series: String,
        actual: usize,
        allowed: usize,
    },
}
