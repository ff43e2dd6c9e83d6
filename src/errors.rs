//! Error types for tape loading and configuration

use thiserror::Error;

/// Failures that reject a tape at the parsing stage.
///
/// Malformed individual rows are not errors; they are skipped and counted in
/// [`crate::tape_parser::ParseStats`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Tape needs a header and at least one data row, got {lines} non-empty line(s)")]
    TooFewLines { lines: usize },

    #[error("Header is missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("No valid data rows in tape")]
    NoValidRows,

    #[error("CSV read error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },
}

/// Failures producing a bar series from parsed ticks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("No ticks to aggregate")]
    EmptyInput,

    #[error("No tick carried a valid date and time")]
    NoValidBars,
}

/// Anything that makes `load` fail
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source error: {source}")]
    Source {
        #[from]
        source: config::ConfigError,
    },

    #[error("Invalid time of day '{value}' for {field} (expected HH:MM:SS)")]
    InvalidTimeOfDay { field: &'static str, value: String },

    #[error("Lunch break must end after it starts ({start} >= {end})")]
    EmptyLunchBreak { start: String, end: String },

    #[error("Unsupported speed multiplier {value}")]
    InvalidSpeed { value: f64 },

    #[error("Tick period must be positive")]
    InvalidTickPeriod,
}
