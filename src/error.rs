//! Error types for edakit
//!
//! One failure family per stage of a run (loading a table, computing a
//! metric, exporting a report) plus config loading. `PipelineError` wraps
//! all of them for callers that drive the whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a flat file into a [`Table`](crate::types::Table)
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input has no header row")]
    MissingHeader,

    #[error("Duplicate column name in header: {0}")]
    DuplicateColumn(String),

    #[error("Line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("Dataset '{dataset}' requires column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error("Cannot match the table columns to any known dataset")]
    UnknownDataset,

    #[error("Invalid table: {0}")]
    Table(#[from] ComputeError),
}

/// Errors raised while evaluating metrics or deriving columns
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column '{0}' is not numeric")]
    NonNumeric(String),

    #[error("Column '{0}' has no non-null numeric values")]
    EmptyColumn(String),

    #[error("Column '{column}' needs at least {needed} values, found {found}")]
    InsufficientValues {
        column: String,
        needed: usize,
        found: usize,
    },

    #[error("Column '{0}' does not hold dates")]
    NotADate(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow while summing '{0}'")]
    Overflow(String),

    #[error("Row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<ComputeError>,
    },

    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("Duplicate metric name: {0}")]
    DuplicateMetric(String),

    #[error("Invalid metric '{metric}': {reason}")]
    InvalidMetric { metric: String, reason: String },

    #[error("Row {row} has {found} values, table has {expected} columns")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row}: column '{column}' holds {expected} values, got another type")]
    TypeMismatch {
        row: usize,
        column: String,
        expected: &'static str,
    },

    #[error("Metric '{metric}' failed: {source}")]
    Metric {
        metric: String,
        #[source]
        source: Box<ComputeError>,
    },
}

/// Errors raised while turning a [`Report`](crate::report::Report) into JSON
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Metric '{metric}' contains a non-finite number")]
    NonFinite { metric: String },

    #[error("Metric '{metric}' has two group keys that both render as '{key}'")]
    DuplicateKey { metric: String, key: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while reading a [`PipelineConfig`](crate::config::PipelineConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Any failure of a full load → compute → export run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
