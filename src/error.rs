//! Crate-wide error type.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bench::RunState;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Error type for generation, benchmarking and aggregation.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A required source file or dataset is absent.
    #[error("missing input: {0}")]
    MissingInput(PathBuf),
    /// Statistics were requested over zero observations.
    #[error("cannot compute statistics over an empty sample")]
    EmptySample,
    /// An edge references a node that was never generated.
    #[error("referential violation: {kind} edge {from} -> {to} references an unknown node")]
    ReferentialViolation {
        /// Edge kind label.
        kind: &'static str,
        /// Source identifier.
        from: String,
        /// Target identifier.
        to: String,
    },
    /// An edge timestamp precedes one of its endpoints.
    #[error("temporal violation: {0}")]
    TemporalViolation(String),
    /// A structural rule of the graph does not hold, e.g. an owner grant
    /// without full capabilities.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// Caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Benchmark run state machine was driven out of order.
    #[error("invalid run transition: {from} -> {to}")]
    InvalidTransition {
        /// State the run was in.
        from: RunState,
        /// State that was requested.
        to: RunState,
    },
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// CSV encoding or decoding error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON encoding or decoding error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Arrow array or record batch error.
    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),
    /// Parquet encoding or decoding error.
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    /// Error reported by the SQLite store.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// Configuration file could not be parsed.
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl BenchError {
    pub(crate) fn missing_input(path: impl AsRef<Path>) -> Self {
        BenchError::MissingInput(path.as_ref().to_path_buf())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        BenchError::InvalidArgument(msg.into())
    }
}
