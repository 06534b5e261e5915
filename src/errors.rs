//! Error types for movie-bench
//!
//! This module defines the errors that can occur while configuring,
//! validating and running the benchmark suite.

use thiserror::Error;

/// Errors that can occur during a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("No database url set.")]
    MissingDatabaseUrl,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown benchmark: {0}")]
    UnknownScenario(String),

    #[error("There must be at least one runner for the benchmark to run")]
    NoRunners,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Benchmark \"{scenario}\" failed for {runner}: {source}")]
    ScenarioFailed {
        scenario: &'static str,
        runner: String,
        #[source]
        source: Box<BenchError>,
    },

    #[error("Benchmark {scenario} is not comparing the same data for all providers.")]
    Mismatch { scenario: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;
