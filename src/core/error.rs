//! Error types for benchmark runs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid fold count: {folds} folds requested for {records} ratings (need 2 <= k <= ratings)")]
    InvalidFoldCount { folds: usize, records: usize },

    #[error("Algorithm {name} failed: {cause}")]
    AlgorithmFailure { name: String, cause: String },

    #[error("Training failed: {0}")]
    TrainingFailure(String),

    #[error("Prediction failed: {0}")]
    PredictionFailure(String),

    #[error("Cannot aggregate metrics over zero folds")]
    EmptyMetrics,

    #[error("Results not found: {0}")]
    ResultsNotFound(PathBuf),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("Malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BenchError {
    /// Missing results are treated as "no prior data" by callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BenchError::ResultsNotFound(_))
    }

    /// Errors a run can continue past: a single algorithm failing, or a
    /// results table that does not exist yet.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BenchError::AlgorithmFailure { .. } | BenchError::ResultsNotFound(_)
        )
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(e: serde_json::Error) -> Self {
        BenchError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
