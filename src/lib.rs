//! Cross-validated benchmarking of rating prediction algorithms
//!
//! Splits a rating dataset into k folds, trains and scores every configured
//! algorithm on the same folds, aggregates RMSE and MAE across folds, and
//! keeps the results in CSV tables that can be compared across datasets.

pub mod algorithms;
pub mod compare;
pub mod config;
pub mod core;
pub mod data;
pub mod evaluator;
pub mod folds;
pub mod metrics;
pub mod persistence;
pub mod runner;

// Re-export main types for convenience
pub use crate::algorithms::{resolve, AlgorithmKind};
pub use crate::compare::{Comparison, ComparisonEngine, ComparisonRow, ComparisonTable};
pub use crate::config::{AlgorithmSelection, BenchmarkConfig};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{CsvSource, DatasetId, DelimitedSource, RatingSource, SourceFormat};
pub use crate::evaluator::{Evaluator, FailurePolicy};
pub use crate::folds::{Fold, FoldPartition, FoldPartitioner};
pub use crate::metrics::MetricsAggregator;
pub use crate::persistence::{ResultStore, WriteMode};
pub use crate::runner::{AlgorithmEntry, BenchmarkRunner, RunReport};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
