//! Core traits for pluggable rating predictors

use crate::core::{Dataset, Result};

/// A rating prediction algorithm that can be trained on a dataset
///
/// Implementations are opaque to the benchmark: the only contract is that
/// `fit` produces a [`Predictor`] or fails with
/// [`BenchError::TrainingFailure`](crate::core::BenchError::TrainingFailure).
pub trait Algorithm: Send + Sync {
    /// Display name used in logs
    fn name(&self) -> &str;

    /// Train on the given ratings
    fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>>;
}

/// Trained state of an algorithm
pub trait Predictor: Send + Sync {
    /// Estimate the rating `user_id` would give `item_id`
    ///
    /// How unknown users or items are handled is up to the implementation:
    /// it may fall back to a default estimate or fail with
    /// [`BenchError::PredictionFailure`](crate::core::BenchError::PredictionFailure).
    fn predict(&self, user_id: &str, item_id: &str) -> Result<f64>;

    /// Estimate a batch of (user, item) pairs
    fn predict_batch(&self, pairs: &[(&str, &str)]) -> Result<Vec<f64>> {
        pairs.iter().map(|(u, i)| self.predict(u, i)).collect()
    }
}
