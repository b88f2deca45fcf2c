//! Cross-validated evaluation of a single algorithm
//!
//! For every fold the evaluator times `fit` on the training ratings, then
//! times predicting every test rating and measures RMSE and MAE against the
//! true values. Nothing is written to disk.

use crate::core::{
    Algorithm, AlgorithmSpec, BenchError, Dataset, FoldMetrics, Predictor, Result,
};
use crate::folds::{Fold, FoldPartition};
use crate::metrics::{mae, rmse};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What to do when a fold fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failing fold discards the whole algorithm
    #[default]
    FailFast,
    /// Skip failing folds and aggregate the rest
    BestEffort,
}

/// Drives one algorithm through every fold of a partition
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    policy: FailurePolicy,
}

impl Evaluator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Metrics for every fold, or `AlgorithmFailure` naming `spec`
    pub fn evaluate(
        &self,
        spec: &AlgorithmSpec,
        algorithm: &dyn Algorithm,
        partition: &FoldPartition,
        dataset: &Dataset,
    ) -> Result<Vec<FoldMetrics>> {
        let mut metrics = Vec::with_capacity(partition.len());
        let mut last_error = None;

        for fold in partition.iter(dataset) {
            match evaluate_fold(algorithm, &fold) {
                Ok(m) => {
                    debug!(
                        "{} fold {}/{}: RMSE {:.4}, MAE {:.4}, fit {:.3}s, test {:.3}s",
                        spec.name,
                        fold.index + 1,
                        partition.len(),
                        m.rmse,
                        m.mae,
                        m.fit_time_seconds,
                        m.test_time_seconds
                    );
                    metrics.push(m);
                }
                Err(e) => match self.policy {
                    FailurePolicy::FailFast => return Err(failure(spec, e)),
                    FailurePolicy::BestEffort => {
                        warn!(
                            "{} fold {}/{} failed, skipping: {e}",
                            spec.name,
                            fold.index + 1,
                            partition.len()
                        );
                        last_error = Some(e);
                    }
                },
            }
        }

        if metrics.is_empty() {
            let cause = last_error.unwrap_or(BenchError::EmptyMetrics);
            return Err(failure(spec, cause));
        }

        Ok(metrics)
    }
}

fn failure(spec: &AlgorithmSpec, cause: BenchError) -> BenchError {
    BenchError::AlgorithmFailure {
        name: spec.name.clone(),
        cause: cause.to_string(),
    }
}

/// Fit on the training ratings and score the test ratings
pub fn evaluate_fold(algorithm: &dyn Algorithm, fold: &Fold) -> Result<FoldMetrics> {
    let start = Instant::now();
    let predictor = algorithm.fit(&fold.train)?;
    let fit_time_seconds = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let pairs = score(predictor.as_ref(), &fold.test)?;
    let test_time_seconds = start.elapsed().as_secs_f64();

    Ok(FoldMetrics {
        rmse: rmse(&pairs),
        mae: mae(&pairs),
        fit_time_seconds,
        test_time_seconds,
    })
}

/// (estimate, actual) for every test rating
fn score(predictor: &dyn Predictor, test: &Dataset) -> Result<Vec<(f64, f64)>> {
    let pairs: Vec<(&str, &str)> = test
        .iter()
        .map(|r| (r.user_id.as_str(), r.item_id.as_str()))
        .collect();
    let estimates = predictor.predict_batch(&pairs)?;
    if estimates.len() != pairs.len() {
        return Err(BenchError::PredictionFailure(format!(
            "expected {} estimates, got {}",
            pairs.len(),
            estimates.len()
        )));
    }

    test.iter()
        .zip(estimates)
        .map(|(r, estimate)| {
            if !estimate.is_finite() {
                return Err(BenchError::PredictionFailure(format!(
                    "non-finite estimate {estimate} for user {} item {}",
                    r.user_id, r.item_id
                )));
            }
            Ok((estimate, r.rating))
        })
        .collect()
}
