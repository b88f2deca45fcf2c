//! Accuracy measures and fold aggregation
//!
//! Standard deviations are population deviations (divide by n), so a run
//! with a single fold reports zero spread.

use crate::core::{BenchError, FoldMetrics, MetricsSummary, Result};

/// Root mean squared error over (estimate, actual) pairs
pub fn rmse(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = pairs.iter().map(|(est, actual)| (est - actual).powi(2)).sum();
    (sum_sq / pairs.len() as f64).sqrt()
}

/// Mean absolute error over (estimate, actual) pairs
pub fn mae(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs.iter().map(|(est, actual)| (est - actual).abs()).sum::<f64>() / pairs.len() as f64
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation dividing by n
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Reduces per-fold metrics to summary statistics
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Mean and spread of every fold metric
    pub fn aggregate(folds: &[FoldMetrics]) -> Result<MetricsSummary> {
        if folds.is_empty() {
            return Err(BenchError::EmptyMetrics);
        }

        let column = |f: fn(&FoldMetrics) -> f64| folds.iter().map(f).collect::<Vec<f64>>();
        let rmse = column(|m| m.rmse);
        let mae = column(|m| m.mae);
        let fit = column(|m| m.fit_time_seconds);
        let test = column(|m| m.test_time_seconds);

        Ok(MetricsSummary {
            rmse_mean: mean(&rmse),
            rmse_std: population_std(&rmse),
            mae_mean: mean(&mae),
            mae_std: population_std(&mae),
            fit_time_mean: mean(&fit),
            test_time_mean: mean(&test),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fold(rmse: f64, mae: f64, fit: f64, test: f64) -> FoldMetrics {
        FoldMetrics {
            rmse,
            mae,
            fit_time_seconds: fit,
            test_time_seconds: test,
        }
    }

    #[test]
    fn test_rmse_and_mae() {
        let pairs = [(3.0, 4.0), (5.0, 3.0), (2.5, 2.5)];
        assert_relative_eq!(rmse(&pairs), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(mae(&pairs), 1.0, epsilon = 1e-12);
        assert_eq!(rmse(&[]), 0.0);
        assert_eq!(mae(&[]), 0.0);
    }

    #[test]
    fn test_rmse_never_below_mae() {
        let pairs = [(1.0, 4.0), (2.0, 2.5), (4.5, 4.0), (3.0, 1.0)];
        assert!(rmse(&pairs) >= mae(&pairs));
    }

    #[test]
    fn test_population_std() {
        // Population std of 2,4,4,4,5,5,7,9 is exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std(&values), 2.0, epsilon = 1e-12);
        assert_eq!(population_std(&[3.0]), 0.0);
    }

    #[test]
    fn test_aggregate() {
        let folds = [
            fold(0.9, 0.7, 1.0, 0.2),
            fold(1.1, 0.9, 3.0, 0.4),
        ];
        let summary = MetricsAggregator::aggregate(&folds).unwrap();
        assert_relative_eq!(summary.rmse_mean, 1.0, epsilon = 1e-12);
        assert_relative_eq!(summary.rmse_std, 0.1, epsilon = 1e-12);
        assert_relative_eq!(summary.mae_mean, 0.8, epsilon = 1e-12);
        assert_relative_eq!(summary.mae_std, 0.1, epsilon = 1e-12);
        assert_relative_eq!(summary.fit_time_mean, 2.0, epsilon = 1e-12);
        assert_relative_eq!(summary.test_time_mean, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_single_fold_has_zero_spread() {
        let summary = MetricsAggregator::aggregate(&[fold(0.95, 0.75, 2.0, 0.5)]).unwrap();
        assert_eq!(summary.rmse_std, 0.0);
        assert_eq!(summary.mae_std, 0.0);
        assert_eq!(summary.rmse_mean, 0.95);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let folds = vec![
            fold(0.91, 0.71, 1.0, 0.1),
            fold(0.95, 0.74, 1.5, 0.2),
            fold(0.89, 0.70, 0.8, 0.3),
        ];
        let mut reversed = folds.clone();
        reversed.reverse();
        let a = MetricsAggregator::aggregate(&folds).unwrap();
        let b = MetricsAggregator::aggregate(&reversed).unwrap();
        assert_relative_eq!(a.rmse_mean, b.rmse_mean, epsilon = 1e-12);
        assert_relative_eq!(a.mae_std, b.mae_std, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            MetricsAggregator::aggregate(&[]),
            Err(BenchError::EmptyMetrics)
        ));
    }
}
