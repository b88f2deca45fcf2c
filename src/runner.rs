//! Benchmark orchestration
//!
//! The runner partitions a dataset once and pushes every algorithm through
//! the same folds, turning each outcome into a [`ResultRecord`]. A failing
//! algorithm becomes a failed record and the run moves on to the next one.

use crate::config::BenchmarkConfig;
use crate::core::{Algorithm, AlgorithmSpec, BenchError, Dataset, ResultRecord, Result, RunMetrics};
use crate::evaluator::Evaluator;
use crate::folds::FoldPartitioner;
use crate::metrics::MetricsAggregator;
use log::{info, warn};
use std::fmt;
use std::time::Instant;

/// An algorithm together with the name and options it is reported under
pub struct AlgorithmEntry {
    pub spec: AlgorithmSpec,
    pub algorithm: Box<dyn Algorithm>,
}

impl AlgorithmEntry {
    pub fn new(spec: AlgorithmSpec, algorithm: Box<dyn Algorithm>) -> Self {
        Self { spec, algorithm }
    }
}

impl fmt::Debug for AlgorithmEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmEntry")
            .field("spec", &self.spec)
            .field("algorithm", &self.algorithm.name())
            .finish()
    }
}

/// Runs a list of algorithms over a shared cross-validation partition
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkRunner {
    partitioner: FoldPartitioner,
    evaluator: Evaluator,
}

impl BenchmarkRunner {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            partitioner: FoldPartitioner::new(config.folds, config.seed),
            evaluator: Evaluator::new(config.failure_policy),
        }
    }

    /// One record per entry, in entry order
    pub fn run(
        &self,
        dataset: &Dataset,
        dataset_name: &str,
        entries: &[AlgorithmEntry],
    ) -> Result<Vec<ResultRecord>> {
        let partition = self.partitioner.partition(dataset)?;
        info!(
            "Split {} ratings into {} folds (seed {})",
            dataset.len(),
            partition.len(),
            partition.seed()
        );

        let mut records = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let name = &entry.spec.name;
            let parameters = entry.spec.params.describe();
            info!("[{}/{}] Evaluating {name}", i + 1, entries.len());

            let start = Instant::now();
            let evaluated = self
                .evaluator
                .evaluate(&entry.spec, entry.algorithm.as_ref(), &partition, dataset);

            let record = match evaluated {
                Ok(folds) => {
                    let summary = MetricsAggregator::aggregate(&folds)?;
                    let total_time = start.elapsed().as_secs_f64();
                    info!(
                        "{name}: RMSE {:.4} ± {:.4}, MAE {:.4} ± {:.4}, total {:.2}s",
                        summary.rmse_mean,
                        summary.rmse_std,
                        summary.mae_mean,
                        summary.mae_std,
                        total_time
                    );
                    let metrics = RunMetrics {
                        summary,
                        total_time,
                        cv_folds: folds.len(),
                    };
                    ResultRecord::success(name, dataset_name, parameters, metrics)
                }
                Err(BenchError::AlgorithmFailure { name, cause }) => {
                    warn!("{name} failed: {cause}");
                    ResultRecord::failure(name, dataset_name, parameters, cause)
                }
                Err(e) => return Err(e),
            };
            records.push(record);
        }

        let failed = records.iter().filter(|r| !r.is_success()).count();
        info!(
            "Benchmark finished: {} succeeded, {failed} failed",
            records.len() - failed
        );
        Ok(records)
    }
}

/// Console-friendly views over a set of result records
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    records: &'a [ResultRecord],
}

impl<'a> RunReport<'a> {
    pub fn new(records: &'a [ResultRecord]) -> Self {
        Self { records }
    }

    fn successes(self) -> impl Iterator<Item = (&'a ResultRecord, &'a RunMetrics)> {
        let records: &'a [ResultRecord] = self.records;
        records.iter().filter_map(|r| r.metrics().map(|m| (r, m)))
    }

    /// Successful records, best RMSE first
    pub fn rank_by_rmse(&self) -> Vec<&'a ResultRecord> {
        let mut ranked: Vec<_> = self.successes().collect();
        ranked.sort_by(|a, b| a.1.summary.rmse_mean.total_cmp(&b.1.summary.rmse_mean));
        ranked.into_iter().map(|(r, _)| r).collect()
    }

    pub fn best_rmse(&self) -> Option<&'a ResultRecord> {
        self.successes()
            .min_by(|a, b| a.1.summary.rmse_mean.total_cmp(&b.1.summary.rmse_mean))
            .map(|(r, _)| r)
    }

    pub fn best_mae(&self) -> Option<&'a ResultRecord> {
        self.successes()
            .min_by(|a, b| a.1.summary.mae_mean.total_cmp(&b.1.summary.mae_mean))
            .map(|(r, _)| r)
    }

    pub fn fastest(&self) -> Option<&'a ResultRecord> {
        self.successes()
            .min_by(|a, b| a.1.total_time.total_cmp(&b.1.total_time))
            .map(|(r, _)| r)
    }

    pub fn slowest(&self) -> Option<&'a ResultRecord> {
        self.successes()
            .max_by(|a, b| a.1.total_time.total_cmp(&b.1.total_time))
            .map(|(r, _)| r)
    }

    pub fn failures(&self) -> Vec<&'a ResultRecord> {
        self.records.iter().filter(|r| !r.is_success()).collect()
    }
}
