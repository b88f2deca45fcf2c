//! Core type definitions for rating benchmarks

use crate::core::{BenchError, Result};
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One explicit rating of an item by a user
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub user_id: String,
    pub item_id: String,
    pub rating: f64,
    /// Unix timestamp, when the source provides one
    pub timestamp: Option<i64>,
}

impl RatingRecord {
    /// Create a new rating record
    pub fn new(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        rating: f64,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
            timestamp,
        }
    }
}

/// Inclusive range of valid ratings declared alongside a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl RatingScale {
    /// Create a scale, rejecting empty or non-finite ranges
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(BenchError::InvalidParameter(format!(
                "Rating scale must satisfy min < max, got [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    /// Whether a rating lies inside the scale
    pub fn contains(&self, rating: f64) -> bool {
        rating >= self.min && rating <= self.max
    }

    /// Clip an estimate into the scale
    pub fn clip(&self, estimate: f64) -> f64 {
        estimate.clamp(self.min, self.max)
    }

    /// Width of the scale
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl fmt::Display for RatingScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// An ordered, non-empty collection of ratings on a declared scale
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<RatingRecord>,
    scale: RatingScale,
}

impl Dataset {
    /// Build a dataset, checking it is non-empty and every rating is on scale
    pub fn new(records: Vec<RatingRecord>, scale: RatingScale) -> Result<Self> {
        if records.is_empty() {
            return Err(BenchError::MalformedDataset(
                "dataset contains no ratings".to_string(),
            ));
        }

        if let Some((pos, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| !r.rating.is_finite() || !scale.contains(r.rating))
        {
            return Err(BenchError::MalformedDataset(format!(
                "rating {} at record {} (user {}, item {}) is outside scale {}",
                record.rating,
                pos + 1,
                record.user_id,
                record.item_id,
                scale
            )));
        }

        Ok(Self { records, scale })
    }

    /// Select records by index into a new dataset on the same scale
    ///
    /// # Panics
    /// Panics if any index is out of bounds
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            scale: self.scale,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RatingRecord] {
        &self.records
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Mean of all ratings
    pub fn global_mean(&self) -> f64 {
        if self.records.is_empty() {
            return (self.scale.min + self.scale.max) / 2.0;
        }
        self.records.iter().map(|r| r.rating).sum::<f64>() / self.records.len() as f64
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RatingRecord> {
        self.records.iter()
    }
}

/// Per-fold accuracy and timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub fit_time_seconds: f64,
    pub test_time_seconds: f64,
}

/// Mean and population standard deviation over folds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSummary {
    pub rmse_mean: f64,
    pub rmse_std: f64,
    pub mae_mean: f64,
    pub mae_std: f64,
    pub fit_time_mean: f64,
    pub test_time_mean: f64,
}

/// Option overrides for one algorithm, keyed by option name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmParams(BTreeMap<String, Value>);

impl AlgorithmParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Layer `overrides` on top of these options
    pub fn merged(&self, overrides: &AlgorithmParams) -> AlgorithmParams {
        let mut merged = self.0.clone();
        for (k, v) in &overrides.0 {
            merged.insert(k.clone(), v.clone());
        }
        AlgorithmParams(merged)
    }

    /// Reject options an algorithm does not understand
    pub fn ensure_known(&self, algorithm: &str, allowed: &[&str]) -> Result<()> {
        for key in self.keys() {
            if !allowed.contains(&key) {
                return Err(BenchError::InvalidParameter(format!(
                    "{algorithm} has no option '{key}' (valid options: {})",
                    if allowed.is_empty() {
                        "none".to_string()
                    } else {
                        allowed.join(", ")
                    }
                )));
            }
        }
        Ok(())
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| type_error(key, "a number", v)),
        }
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| type_error(key, "a non-negative integer", v)),
        }
    }

    pub fn u64_opt(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| type_error(key, "a non-negative integer", v)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| type_error(key, "a boolean", v)),
        }
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_str().ok_or_else(|| type_error(key, "a string", v)),
        }
    }

    /// Rendering used in the Parameters column of result tables
    pub fn describe(&self) -> String {
        if self.0.is_empty() {
            "Default".to_string()
        } else {
            serde_json::to_string(&self.0).unwrap_or_else(|_| format!("{:?}", self.0))
        }
    }
}

fn type_error(key: &str, expected: &str, got: &Value) -> BenchError {
    BenchError::InvalidParameter(format!("option '{key}' must be {expected}, got {got}"))
}

/// Identity and configuration of one benchmarked algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    pub name: String,
    #[serde(default)]
    pub params: AlgorithmParams,
}

impl AlgorithmSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: AlgorithmParams::new(),
        }
    }

    pub fn with_params(name: impl Into<String>, params: AlgorithmParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Metrics of a successful run of one algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    pub summary: MetricsSummary,
    /// Wall clock for the whole algorithm, including aggregation
    pub total_time: f64,
    pub cv_folds: usize,
}

/// Either metrics or the error that stopped the algorithm, never both
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(RunMetrics),
    Failed(String),
}

/// One row of a benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub algorithm: String,
    pub dataset: String,
    pub timestamp: NaiveDateTime,
    pub parameters: String,
    pub outcome: Outcome,
}

impl ResultRecord {
    pub fn success(
        algorithm: impl Into<String>,
        dataset: impl Into<String>,
        parameters: impl Into<String>,
        metrics: RunMetrics,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            dataset: dataset.into(),
            timestamp: now_seconds(),
            parameters: parameters.into(),
            outcome: Outcome::Success(metrics),
        }
    }

    pub fn failure(
        algorithm: impl Into<String>,
        dataset: impl Into<String>,
        parameters: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            dataset: dataset.into(),
            timestamp: now_seconds(),
            parameters: parameters.into(),
            outcome: Outcome::Failed(error.into()),
        }
    }

    /// Override the creation time
    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn metrics(&self) -> Option<&RunMetrics> {
        match &self.outcome {
            Outcome::Success(m) => Some(m),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Local time truncated to whole seconds, the resolution of result tables
fn now_seconds() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> RatingScale {
        RatingScale::new(1.0, 5.0).unwrap()
    }

    #[test]
    fn test_rating_scale() {
        let s = scale();
        assert!(s.contains(1.0));
        assert!(s.contains(5.0));
        assert!(!s.contains(0.5));
        assert_eq!(s.clip(7.2), 5.0);
        assert_eq!(s.clip(-1.0), 1.0);
        assert_eq!(s.clip(3.3), 3.3);
        assert_eq!(s.span(), 4.0);

        assert!(RatingScale::new(5.0, 1.0).is_err());
        assert!(RatingScale::new(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_dataset_validation() {
        let records = vec![
            RatingRecord::new("1", "10", 4.0, None),
            RatingRecord::new("2", "10", 3.0, Some(881250949)),
        ];
        let dataset = Dataset::new(records, scale()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.global_mean(), 3.5);

        let empty = Dataset::new(Vec::new(), scale());
        assert!(matches!(empty, Err(BenchError::MalformedDataset(_))));

        let off_scale = Dataset::new(vec![RatingRecord::new("1", "1", 5.5, None)], scale());
        assert!(matches!(off_scale, Err(BenchError::MalformedDataset(_))));
    }

    #[test]
    fn test_dataset_subset() {
        let records = (0..5)
            .map(|i| RatingRecord::new(i.to_string(), "x", 1.0 + i as f64, None))
            .collect();
        let dataset = Dataset::new(records, scale()).unwrap();
        let sub = dataset.subset(&[4, 0]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.records()[0].user_id, "4");
        assert_eq!(sub.records()[1].user_id, "0");
        assert_eq!(sub.scale(), dataset.scale());
    }

    #[test]
    fn test_params_accessors() {
        let params = AlgorithmParams::new()
            .with("k", 40)
            .with("similarity", "msd")
            .with("user_based", false)
            .with("lr_all", 0.005);

        assert_eq!(params.usize_or("k", 1).unwrap(), 40);
        assert_eq!(params.usize_or("min_k", 1).unwrap(), 1);
        assert_eq!(params.str_or("similarity", "cosine").unwrap(), "msd");
        assert!(!params.bool_or("user_based", true).unwrap());
        assert_eq!(params.f64_or("lr_all", 0.1).unwrap(), 0.005);
        assert!(params.f64_or("similarity", 0.0).is_err());
        assert!(params.ensure_known("KNNBasic", &["k"]).is_err());
    }

    #[test]
    fn test_params_merge_and_describe() {
        let defaults = AlgorithmParams::new().with("k", 40).with("min_k", 1);
        let overrides = AlgorithmParams::new().with("k", 20);
        let merged = defaults.merged(&overrides);
        assert_eq!(merged.usize_or("k", 0).unwrap(), 20);
        assert_eq!(merged.usize_or("min_k", 0).unwrap(), 1);
        assert_eq!(merged.describe(), r#"{"k":20,"min_k":1}"#);
        assert_eq!(AlgorithmParams::new().describe(), "Default");
    }

    #[test]
    fn test_result_record_outcome() {
        let metrics = RunMetrics {
            summary: MetricsSummary {
                rmse_mean: 0.9,
                rmse_std: 0.01,
                mae_mean: 0.7,
                mae_std: 0.02,
                fit_time_mean: 1.0,
                test_time_mean: 0.1,
            },
            total_time: 5.6,
            cv_folds: 5,
        };
        let ok = ResultRecord::success("SVD", "100k", "Default", metrics);
        assert!(ok.is_success());
        assert_eq!(ok.metrics().unwrap().cv_folds, 5);
        assert!(ok.error().is_none());

        let failed = ResultRecord::failure("SVDpp", "100k", "Default", "boom");
        assert!(!failed.is_success());
        assert!(failed.metrics().is_none());
        assert_eq!(failed.error(), Some("boom"));
    }
}
