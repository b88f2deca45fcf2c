//! Benchmark configuration
//!
//! A [`BenchmarkConfig`] is built once, either from a JSON file or with the
//! `with_*` builder methods, validated, and then handed to the runner by
//! reference.

use crate::algorithms::AlgorithmKind;
use crate::core::{AlgorithmParams, AlgorithmSpec, BenchError, Result};
use crate::data::DatasetId;
use crate::evaluator::FailurePolicy;
use crate::persistence::WriteMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which algorithms a run benchmarks
///
/// Deserialises from `"all"`, a comma separated string, or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawSelection", into = "RawSelection")]
pub enum AlgorithmSelection {
    /// Every known algorithm, in registry order
    #[default]
    All,
    /// The named algorithms, in the given order
    Only(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
    One(String),
    Many(Vec<String>),
}

impl From<RawSelection> for AlgorithmSelection {
    fn from(raw: RawSelection) -> Self {
        match raw {
            RawSelection::One(s) => AlgorithmSelection::parse_list(&s),
            RawSelection::Many(names) => AlgorithmSelection::Only(names),
        }
    }
}

impl From<AlgorithmSelection> for RawSelection {
    fn from(selection: AlgorithmSelection) -> Self {
        match selection {
            AlgorithmSelection::All => RawSelection::One("all".to_string()),
            AlgorithmSelection::Only(names) => RawSelection::Many(names),
        }
    }
}

impl AlgorithmSelection {
    /// `"all"` or `"A,B,C"`
    pub fn parse_list(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("all") {
            return AlgorithmSelection::All;
        }
        AlgorithmSelection::Only(
            s.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Resolve names to registry entries, failing on the first unknown name
    pub fn kinds(&self) -> Result<Vec<AlgorithmKind>> {
        match self {
            AlgorithmSelection::All => Ok(AlgorithmKind::ALL.to_vec()),
            AlgorithmSelection::Only(names) => names.iter().map(|n| n.parse()).collect(),
        }
    }
}

impl FromStr for AlgorithmSelection {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(AlgorithmSelection::parse_list(s))
    }
}

/// Everything a benchmark run needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub dataset: DatasetId,
    pub data_dir: PathBuf,
    pub folds: usize,
    pub algorithms: AlgorithmSelection,
    /// Option overrides keyed by algorithm name
    pub params: BTreeMap<String, AlgorithmParams>,
    pub output_dir: PathBuf,
    pub write_mode: WriteMode,
    /// Fixes the fold shuffle; drawn at random and logged when absent
    pub seed: Option<u64>,
    pub failure_policy: FailurePolicy,
    pub verbose: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetId::default(),
            data_dir: PathBuf::from("."),
            folds: 5,
            algorithms: AlgorithmSelection::All,
            params: BTreeMap::new(),
            output_dir: PathBuf::from("results"),
            write_mode: WriteMode::Append,
            seed: None,
            failure_policy: FailurePolicy::FailFast,
            verbose: false,
        }
    }
}

impl BenchmarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: BenchmarkConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_dataset(mut self, dataset: DatasetId) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, data_dir: P) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_algorithms(mut self, algorithms: AlgorithmSelection) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Override options of one algorithm
    pub fn with_params(mut self, algorithm: impl Into<String>, params: AlgorithmParams) -> Self {
        self.params.insert(algorithm.into(), params);
        self
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check everything that can be checked without loading data
    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(BenchError::InvalidParameter(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        if let AlgorithmSelection::Only(names) = &self.algorithms {
            if names.is_empty() {
                return Err(BenchError::InvalidParameter(
                    "no algorithms selected".to_string(),
                ));
            }
        }
        self.algorithms.kinds()?;
        for name in self.params.keys() {
            name.parse::<AlgorithmKind>()?;
        }
        self.algorithm_specs()?;
        Ok(())
    }

    /// Specs for the selected algorithms: registry defaults merged with overrides
    pub fn algorithm_specs(&self) -> Result<Vec<AlgorithmSpec>> {
        self.algorithms
            .kinds()?
            .into_iter()
            .map(|kind| -> Result<AlgorithmSpec> {
                let mut params = kind.default_params();
                for (name, overrides) in &self.params {
                    if name.parse::<AlgorithmKind>()? == kind {
                        params = params.merged(overrides);
                    }
                }
                params.ensure_known(kind.name(), kind.options())?;
                Ok(AlgorithmSpec::with_params(kind.name(), params))
            })
            .collect()
    }

    /// `<output_dir>/results_<dataset>.csv`
    pub fn results_path(&self) -> PathBuf {
        self.results_path_for(self.dataset.name())
    }

    /// Result table for a dataset outside the catalog
    pub fn results_path_for(&self, dataset_name: &str) -> PathBuf {
        self.output_dir.join(format!("results_{dataset_name}.csv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.folds, 5);
        assert_eq!(config.dataset, DatasetId::MovieLens100k);
        assert_eq!(config.write_mode, WriteMode::Append);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.results_path(), PathBuf::from("results/results_100k.csv"));
        assert!(config.validate().is_ok());

        let specs = config.algorithm_specs().unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["NormalPredictor", "BaselineOnly", "KNNBasic", "KNNWithMeans", "SlopeOne", "SVD"]
        );
    }

    #[test]
    fn test_overrides_merge_with_defaults() {
        let config = BenchmarkConfig::new()
            .with_algorithms("knnbasic, SVD".parse().unwrap())
            .with_params("KNNBasic", AlgorithmParams::new().with("k", 20));
        let specs = config.algorithm_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "KNNBasic");
        assert_eq!(specs[0].params.usize_or("k", 0).unwrap(), 20);
        assert_eq!(specs[0].params.str_or("similarity", "").unwrap(), "cosine");
        assert_eq!(specs[1].params.usize_or("n_factors", 0).unwrap(), 100);
    }

    #[test]
    fn test_validation_errors() {
        let config = BenchmarkConfig::new().with_folds(1);
        assert!(matches!(config.validate(), Err(BenchError::InvalidParameter(_))));

        let config = BenchmarkConfig::new().with_algorithms(AlgorithmSelection::parse_list("SVD,Magic"));
        assert!(matches!(config.validate(), Err(BenchError::UnknownAlgorithm(_))));

        let config = BenchmarkConfig::new()
            .with_params("SlopeOne", AlgorithmParams::new().with("k", 3));
        assert!(matches!(config.validate(), Err(BenchError::InvalidParameter(_))));

        let config = BenchmarkConfig::new().with_algorithms(AlgorithmSelection::Only(vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "dataset": "32m",
                "folds": 3,
                "algorithms": ["BaselineOnly", "SVD"],
                "params": {{"SVD": {{"n_factors": 10, "seed": 7}}}},
                "seed": 42,
                "write_mode": "overwrite",
                "failure_policy": "best_effort"
            }}"#
        )
        .unwrap();

        let config = BenchmarkConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dataset, DatasetId::MovieLens32m);
        assert_eq!(config.folds, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.write_mode, WriteMode::Overwrite);
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
        assert_eq!(config.output_dir, PathBuf::from("results"));

        let specs = config.algorithm_specs().unwrap();
        assert_eq!(specs[1].params.usize_or("n_factors", 0).unwrap(), 10);
        assert_eq!(specs[1].params.u64_opt("seed").unwrap(), Some(7));
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"fold": 3}}"#).unwrap();
        assert!(matches!(
            BenchmarkConfig::from_file(file.path()),
            Err(BenchError::SerializationError(_))
        ));
    }

    #[test]
    fn test_selection_forms() {
        assert_eq!(AlgorithmSelection::parse_list("ALL"), AlgorithmSelection::All);
        let sel: AlgorithmSelection = serde_json::from_str(r#""SVD,SlopeOne""#).unwrap();
        assert_eq!(
            sel,
            AlgorithmSelection::Only(vec!["SVD".to_string(), "SlopeOne".to_string()])
        );
        let sel: AlgorithmSelection = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(sel.kinds().unwrap().len(), AlgorithmKind::ALL.len());
    }
}
