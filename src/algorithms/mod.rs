//! Registry of known rating prediction algorithms
//!
//! Every algorithm the benchmark can run by name is listed in
//! [`AlgorithmKind`]. Names and options are resolved before a run starts, so
//! a typo fails immediately instead of after hours of evaluation.

pub mod baseline;
pub mod knn;
pub mod normal;
pub mod slope_one;
pub mod svd;
pub mod trainset;

pub use self::baseline::{BaselineMethod, BaselineOnly};
pub use self::knn::{Knn, KnnVariant, Similarity};
pub use self::normal::NormalPredictor;
pub use self::slope_one::SlopeOne;
pub use self::svd::Svd;

use crate::core::{Algorithm, AlgorithmParams, AlgorithmSpec, BenchError, Result};
use crate::runner::AlgorithmEntry;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::str::FromStr;

/// Algorithms that can be selected by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    NormalPredictor,
    BaselineOnly,
    KnnBasic,
    KnnWithMeans,
    SlopeOne,
    Svd,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 6] = [
        AlgorithmKind::NormalPredictor,
        AlgorithmKind::BaselineOnly,
        AlgorithmKind::KnnBasic,
        AlgorithmKind::KnnWithMeans,
        AlgorithmKind::SlopeOne,
        AlgorithmKind::Svd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::NormalPredictor => "NormalPredictor",
            AlgorithmKind::BaselineOnly => "BaselineOnly",
            AlgorithmKind::KnnBasic => "KNNBasic",
            AlgorithmKind::KnnWithMeans => "KNNWithMeans",
            AlgorithmKind::SlopeOne => "SlopeOne",
            AlgorithmKind::Svd => "SVD",
        }
    }

    /// Options accepted by [`AlgorithmKind::build`]
    pub fn options(self) -> &'static [&'static str] {
        match self {
            AlgorithmKind::NormalPredictor => normal::OPTIONS,
            AlgorithmKind::BaselineOnly => baseline::OPTIONS,
            AlgorithmKind::KnnBasic | AlgorithmKind::KnnWithMeans => knn::OPTIONS,
            AlgorithmKind::SlopeOne => slope_one::OPTIONS,
            AlgorithmKind::Svd => svd::OPTIONS,
        }
    }

    /// Options a run uses unless the configuration overrides them
    pub fn default_params(self) -> AlgorithmParams {
        let knn = || {
            AlgorithmParams::new()
                .with("k", 40)
                .with("min_k", 1)
                .with("similarity", "cosine")
                .with("user_based", true)
        };
        match self {
            AlgorithmKind::NormalPredictor | AlgorithmKind::SlopeOne => AlgorithmParams::new(),
            AlgorithmKind::BaselineOnly => AlgorithmParams::new()
                .with("method", "als")
                .with("n_epochs", 10),
            AlgorithmKind::KnnBasic | AlgorithmKind::KnnWithMeans => knn(),
            AlgorithmKind::Svd => AlgorithmParams::new()
                .with("n_factors", 100)
                .with("n_epochs", 20)
                .with("lr_all", 0.005)
                .with("reg_all", 0.02),
        }
    }

    /// Construct the algorithm with the given options
    pub fn build(self, params: &AlgorithmParams) -> Result<Box<dyn Algorithm>> {
        Ok(match self {
            AlgorithmKind::NormalPredictor => Box::new(NormalPredictor::from_params(params)?),
            AlgorithmKind::BaselineOnly => Box::new(BaselineOnly::from_params(params)?),
            AlgorithmKind::KnnBasic => Box::new(Knn::from_params(KnnVariant::Basic, params)?),
            AlgorithmKind::KnnWithMeans => {
                Box::new(Knn::from_params(KnnVariant::WithMeans, params)?)
            }
            AlgorithmKind::SlopeOne => Box::new(SlopeOne::from_params(params)?),
            AlgorithmKind::Svd => Box::new(Svd::from_params(params)?),
        })
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        AlgorithmKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = AlgorithmKind::ALL.iter().map(|k| k.name()).collect();
                BenchError::UnknownAlgorithm(format!(
                    "'{}' (known algorithms: {})",
                    s.trim(),
                    known.join(", ")
                ))
            })
    }
}

/// Turn specs into runnable entries, failing on the first unknown name or option
pub fn resolve(specs: &[AlgorithmSpec]) -> Result<Vec<AlgorithmEntry>> {
    specs
        .iter()
        .map(|spec| -> Result<AlgorithmEntry> {
            let kind: AlgorithmKind = spec.name.parse()?;
            let algorithm = kind.build(&spec.params)?;
            Ok(AlgorithmEntry::new(
                AlgorithmSpec::with_params(kind.name(), spec.params.clone()),
                algorithm,
            ))
        })
        .collect()
}

/// RNG from a fixed seed, or from OS entropy when none is given
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Zero-filled `n x n` matrix in row-major order
///
/// An allocation the process cannot satisfy is a training failure of the
/// algorithm asking for it, not an abort.
pub(crate) fn square_matrix<T: Clone + Default>(n: usize, what: &str) -> Result<Vec<T>> {
    let too_large = || {
        BenchError::TrainingFailure(format!("cannot allocate a {n}x{n} {what}"))
    };
    let cells = n.checked_mul(n).ok_or_else(too_large)?;
    let mut matrix = Vec::new();
    matrix.try_reserve_exact(cells).map_err(|e| {
        BenchError::TrainingFailure(format!("cannot allocate a {n}x{n} {what}: {e}"))
    })?;
    matrix.resize(cells, T::default());
    Ok(matrix)
}
