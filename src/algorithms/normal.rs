//! Random ratings drawn from the training distribution
//!
//! Estimates are sampled from a normal distribution whose mean and standard
//! deviation (maximum likelihood) are those of the training ratings.

use crate::algorithms::seeded_rng;
use crate::core::{Algorithm, AlgorithmParams, BenchError, Dataset, Predictor, RatingScale, Result};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::sync::Mutex;

pub const OPTIONS: &[&str] = &["seed"];

#[derive(Debug, Clone, Default)]
pub struct NormalPredictor {
    seed: Option<u64>,
}

impl NormalPredictor {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    pub fn from_params(params: &AlgorithmParams) -> Result<Self> {
        params.ensure_known("NormalPredictor", OPTIONS)?;
        Ok(Self::new(params.u64_opt("seed")?))
    }
}

impl Algorithm for NormalPredictor {
    fn name(&self) -> &str {
        "NormalPredictor"
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>> {
        let n = train.len() as f64;
        let mean = train.global_mean();
        let variance = train.iter().map(|r| (r.rating - mean).powi(2)).sum::<f64>() / n;

        let normal = Normal::new(mean, variance.sqrt())
            .map_err(|e| BenchError::TrainingFailure(format!("rating distribution: {e}")))?;

        Ok(Box::new(NormalModel {
            normal,
            scale: train.scale(),
            rng: Mutex::new(seeded_rng(self.seed)),
        }))
    }
}

struct NormalModel {
    normal: Normal<f64>,
    scale: RatingScale,
    rng: Mutex<StdRng>,
}

impl Predictor for NormalModel {
    fn predict(&self, _user_id: &str, _item_id: &str) -> Result<f64> {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.scale.clip(self.normal.sample(&mut *rng)))
    }
}
