//! User and item bias baseline
//!
//! Estimates `mu + b_u + b_i`, where the biases are fitted either by
//! alternating least squares or by stochastic gradient descent. Unknown users
//! or items contribute a zero bias.

use crate::algorithms::trainset::Trainset;
use crate::core::{
    Algorithm, AlgorithmParams, BenchError, Dataset, Predictor, Result,
};

pub const OPTIONS: &[&str] = &["method", "n_epochs", "reg_u", "reg_i", "reg", "learning_rate"];

/// How the biases are fitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselineMethod {
    Als { reg_u: f64, reg_i: f64 },
    Sgd { reg: f64, learning_rate: f64 },
}

#[derive(Debug, Clone)]
pub struct BaselineOnly {
    method: BaselineMethod,
    n_epochs: usize,
}

impl Default for BaselineOnly {
    fn default() -> Self {
        Self {
            method: BaselineMethod::Als {
                reg_u: 15.0,
                reg_i: 10.0,
            },
            n_epochs: 10,
        }
    }
}

impl BaselineOnly {
    pub fn new(method: BaselineMethod, n_epochs: usize) -> Self {
        Self { method, n_epochs }
    }

    pub fn from_params(params: &AlgorithmParams) -> Result<Self> {
        params.ensure_known("BaselineOnly", OPTIONS)?;
        let method = match params.str_or("method", "als")? {
            "als" => BaselineMethod::Als {
                reg_u: params.f64_or("reg_u", 15.0)?,
                reg_i: params.f64_or("reg_i", 10.0)?,
            },
            "sgd" => BaselineMethod::Sgd {
                reg: params.f64_or("reg", 0.02)?,
                learning_rate: params.f64_or("learning_rate", 0.005)?,
            },
            other => {
                return Err(BenchError::InvalidParameter(format!(
                    "BaselineOnly method must be 'als' or 'sgd', got '{other}'"
                )))
            }
        };
        Ok(Self::new(method, params.usize_or("n_epochs", 10)?))
    }
}

impl Algorithm for BaselineOnly {
    fn name(&self) -> &str {
        "BaselineOnly"
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>> {
        let trainset = Trainset::new(train);
        let (user_bias, item_bias) = fit_biases(&trainset, self.method, self.n_epochs);

        if user_bias.iter().chain(&item_bias).any(|b| !b.is_finite()) {
            return Err(BenchError::TrainingFailure(
                "baseline biases diverged".to_string(),
            ));
        }

        Ok(Box::new(BaselineModel {
            trainset,
            user_bias,
            item_bias,
        }))
    }
}

/// Fit (user biases, item biases) around the global mean
pub(crate) fn fit_biases(
    ts: &Trainset,
    method: BaselineMethod,
    n_epochs: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mu = ts.global_mean;
    let mut bu = vec![0.0; ts.n_users()];
    let mut bi = vec![0.0; ts.n_items()];

    match method {
        BaselineMethod::Als { reg_u, reg_i } => {
            for _ in 0..n_epochs {
                for (i, ratings) in ts.item_ratings.iter().enumerate() {
                    let dev: f64 = ratings.iter().map(|&(u, r)| r - mu - bu[u]).sum();
                    bi[i] = dev / (reg_i + ratings.len() as f64);
                }
                for (u, ratings) in ts.user_ratings.iter().enumerate() {
                    let dev: f64 = ratings.iter().map(|&(i, r)| r - mu - bi[i]).sum();
                    bu[u] = dev / (reg_u + ratings.len() as f64);
                }
            }
        }
        BaselineMethod::Sgd { reg, learning_rate } => {
            for _ in 0..n_epochs {
                for &(u, i, r) in &ts.ratings {
                    let err = r - (mu + bu[u] + bi[i]);
                    bu[u] += learning_rate * (err - reg * bu[u]);
                    bi[i] += learning_rate * (err - reg * bi[i]);
                }
            }
        }
    }

    (bu, bi)
}

struct BaselineModel {
    trainset: Trainset,
    user_bias: Vec<f64>,
    item_bias: Vec<f64>,
}

impl Predictor for BaselineModel {
    fn predict(&self, user_id: &str, item_id: &str) -> Result<f64> {
        let mut est = self.trainset.global_mean;
        if let Some(u) = self.trainset.user(user_id) {
            est += self.user_bias[u];
        }
        if let Some(i) = self.trainset.item(item_id) {
            est += self.item_bias[i];
        }
        Ok(self.trainset.scale.clip(est))
    }
}
