//! Matrix factorization trained by stochastic gradient descent
//!
//! Estimates `mu + b_u + b_i + q_i . p_u` (or `q_i . p_u` when unbiased).
//! Factors are initialised from a normal distribution and updated once per
//! rating per epoch.

use crate::algorithms::trainset::Trainset;
use crate::algorithms::seeded_rng;
use crate::core::{Algorithm, AlgorithmParams, BenchError, Dataset, Predictor, Result};
use log::debug;
use rand_distr::{Distribution, Normal};

pub const OPTIONS: &[&str] = &[
    "n_factors",
    "n_epochs",
    "lr_all",
    "reg_all",
    "init_std",
    "biased",
    "seed",
];

#[derive(Debug, Clone)]
pub struct Svd {
    pub n_factors: usize,
    pub n_epochs: usize,
    pub lr_all: f64,
    pub reg_all: f64,
    pub init_std: f64,
    pub biased: bool,
    pub seed: Option<u64>,
}

impl Default for Svd {
    fn default() -> Self {
        Self {
            n_factors: 100,
            n_epochs: 20,
            lr_all: 0.005,
            reg_all: 0.02,
            init_std: 0.1,
            biased: true,
            seed: None,
        }
    }
}

impl Svd {
    pub fn from_params(params: &AlgorithmParams) -> Result<Self> {
        params.ensure_known("SVD", OPTIONS)?;
        let d = Svd::default();
        let svd = Self {
            n_factors: params.usize_or("n_factors", d.n_factors)?,
            n_epochs: params.usize_or("n_epochs", d.n_epochs)?,
            lr_all: params.f64_or("lr_all", d.lr_all)?,
            reg_all: params.f64_or("reg_all", d.reg_all)?,
            init_std: params.f64_or("init_std", d.init_std)?,
            biased: params.bool_or("biased", d.biased)?,
            seed: params.u64_opt("seed")?,
        };
        if svd.lr_all <= 0.0 || svd.reg_all < 0.0 || svd.init_std < 0.0 {
            return Err(BenchError::InvalidParameter(
                "SVD needs lr_all > 0, reg_all >= 0 and init_std >= 0".to_string(),
            ));
        }
        Ok(svd)
    }
}

impl Algorithm for Svd {
    fn name(&self) -> &str {
        "SVD"
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>> {
        let ts = Trainset::new(train);
        let f = self.n_factors;
        let mut rng = seeded_rng(self.seed);
        let init = Normal::new(0.0, self.init_std)
            .map_err(|e| BenchError::InvalidParameter(format!("SVD init_std: {e}")))?;

        let mut pu: Vec<f64> = (0..ts.n_users() * f).map(|_| init.sample(&mut rng)).collect();
        let mut qi: Vec<f64> = (0..ts.n_items() * f).map(|_| init.sample(&mut rng)).collect();
        let mut bu = vec![0.0; ts.n_users()];
        let mut bi = vec![0.0; ts.n_items()];
        let mu = if self.biased { ts.global_mean } else { 0.0 };
        let (lr, reg) = (self.lr_all, self.reg_all);

        for epoch in 0..self.n_epochs {
            for &(u, i, r) in &ts.ratings {
                let p = &mut pu[u * f..(u + 1) * f];
                let q = &mut qi[i * f..(i + 1) * f];
                let dot: f64 = p.iter().zip(q.iter()).map(|(a, b)| a * b).sum();
                let err = r - (mu + bu[u] + bi[i] + dot);

                if self.biased {
                    bu[u] += lr * (err - reg * bu[u]);
                    bi[i] += lr * (err - reg * bi[i]);
                }
                for k in 0..f {
                    let (puf, qif) = (p[k], q[k]);
                    p[k] += lr * (err * qif - reg * puf);
                    q[k] += lr * (err * puf - reg * qif);
                }
            }
            debug!("SVD epoch {}/{}", epoch + 1, self.n_epochs);
        }

        if pu.iter().chain(&qi).chain(&bu).chain(&bi).any(|v| !v.is_finite()) {
            return Err(BenchError::TrainingFailure(format!(
                "SVD diverged with lr_all={} reg_all={}",
                self.lr_all, self.reg_all
            )));
        }

        Ok(Box::new(SvdModel {
            trainset: ts,
            n_factors: f,
            biased: self.biased,
            pu,
            qi,
            bu,
            bi,
        }))
    }
}

struct SvdModel {
    trainset: Trainset,
    n_factors: usize,
    biased: bool,
    pu: Vec<f64>,
    qi: Vec<f64>,
    bu: Vec<f64>,
    bi: Vec<f64>,
}

impl Predictor for SvdModel {
    fn predict(&self, user_id: &str, item_id: &str) -> Result<f64> {
        let ts = &self.trainset;
        let f = self.n_factors;
        let u = ts.user(user_id);
        let i = ts.item(item_id);

        let est = if self.biased {
            let mut est = ts.global_mean;
            if let Some(u) = u {
                est += self.bu[u];
            }
            if let Some(i) = i {
                est += self.bi[i];
            }
            if let (Some(u), Some(i)) = (u, i) {
                est += dot(&self.pu[u * f..(u + 1) * f], &self.qi[i * f..(i + 1) * f]);
            }
            est
        } else {
            match (u, i) {
                (Some(u), Some(i)) => {
                    dot(&self.pu[u * f..(u + 1) * f], &self.qi[i * f..(i + 1) * f])
                }
                _ => ts.global_mean,
            }
        };

        Ok(ts.scale.clip(est))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
