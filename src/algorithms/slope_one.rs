//! Slope One collaborative filtering
//!
//! For every pair of items the mean rating difference over users who rated
//! both is precomputed. An estimate is the user's mean plus the average
//! difference between the target item and the items the user rated.

use crate::algorithms::square_matrix;
use crate::algorithms::trainset::Trainset;
use crate::core::{Algorithm, AlgorithmParams, Dataset, Predictor, Result};

pub const OPTIONS: &[&str] = &[];

#[derive(Debug, Clone, Default)]
pub struct SlopeOne;

impl SlopeOne {
    pub fn from_params(params: &AlgorithmParams) -> Result<Self> {
        params.ensure_known("SlopeOne", OPTIONS)?;
        Ok(SlopeOne)
    }
}

impl Algorithm for SlopeOne {
    fn name(&self) -> &str {
        "SlopeOne"
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>> {
        let trainset = Trainset::new(train);
        let n = trainset.n_items();
        let mut freq: Vec<u32> = square_matrix(n, "deviation matrix")?;
        let mut dev: Vec<f64> = square_matrix(n, "deviation matrix")?;
        for ratings in &trainset.user_ratings {
            for &(i, ri) in ratings {
                for &(j, rj) in ratings {
                    freq[i * n + j] += 1;
                    dev[i * n + j] += ri - rj;
                }
            }
        }
        for (d, &f) in dev.iter_mut().zip(&freq) {
            if f > 0 {
                *d /= f as f64;
            }
        }

        let user_means = trainset.user_means();
        Ok(Box::new(SlopeOneModel {
            trainset,
            freq,
            dev,
            n_items: n,
            user_means,
        }))
    }
}

struct SlopeOneModel {
    trainset: Trainset,
    freq: Vec<u32>,
    dev: Vec<f64>,
    n_items: usize,
    user_means: Vec<f64>,
}

impl Predictor for SlopeOneModel {
    fn predict(&self, user_id: &str, item_id: &str) -> Result<f64> {
        let ts = &self.trainset;
        let (u, i) = match (ts.user(user_id), ts.item(item_id)) {
            (Some(u), Some(i)) => (u, i),
            _ => return Ok(ts.scale.clip(ts.global_mean)),
        };

        let row = i * self.n_items;
        let (sum, count) = ts.user_ratings[u]
            .iter()
            .filter(|&&(j, _)| self.freq[row + j] > 0)
            .fold((0.0, 0usize), |(s, c), &(j, _)| (s + self.dev[row + j], c + 1));

        let mut est = self.user_means[u];
        if count > 0 {
            est += sum / count as f64;
        }
        Ok(ts.scale.clip(est))
    }
}
