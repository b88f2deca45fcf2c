//! Dense inner-id view of a training dataset
//!
//! Raw user and item ids are mapped to contiguous indices in order of first
//! appearance, and ratings are grouped per user and per item.

use crate::core::{Dataset, RatingScale};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Trainset {
    user_index: HashMap<String, usize>,
    item_index: HashMap<String, usize>,
    /// (user, item, rating) in dataset order
    pub ratings: Vec<(usize, usize, f64)>,
    /// Items and ratings per user
    pub user_ratings: Vec<Vec<(usize, f64)>>,
    /// Users and ratings per item
    pub item_ratings: Vec<Vec<(usize, f64)>>,
    pub global_mean: f64,
    pub scale: RatingScale,
}

impl Trainset {
    pub fn new(dataset: &Dataset) -> Self {
        let mut user_index = HashMap::new();
        let mut item_index = HashMap::new();
        let mut ratings = Vec::with_capacity(dataset.len());
        let mut user_ratings: Vec<Vec<(usize, f64)>> = Vec::new();
        let mut item_ratings: Vec<Vec<(usize, f64)>> = Vec::new();

        for record in dataset.iter() {
            let u = *user_index.entry(record.user_id.clone()).or_insert_with(|| {
                user_ratings.push(Vec::new());
                user_ratings.len() - 1
            });
            let i = *item_index.entry(record.item_id.clone()).or_insert_with(|| {
                item_ratings.push(Vec::new());
                item_ratings.len() - 1
            });
            user_ratings[u].push((i, record.rating));
            item_ratings[i].push((u, record.rating));
            ratings.push((u, i, record.rating));
        }

        Self {
            user_index,
            item_index,
            ratings,
            user_ratings,
            item_ratings,
            global_mean: dataset.global_mean(),
            scale: dataset.scale(),
        }
    }

    pub fn n_users(&self) -> usize {
        self.user_ratings.len()
    }

    pub fn n_items(&self) -> usize {
        self.item_ratings.len()
    }

    pub fn user(&self, raw: &str) -> Option<usize> {
        self.user_index.get(raw).copied()
    }

    pub fn item(&self, raw: &str) -> Option<usize> {
        self.item_index.get(raw).copied()
    }

    /// Mean rating given by each user
    pub fn user_means(&self) -> Vec<f64> {
        means(&self.user_ratings)
    }

    /// Mean rating received by each item
    pub fn item_means(&self) -> Vec<f64> {
        means(&self.item_ratings)
    }
}

fn means(groups: &[Vec<(usize, f64)>]) -> Vec<f64> {
    groups
        .iter()
        .map(|g| g.iter().map(|&(_, r)| r).sum::<f64>() / g.len().max(1) as f64)
        .collect()
}
