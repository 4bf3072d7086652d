//! MLprod.

use super::{mask_and_renormalize, normalize_sum, Aggregator, FLOOR, MLPROD_ETA_CAP};
use crate::loss::Loss;
use crate::regret;

/// MLprod's accumulators: adaptive learning rates, cumulative squared
/// regret, a running per-expert max absolute regret, and cumulative regret
/// (here multiplicatively rescaled each step rather than summed directly).
#[derive(Debug, Clone)]
pub struct MLprodState {
    k: usize,
    learning_rates: Vec<f64>,
    cum_vars: Vec<f64>,
    max_losses: Vec<f64>,
    cum_regrets: Vec<f64>,
    current_weights: Vec<f64>,
}

impl MLprodState {
    pub fn new(k: usize) -> MLprodState {
        MLprodState {
            k,
            learning_rates: vec![FLOOR; k],
            cum_vars: vec![FLOOR; k],
            max_losses: vec![FLOOR; k],
            cum_regrets: vec![0.0; k],
            current_weights: vec![1.0 / k as f64; k],
        }
    }

    fn weights_from_state(&self, awake: &[bool]) -> Vec<f64> {
        let mut raw: Vec<f64> = (0..self.k)
            .map(|k| self.learning_rates[k] * self.cum_regrets[k].exp())
            .collect();
        normalize_sum(&mut raw);
        mask_and_renormalize(&raw, awake)
    }
}

impl Aggregator for MLprodState {
    fn current_weights(&self) -> &[f64] {
        &self.current_weights
    }

    fn step(&mut self, x: &[f64], y: f64, awake: &[bool], loss: &Loss, use_gradient_trick: bool) -> (f64, Vec<f64>) {
        let w_used = self.weights_from_state(awake);
        let (y_hat, r) = regret::compute(&w_used, x, y, awake, loss, use_gradient_trick);

        for k in 0..self.k {
            self.cum_vars[k] += r[k] * r[k];
            self.max_losses[k] = self.max_losses[k].max(r[k].abs());
        }

        let log_k = (self.k as f64).ln();
        let new_rates: Vec<f64> = (0..self.k)
            .map(|k| {
                let bound = (0.5 / self.max_losses[k]).min((log_k / self.cum_vars[k]).sqrt());
                bound.min(MLPROD_ETA_CAP)
            })
            .collect();

        for k in 0..self.k {
            self.cum_regrets[k] = (new_rates[k] / self.learning_rates[k]) * self.cum_regrets[k]
                + (1.0 + new_rates[k] * r[k]).ln();
        }
        self.learning_rates = new_rates;

        self.recompute_weights_from_state();
        (y_hat, w_used)
    }

    fn recompute_weights_from_state(&mut self) {
        self.current_weights = self.weights_from_state(&vec![true; self.k]);
    }
}
