//! MLpol (Polynomially Weighted Average with variable learning rates).

use super::{mask_and_renormalize, normalize_sum, Aggregator, FLOOR};
use crate::loss::Loss;
use crate::regret;

/// MLpol's accumulators: per-expert learning rates, cumulative regret, and a
/// single running scalar bounding the largest squared regret seen so far
/// (broadcast over all experts when used, matching the reference
/// implementation).
#[derive(Debug, Clone)]
pub struct MLpolState {
    k: usize,
    learning_rates: Vec<f64>,
    cum_regrets: Vec<f64>,
    max_sq_regret: f64,
    current_weights: Vec<f64>,
}

impl MLpolState {
    pub fn new(k: usize) -> MLpolState {
        MLpolState {
            k,
            learning_rates: vec![FLOOR; k],
            cum_regrets: vec![0.0; k],
            max_sq_regret: 0.0,
            current_weights: vec![1.0 / k as f64; k],
        }
    }

    fn weights_from_state(&self, awake: &[bool]) -> Vec<f64> {
        let mut raw: Vec<f64> = (0..self.k)
            .map(|k| self.learning_rates[k] * self.cum_regrets[k].max(0.0))
            .collect();
        let sum: f64 = raw.iter().sum();
        if sum == 0.0 {
            raw = vec![1.0 / self.k as f64; self.k];
        } else {
            normalize_sum(&mut raw);
        }
        mask_and_renormalize(&raw, awake)
    }
}

impl Aggregator for MLpolState {
    fn current_weights(&self) -> &[f64] {
        &self.current_weights
    }

    fn step(&mut self, x: &[f64], y: f64, awake: &[bool], loss: &Loss, use_gradient_trick: bool) -> (f64, Vec<f64>) {
        let w_used = self.weights_from_state(awake);
        let (y_hat, r) = regret::compute(&w_used, x, y, awake, loss, use_gradient_trick);

        for k in 0..self.k {
            self.cum_regrets[k] += r[k];
        }

        let max_r2 = r.iter().map(|&rk| rk * rk).fold(f64::NEG_INFINITY, f64::max);
        let delta = (max_r2 - self.max_sq_regret).max(0.0);

        for k in 0..self.k {
            self.learning_rates[k] = 1.0 / (1.0 / self.learning_rates[k] + r[k] * r[k] + delta);
        }
        self.max_sq_regret += delta;

        self.recompute_weights_from_state();
        (y_hat, w_used)
    }

    fn recompute_weights_from_state(&mut self) {
        self.current_weights = self.weights_from_state(&vec![true; self.k]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_uniform() {
        let mlpol = MLpolState::new(3);
        for &w in mlpol.current_weights() {
            assert_relative_eq!(w, 1.0 / 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn identical_experts_stay_uniform() {
        let mut mlpol = MLpolState::new(3);
        let loss = Loss::named("mse").unwrap();
        let awake = [true, true, true];
        for _ in 0..3 {
            let (y_hat, _) = mlpol.step(&[1.0, 1.0, 1.0], 0.0, &awake, &loss, false);
            assert_relative_eq!(y_hat, 1.0, epsilon = 1e-9);
        }
        for &w in mlpol.current_weights() {
            assert_relative_eq!(w, 1.0 / 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn sleeping_expert_excluded_from_weights() {
        let mut mlpol = MLpolState::new(3);
        let loss = Loss::named("mse").unwrap();
        let awake = [true, false, true];
        for _ in 0..3 {
            mlpol.step(&[10.0, -10.0, 0.0], 0.0, &awake, &loss, false);
        }
        assert_relative_eq!(mlpol.current_weights()[1], 0.0);
        let sum: f64 = mlpol.current_weights().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
    }
}
