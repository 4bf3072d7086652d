//! Bernstein Online Aggregation.

use super::{ceil_pow2, Aggregator, FLOOR};
use crate::loss::Loss;
use crate::regret;

/// BOA's accumulators: adaptive learning rates, cumulative squared regret
/// (the Bernstein variance term), a running per-expert max absolute regret,
/// the regularised cumulative regret driving the weight formula, and an
/// unregularised cumulative regret kept only for reporting.
#[derive(Debug, Clone)]
pub struct BoaState {
    k: usize,
    learning_rates: Vec<f64>,
    cum_vars: Vec<f64>,
    max_losses: Vec<f64>,
    cum_reg_regrets: Vec<f64>,
    cum_regrets_raw: Vec<f64>,
    current_weights: Vec<f64>,
}

impl BoaState {
    pub fn new(k: usize) -> BoaState {
        BoaState {
            k,
            learning_rates: vec![FLOOR; k],
            cum_vars: vec![FLOOR; k],
            max_losses: vec![FLOOR; k],
            cum_reg_regrets: vec![0.0; k],
            cum_regrets_raw: vec![0.0; k],
            current_weights: vec![1.0 / k as f64; k],
        }
    }

    fn weights_from_state(&self, awake: &[bool]) -> Vec<f64> {
        let log_uniform = (1.0 / self.k as f64).ln();
        let a: Vec<f64> = (0..self.k)
            .map(|k| {
                if awake[k] {
                    self.learning_rates[k].ln() + log_uniform + self.learning_rates[k] * self.cum_reg_regrets[k]
                } else {
                    f64::NEG_INFINITY
                }
            })
            .collect();
        let a_max = a.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut w: Vec<f64> = a
            .iter()
            .zip(awake)
            .map(|(&ak, &active)| if active { (ak - a_max).exp() } else { 0.0 })
            .collect();
        super::normalize_sum(&mut w);
        w
    }
}

impl Aggregator for BoaState {
    fn current_weights(&self) -> &[f64] {
        &self.current_weights
    }

    fn step(&mut self, x: &[f64], y: f64, awake: &[bool], loss: &Loss, use_gradient_trick: bool) -> (f64, Vec<f64>) {
        let w_used = self.weights_from_state(awake);
        let (y_hat, r) = regret::compute(&w_used, x, y, awake, loss, use_gradient_trick);

        for k in 0..self.k {
            self.max_losses[k] = self.max_losses[k].max(r[k].abs());
        }
        let b2: Vec<f64> = self.max_losses.iter().map(|&m| ceil_pow2(m)).collect();

        for k in 0..self.k {
            self.cum_vars[k] += r[k] * r[k];
        }

        let log_k = (self.k as f64).ln();
        for k in 0..self.k {
            self.learning_rates[k] = (1.0 / b2[k]).min((log_k / self.cum_vars[k]).sqrt());
        }

        for k in 0..self.k {
            let eta_r = self.learning_rates[k] * r[k];
            let clip = if eta_r > 0.5 { 1.0 } else { 0.0 };
            self.cum_reg_regrets[k] += 0.5 * (r[k] - self.learning_rates[k] * r[k] * r[k] + b2[k] * clip);
            self.cum_regrets_raw[k] += r[k];
        }

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
        let boa = BoaState::new(3);
        for &w in boa.current_weights() {
            assert_relative_eq!(w, 1.0 / 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn learning_rates_are_never_negative_or_zero() {
        let mut boa = BoaState::new(2);
        let loss = Loss::named("mse").unwrap();
        boa.step(&[1.0, 2.0], 1.5, &[true, true], &loss, false);
        assert!(boa.learning_rates.iter().all(|&eta| eta > 0.0));
    }

    #[test]
    fn perfect_expert_gains_weight_over_time() {
        let mut boa = BoaState::new(3);
        let loss = Loss::named("mse").unwrap();
        let awake = [true, true, true];
        let ys = [1.0, 1.0, 1.0, 1.0, 1.0];
        let xs = [
            [1.0, 0.0, 2.0],
            [1.0, 2.0, 0.0],
            [1.0, 0.5, 1.5],
            [1.0, 3.0, -1.0],
            [1.0, 0.0, 2.0],
        ];
        for (x, &y) in xs.iter().zip(&ys) {
            boa.step(x, y, &awake, &loss, false);
        }
        assert!(boa.current_weights()[0] > 0.8);
    }

    #[test]
    fn sleeping_expert_weight_stays_zero() {
        let mut boa = BoaState::new(3);
        let loss = Loss::named("mse").unwrap();
        let awake = [true, false, true];
        for _ in 0..3 {
            boa.step(&[10.0, -10.0, 0.0], 0.0, &awake, &loss, false);
        }
        assert_relative_eq!(boa.current_weights()[1], 0.0);
    }
}
