//! Follow the Regularised Leader.

use super::Aggregator;
use crate::config::FtrlParams;
use crate::ftrl_solver::minimize;
use crate::loss::Loss;
use crate::regret::mixture_prediction;

/// FTRL's accumulators: the running sum of per-step linearised gradients,
/// the adaptive step size (`None` until the first observation, standing in
/// for the reference implementation's `+infinity` sentinel), and the
/// regulariser/constraint configuration the solver is called with each
/// step.
#[derive(Clone)]
pub struct FtrlState {
    k: usize,
    g: Vec<f64>,
    eta: Option<f64>,
    default_eta: bool,
    w0: Vec<f64>,
    params: FtrlParams,
    current_weights: Vec<f64>,
}

impl std::fmt::Debug for FtrlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtrlState")
            .field("g", &self.g)
            .field("eta", &self.eta)
            .field("current_weights", &self.current_weights)
            .finish()
    }
}

impl FtrlState {
    pub fn new(k: usize, params: FtrlParams) -> FtrlState {
        let w0 = vec![1.0 / k as f64; k];
        let zeros = vec![0.0; k];
        let init_w = minimize(&params.fun_reg_grad, 0.0, &zeros, &params.projection, &w0, params.options);
        FtrlState {
            k,
            g: zeros,
            eta: None,
            default_eta: true,
            w0,
            params,
            current_weights: init_w,
        }
    }

    /// The solver-computed minimiser of the regulariser alone, seeded at
    /// construction and used as the weight row for the very first step.
    pub fn initial_weights(&self) -> &[f64] {
        &self.current_weights
    }
}

impl Aggregator for FtrlState {
    fn current_weights(&self) -> &[f64] {
        &self.current_weights
    }

    fn step(&mut self, x: &[f64], y: f64, awake: &[bool], loss: &Loss, _use_gradient_trick: bool) -> (f64, Vec<f64>) {
        let w_used = super::mask_and_renormalize(&self.current_weights, awake);
        let y_hat = mixture_prediction(&w_used, x);

        let grad = loss.gradient(y_hat, y);
        let g_t: Vec<f64> = x
            .iter()
            .zip(awake)
            .map(|(&xk, &active)| if active { grad * xk } else { 0.0 })
            .collect();

        for k in 0..self.k {
            self.g[k] += g_t[k];
        }

        if self.default_eta {
            let sum_g2: f64 = g_t.iter().map(|&g| g * g).sum();
            self.eta = Some(match self.eta {
                None => 1.0 / sum_g2.sqrt(),
                Some(prev) => 1.0 / ((1.0 / prev).powi(2) + sum_g2).sqrt(),
            });
        }
        let eta = self.eta.expect("eta initialised by the branch above");

        self.current_weights = minimize(
            &self.params.fun_reg_grad,
            eta,
            &self.g,
            &self.params.projection,
            &self.current_weights,
            self.params.options,
        );

        (y_hat, w_used)
    }

    fn recompute_weights_from_state(&mut self) {
        // FTRL's weights are already the solver's output from the last
        // `step`; nothing to refresh.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FtrlParams;
    use approx::assert_relative_eq;

    #[test]
    fn initial_weights_are_uniform_minimiser() {
        let ftrl = FtrlState::new(4, FtrlParams::default_for_k(4));
        for &w in ftrl.initial_weights() {
            assert_relative_eq!(w, 0.25, epsilon = 1e-6);
        }
    }

    #[test]
    fn gradient_accumulates_across_steps() {
        let mut ftrl = FtrlState::new(2, FtrlParams::default_for_k(2));
        let loss = Loss::named("mse").unwrap();
        let awake = [true, true];
        ftrl.step(&[1.0, 2.0], 1.5, &awake, &loss, true);
        ftrl.step(&[1.0, 2.0], 1.5, &awake, &loss, true);
        assert!(ftrl.g.iter().any(|&g| g != 0.0));
    }

    #[test]
    fn weights_stay_on_simplex_after_steps() {
        let mut ftrl = FtrlState::new(3, FtrlParams::default_for_k(3));
        let loss = Loss::named("mse").unwrap();
        let awake = [true, true, true];
        for i in 0..5 {
            ftrl.step(&[1.0, 2.0, 3.0], (i % 3) as f64, &awake, &loss, true);
        }
        let sum: f64 = ftrl.current_weights().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        assert!(ftrl.current_weights().iter().all(|&w| w >= -1e-9));
    }
}
