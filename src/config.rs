//! Construction-time configuration and validation.
//!
//! Mirrors the teacher's `SolverConfig`: an explicit field list rather than a
//! derive-heavy builder, validated once at construction so that `step` never
//! has to re-check shapes or re-derive whether a gradient is available.

use crate::error::EngineError;
use crate::ftrl_solver::{kl_to_anchor, project_to_simplex, ProjectionFn, RegFn, RegGradFn, SolverOptions};
use crate::loss::Loss;
use std::sync::Arc;

/// One of the four aggregation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Boa,
    MLpol,
    MLprod,
    Ftrl,
}

impl Algorithm {
    /// Case-insensitive lookup, matching the four names accepted by the
    /// public construction surface.
    pub fn from_name(name: &str) -> Result<Algorithm, EngineError> {
        match name.to_ascii_lowercase().as_str() {
            "boa" => Ok(Algorithm::Boa),
            "mlpol" => Ok(Algorithm::MLpol),
            "mlprod" => Ok(Algorithm::MLprod),
            "ftrl" => Ok(Algorithm::Ftrl),
            _ => Err(EngineError::UnknownAlgorithm(name.to_owned())),
        }
    }
}

/// FTRL-only knobs: the regulariser, its gradient, the feasible-set
/// projection standing in for the constraint list (see `ftrl_solver`), and
/// the solver's stopping criteria.
#[derive(Clone)]
pub struct FtrlParams {
    pub fun_reg: RegFn,
    pub fun_reg_grad: RegGradFn,
    pub projection: ProjectionFn,
    pub options: SolverOptions,
}

impl std::fmt::Debug for FtrlParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtrlParams").field("options", &self.options).finish()
    }
}

impl FtrlParams {
    /// The default: KL divergence to the uniform anchor, simplex
    /// constraints, `tol = 1e-20`, `maxiter = 500`.
    pub fn default_for_k(k: usize) -> FtrlParams {
        let w0 = vec![1.0 / k as f64; k];
        let (fun_reg, fun_reg_grad) = kl_to_anchor(w0);
        FtrlParams {
            fun_reg,
            fun_reg_grad,
            projection: Arc::new(project_to_simplex),
            options: SolverOptions::default(),
        }
    }

    /// Override the regulariser and its gradient, keeping the default
    /// simplex projection and solver options.
    pub fn with_regularizer(k: usize, fun_reg: RegFn, fun_reg_grad: RegGradFn) -> FtrlParams {
        let mut params = FtrlParams::default_for_k(k);
        params.fun_reg = fun_reg;
        params.fun_reg_grad = fun_reg_grad;
        params
    }

    pub fn with_tol(mut self, tol: f64) -> FtrlParams {
        self.options.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> FtrlParams {
        self.options.max_iter = max_iter;
        self
    }
}

/// Engine construction parameters, validated once by [`EngineConfig::new`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub algorithm: Algorithm,
    pub k: usize,
    pub expert_names: Vec<String>,
    pub loss: Loss,
    pub use_gradient_trick: bool,
    pub initial_weights: Vec<f64>,
    pub ftrl_params: Option<FtrlParams>,
}

impl EngineConfig {
    /// Validate and build a config. `initial_weights = None` means uniform
    /// `1/K`. `ftrl_params = None` with `algorithm = Ftrl` falls back to
    /// [`FtrlParams::default_for_k`].
    pub fn new(
        algorithm: Algorithm,
        expert_names: Vec<String>,
        loss: Loss,
        use_gradient_trick: bool,
        initial_weights: Option<Vec<f64>>,
        ftrl_params: Option<FtrlParams>,
    ) -> Result<EngineConfig, EngineError> {
        let k = expert_names.len();
        if k == 0 {
            return Err(EngineError::BadExperts("at least one expert column is required".to_owned()));
        }

        if use_gradient_trick && !loss.has_gradient() {
            return Err(EngineError::MissingGradient);
        }
        if algorithm == Algorithm::Ftrl && !use_gradient_trick {
            return Err(EngineError::FtrlMissingGradientOption);
        }

        let initial_weights = match initial_weights {
            None => vec![1.0 / k as f64; k],
            Some(w) => {
                if w.len() != k {
                    return Err(EngineError::BadInitialWeights(format!(
                        "expected length {k}, got {}",
                        w.len()
                    )));
                }
                if w.iter().any(|&wi| wi < 0.0) {
                    return Err(EngineError::BadInitialWeights("entries must be non-negative".to_owned()));
                }
                let sum: f64 = w.iter().sum();
                if (sum - 1.0).abs() > 1e-9 {
                    return Err(EngineError::BadInitialWeights(format!("entries must sum to 1, got {sum}")));
                }
                w
            }
        };

        let ftrl_params = if algorithm == Algorithm::Ftrl {
            Some(ftrl_params.unwrap_or_else(|| FtrlParams::default_for_k(k)))
        } else {
            None
        };

        Ok(EngineConfig {
            algorithm,
            k,
            expert_names,
            loss,
            use_gradient_trick,
            initial_weights,
            ftrl_params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(k: usize) -> Vec<String> {
        (0..k).map(|i| format!("e{i}")).collect()
    }

    #[test]
    fn rejects_unknown_algorithm_name() {
        assert!(Algorithm::from_name("bogus").is_err());
    }

    #[test]
    fn rejects_mismatched_initial_weights_length() {
        let cfg = EngineConfig::new(
            Algorithm::Boa,
            names(3),
            Loss::named("mse").unwrap(),
            false,
            Some(vec![0.5, 0.5]),
            None,
        );
        assert_eq!(
            cfg.unwrap_err(),
            EngineError::BadInitialWeights("expected length 3, got 2".to_owned())
        );
    }

    #[test]
    fn rejects_initial_weights_not_summing_to_one() {
        let cfg = EngineConfig::new(
            Algorithm::Boa,
            names(2),
            Loss::named("mse").unwrap(),
            false,
            Some(vec![0.1, 0.2]),
            None,
        );
        assert!(matches!(cfg, Err(EngineError::BadInitialWeights(_))));
    }

    #[test]
    fn ftrl_requires_gradient_trick() {
        let cfg = EngineConfig::new(Algorithm::Ftrl, names(2), Loss::named("mse").unwrap(), false, None, None);
        assert_eq!(cfg.unwrap_err(), EngineError::FtrlMissingGradientOption);
    }

    #[test]
    fn custom_loss_without_gradient_rejected_under_gradient_trick() {
        let cfg = EngineConfig::new(
            Algorithm::Boa,
            names(2),
            Loss::custom(|y_hat, y| (y_hat - y).abs()),
            true,
            None,
            None,
        );
        assert_eq!(cfg.unwrap_err(), EngineError::MissingGradient);
    }

    #[test]
    fn defaults_to_uniform_weights() {
        let cfg = EngineConfig::new(Algorithm::Boa, names(4), Loss::named("mse").unwrap(), false, None, None).unwrap();
        assert_eq!(cfg.initial_weights, vec![0.25; 4]);
    }
}
