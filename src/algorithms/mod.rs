//! The four aggregation state machines.
//!
//! Each owns its own accumulators (no shared superset struct) and implements
//! [`Aggregator`]. Dispatch between them is a tagged enum, [`AnyAggregator`],
//! mirroring the teacher's `SolverKind`/`SGDKind` pattern over `ISolver`.

mod boa;
mod ftrl;
mod mlpol;
mod mlprod;

pub use boa::BoaState;
pub use ftrl::FtrlState;
pub use mlpol::MLpolState;
pub use mlprod::MLprodState;

use crate::config::{Algorithm, FtrlParams};
use crate::loss::Loss;

/// Numerical floor applied to `cum_vars`, `max_losses` and `learning_rates`
/// at initialisation, so step 1 never divides by zero or logs zero.
pub(crate) const FLOOR: f64 = 1f64 / 1_048_576.0; // 2^-20

/// Cap on MLprod's adaptive learning rate, `1/epsilon` with `epsilon = 1e-30`.
pub(crate) const MLPROD_ETA_CAP: f64 = 1e30;

/// `2^ceil(log2(m))`, the power-of-two ceiling BOA uses to keep its
/// normalisation constant `B^2` numerically stable.
pub(crate) fn ceil_pow2(m: f64) -> f64 {
    if m <= 0.0 {
        return FLOOR;
    }
    2f64.powf(m.log2().ceil())
}

pub(crate) fn normalize_sum(w: &mut [f64]) {
    let sum: f64 = w.iter().sum();
    if sum > 0.0 {
        for wi in w.iter_mut() {
            *wi /= sum;
        }
    }
}

/// Zero out inactive entries, then renormalise over the active ones.
pub(crate) fn mask_and_renormalize(w: &[f64], awake: &[bool]) -> Vec<f64> {
    let mut masked: Vec<f64> = w.iter().zip(awake).map(|(&wi, &a)| if a { wi } else { 0.0 }).collect();
    normalize_sum(&mut masked);
    masked
}

/// The shared per-step contract every aggregation rule implements.
pub trait Aggregator {
    /// The weights that would be used for a prediction right now (all
    /// experts assumed active), refreshed after every step and by
    /// [`Aggregator::recompute_weights_from_state`].
    fn current_weights(&self) -> &[f64];

    /// Process one observation: derive this step's weights from the current
    /// state, compute the mixture prediction and regret, and fold the
    /// regret into the accumulators. Returns `(y_hat, weights_used)`, the
    /// pair recorded into history for this step.
    fn step(&mut self, x: &[f64], y: f64, awake: &[bool], loss: &Loss, use_gradient_trick: bool) -> (f64, Vec<f64>);

    /// Recompute [`Aggregator::current_weights`] from the latest
    /// accumulator state. A no-op duplication of `step`'s own bookkeeping
    /// for BOA/MLpol/MLprod, called once more by the façade at the end of
    /// each `update` batch so the exposed weights are always in sync with
    /// the latest accumulators. FTRL already leaves `current_weights` in
    /// that state after every `step`, so its implementation is a no-op.
    fn recompute_weights_from_state(&mut self);
}

/// Tagged dispatch over the four aggregation rules.
pub enum AnyAggregator {
    Boa(BoaState),
    MLpol(MLpolState),
    MLprod(MLprodState),
    Ftrl(FtrlState),
}

impl AnyAggregator {
    pub fn new(algorithm: Algorithm, k: usize, ftrl_params: Option<FtrlParams>) -> AnyAggregator {
        match algorithm {
            Algorithm::Boa => AnyAggregator::Boa(BoaState::new(k)),
            Algorithm::MLpol => AnyAggregator::MLpol(MLpolState::new(k)),
            Algorithm::MLprod => AnyAggregator::MLprod(MLprodState::new(k)),
            Algorithm::Ftrl => {
                let params = ftrl_params.unwrap_or_else(|| FtrlParams::default_for_k(k));
                AnyAggregator::Ftrl(FtrlState::new(k, params))
            }
        }
    }
}

impl Aggregator for AnyAggregator {
    fn current_weights(&self) -> &[f64] {
        match self {
            AnyAggregator::Boa(s) => s.current_weights(),
            AnyAggregator::MLpol(s) => s.current_weights(),
            AnyAggregator::MLprod(s) => s.current_weights(),
            AnyAggregator::Ftrl(s) => s.current_weights(),
        }
    }

    fn step(&mut self, x: &[f64], y: f64, awake: &[bool], loss: &Loss, use_gradient_trick: bool) -> (f64, Vec<f64>) {
        match self {
            AnyAggregator::Boa(s) => s.step(x, y, awake, loss, use_gradient_trick),
            AnyAggregator::MLpol(s) => s.step(x, y, awake, loss, use_gradient_trick),
            AnyAggregator::MLprod(s) => s.step(x, y, awake, loss, use_gradient_trick),
            AnyAggregator::Ftrl(s) => s.step(x, y, awake, loss, use_gradient_trick),
        }
    }

    fn recompute_weights_from_state(&mut self) {
        match self {
            AnyAggregator::Boa(s) => s.recompute_weights_from_state(),
            AnyAggregator::MLpol(s) => s.recompute_weights_from_state(),
            AnyAggregator::MLprod(s) => s.recompute_weights_from_state(),
            AnyAggregator::Ftrl(s) => s.recompute_weights_from_state(),
        }
    }
}
