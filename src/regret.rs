//! The regret computer: turns (weights, experts, target, activation) into a
//! mixture prediction and a per-expert regret vector.
//!
//! Every aggregation rule calls this with its own current weight vector; the
//! rest of the per-step update differs by algorithm, but this piece is
//! shared verbatim.

use crate::loss::Loss;

/// `y_hat = sum_k w_k * x_k`.
pub fn mixture_prediction(w: &[f64], x: &[f64]) -> f64 {
    debug_assert_eq!(w.len(), x.len());
    w.iter().zip(x).map(|(wk, xk)| wk * xk).sum()
}

/// Compute the mixture prediction and the per-expert regret vector for one
/// step.
///
/// `awake[k] == false` zeroes expert `k`'s regret so its accumulators don't
/// move this step; it does not affect `y_hat`, which is always computed from
/// the weights handed in (the caller is responsible for having already
/// renormalised `w` over the active experts before calling this).
pub fn compute(
    w: &[f64],
    x: &[f64],
    y: f64,
    awake: &[bool],
    loss: &Loss,
    use_gradient_trick: bool,
) -> (f64, Vec<f64>) {
    let y_hat = mixture_prediction(w, x);

    let r = if use_gradient_trick {
        let grad = loss.gradient(y_hat, y);
        x.iter()
            .zip(awake)
            .map(|(&xk, &awake_k)| if awake_k { grad * (y_hat - xk) } else { 0.0 })
            .collect()
    } else {
        let loss_mixture = loss.value(y_hat, y);
        x.iter()
            .zip(awake)
            .map(|(&xk, &awake_k)| {
                if awake_k {
                    loss_mixture - loss.value(xk, y)
                } else {
                    0.0
                }
            })
            .collect()
    };

    (y_hat, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mixture_prediction_is_weighted_sum() {
        let w = [0.5, 0.5];
        let x = [2.0, 4.0];
        assert_relative_eq!(mixture_prediction(&w, &x), 3.0);
    }

    #[test]
    fn sleeping_expert_has_zero_regret() {
        let loss = Loss::named("mse").unwrap();
        let w = [1.0, 0.0];
        let x = [1.0, 100.0];
        let awake = [true, false];
        let (y_hat, r) = compute(&w, &x, 1.0, &awake, &loss, false);
        assert_relative_eq!(y_hat, 1.0);
        assert_relative_eq!(r[1], 0.0);
    }

    #[test]
    fn both_forms_match_their_closed_form_definitions() {
        let loss = Loss::named("mse").unwrap();
        let w = [0.3, 0.7];
        let x = [1.0, 2.0];
        let y = 1.5;
        let awake = [true, true];

        let (y_hat, r_direct) = compute(&w, &x, y, &awake, &loss, false);
        assert_relative_eq!(y_hat, 1.7, epsilon = 1e-12);
        let expected_direct: Vec<f64> = x
            .iter()
            .map(|&xk| loss.value(y_hat, y) - loss.value(xk, y))
            .collect();
        for (d, e) in r_direct.iter().zip(&expected_direct) {
            assert_relative_eq!(d, e, epsilon = 1e-12);
        }

        let (_, r_trick) = compute(&w, &x, y, &awake, &loss, true);
        let grad = loss.gradient(y_hat, y);
        let expected_trick: Vec<f64> = x.iter().map(|&xk| grad * (y_hat - xk)).collect();
        for (t, e) in r_trick.iter().zip(&expected_trick) {
            assert_relative_eq!(t, e, epsilon = 1e-12);
        }
    }
}
