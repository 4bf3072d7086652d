//! The constrained convex minimiser behind FTRL's weight update.
//!
//! The reference implementation hands the objective `fun_reg(x) + eta *
//! <G, x>`, its gradient, and a constraint list (one equality `sum(x) == 1`
//! plus `N` inequalities `x >= 0`) to a general-purpose sequential quadratic
//! programming routine. `SPEC_FULL.md` §9 allows "any equivalent
//! primal-dual, projected-gradient, or active-set method"; this
//! implementation uses projected gradient descent, with the constraint set
//! expressed as a projection operator (the simplex by default) rather than
//! as a literal equality/inequality list, since a closed-form Euclidean
//! projection exists for the simplex and keeps the solver allocation-light
//! and dependency-free.

use std::sync::Arc;

use log::warn;

/// `x -> phi(x)`, a smooth convex regulariser.
pub type RegFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;
/// `x -> grad phi(x)`.
pub type RegGradFn = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;
/// `x -> project(x)` onto the feasible set.
pub type ProjectionFn = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

/// Solver tuning knobs, mirroring the reference implementation's `tol` and
/// `options: {maxiter}` keys.
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Terminate once successive iterates move less than this, in L2 norm.
    pub tol: f64,
    /// Hard cap on the number of projected-gradient iterations.
    pub max_iter: usize,
}

impl Default for SolverOptions {
    fn default() -> SolverOptions {
        SolverOptions {
            tol: 1e-20,
            max_iter: 500,
        }
    }
}

/// Euclidean projection of `v` onto the probability simplex `{x : x >= 0,
/// sum(x) == 1}` (Held, Wolfe & Crowder 1974 / Duchi et al. 2008).
pub fn project_to_simplex(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    if n == 0 {
        return Vec::new();
    }

    let mut sorted: Vec<f64> = v.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumsum = 0.0;
    let mut rho = 0usize;
    let mut threshold = 0.0;
    for (j, &u_j) in sorted.iter().enumerate() {
        cumsum += u_j;
        let candidate = u_j + (1.0 - cumsum) / (j as f64 + 1.0);
        if candidate > 0.0 {
            rho = j + 1;
            threshold = (cumsum - 1.0) / (j as f64 + 1.0);
        }
    }
    if rho == 0 {
        // Degenerate (e.g. all entries equal and very negative); fall back
        // to the barycenter, which is always feasible.
        return vec![1.0 / n as f64; n];
    }
    let lambda = threshold;

    v.iter().map(|&vi| (vi - lambda).max(0.0)).collect()
}

/// Minimise a smooth convex objective `f(x) = phi(x) + eta * <g, x>` over the
/// feasible set defined by `projection`, warm-started at `x0`.
///
/// Uses projected gradient descent with a diminishing step size, which
/// converges for convex Lipschitz objectives over a compact feasible set --
/// sufficient here since `phi` is convex and the simplex is compact.
pub fn minimize(
    reg_grad: &RegGradFn,
    eta: f64,
    g: &[f64],
    projection: &ProjectionFn,
    x0: &[f64],
    options: SolverOptions,
) -> Vec<f64> {
    let mut x = projection(x0);
    if x.is_empty() {
        return x;
    }

    let mut converged = false;
    for iter in 0..options.max_iter {
        let grad_phi = reg_grad(&x);
        let grad: Vec<f64> = grad_phi.iter().zip(g).map(|(&gp, &gk)| gp + eta * gk).collect();

        let step = 1.0 / (iter as f64 + 2.0).sqrt();
        let candidate: Vec<f64> = x.iter().zip(&grad).map(|(&xi, &gi)| xi - step * gi).collect();
        let projected = projection(&candidate);

        let delta: f64 = projected
            .iter()
            .zip(&x)
            .map(|(&a, &b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();

        x = projected;
        if delta < options.tol {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            "FTRL solver did not converge within {} iterations (tol = {})",
            options.max_iter, options.tol
        );
    }

    x
}

/// The default regulariser: KL divergence to a uniform (or otherwise
/// supplied) anchor `w0`, `phi(x) = sum_k x_k * ln(x_k / w0_k)`.
///
/// Evaluated with a numerical floor on `x` to keep the logarithm finite at
/// the simplex boundary, matching the 2^-20 floor used elsewhere in the
/// engine's accumulators.
pub fn kl_to_anchor(w0: Vec<f64>) -> (RegFn, RegGradFn) {
    const FLOOR: f64 = 1f64 / 1_048_576.0; // 2^-20

    let w0_value = w0.clone();
    let value: RegFn = Arc::new(move |x: &[f64]| {
        x.iter()
            .zip(&w0_value)
            .map(|(&xi, &w0i)| {
                let xi = xi.max(FLOOR);
                xi * (xi / w0i).ln()
            })
            .sum()
    });

    let w0_grad = w0;
    let gradient: RegGradFn = Arc::new(move |x: &[f64]| {
        x.iter()
            .zip(&w0_grad)
            .map(|(&xi, &w0i)| (xi.max(FLOOR) / w0i).ln() + 1.0)
            .collect()
    });

    (value, gradient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_of_interior_point_is_identity() {
        let v = [0.3, 0.3, 0.4];
        let p = project_to_simplex(&v);
        for (a, b) in p.iter().zip(&v) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn projection_lands_on_simplex() {
        let v = [5.0, -2.0, 0.1];
        let p = project_to_simplex(&v);
        let sum: f64 = p.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
        assert!(p.iter().all(|&x| x >= -1e-12));
    }

    #[test]
    fn minimize_kl_with_zero_gradient_returns_anchor() {
        let n = 4;
        let w0 = vec![1.0 / n as f64; n];
        let (_value, grad) = kl_to_anchor(w0.clone());
        let x0 = vec![1.0 / n as f64; n];
        let g = vec![0.0; n];
        let projection: ProjectionFn = Arc::new(project_to_simplex);
        let x = minimize(&grad, 1.0, &g, &projection, &x0, SolverOptions::default());
        for (a, b) in x.iter().zip(&w0) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn minimize_pulls_mass_toward_lower_gradient_coordinate() {
        let n = 3;
        let w0 = vec![1.0 / n as f64; n];
        let (_value, grad) = kl_to_anchor(w0);
        let x0 = vec![1.0 / n as f64; n];
        // Expert 0 has a much larger cumulative gradient (regret), so the
        // minimiser should shift weight away from it.
        let g = vec![10.0, 0.0, 0.0];
        let projection: ProjectionFn = Arc::new(project_to_simplex);
        let x = minimize(&grad, 1.0, &g, &projection, &x0, SolverOptions::default());
        assert!(x[0] < x[1]);
        assert!(x[0] < x[2]);
    }
}
