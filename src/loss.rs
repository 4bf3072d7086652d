//! Pointwise losses and their gradients.
//!
//! Five named losses are built in (MAPE, MAE, MSE, MSLE, MSPE); a caller may
//! also supply a custom loss, optionally paired with its gradient. The
//! gradient is only required when the engine is configured to use the
//! [gradient trick][crate::regret] for its regret computation.

use std::sync::Arc;

use crate::error::EngineError;

type LossFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// One of the five losses named in the public construction surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedLoss {
    /// Mean Absolute Percentage Error: `|y_hat - y| / y`.
    Mape,
    /// Mean Absolute Error: `|y_hat - y|`.
    Mae,
    /// Mean Squared Error: `(y_hat - y)^2`.
    Mse,
    /// Mean Squared Logarithmic Error: `(ln(y+1) - ln(y_hat+1))^2`.
    Msle,
    /// Mean Squared Percentage Error: `(y - y_hat)^2 / y^2`, using the
    /// analytically correct gradient `-2(y - y_hat) / y^2`.
    Mspe,
    /// Same value function as [`Mspe`][Self::Mspe], but keeping the
    /// reference implementation's gradient `-2*y_hat + 2*y` rather than the
    /// analytically correct one. Only present for bit-compatibility with
    /// callers ported from that implementation; see the open question in
    /// `SPEC_FULL.md` §9.
    MspeSourceCompat,
}

impl NamedLoss {
    /// Case-insensitive lookup by name, matching the five strings accepted
    /// by the public construction surface.
    pub fn from_name(name: &str) -> Option<NamedLoss> {
        match name.to_ascii_lowercase().as_str() {
            "mape" => Some(NamedLoss::Mape),
            "mae" => Some(NamedLoss::Mae),
            "mse" => Some(NamedLoss::Mse),
            "msle" => Some(NamedLoss::Msle),
            "mspe" => Some(NamedLoss::Mspe),
            _ => None,
        }
    }

    fn value(self, y_hat: f64, y: f64) -> f64 {
        match self {
            NamedLoss::Mape => (y_hat - y).abs() / y,
            NamedLoss::Mae => (y_hat - y).abs(),
            NamedLoss::Mse => (y_hat - y).powi(2),
            NamedLoss::Msle => ((y + 1.0).ln() - (y_hat + 1.0).ln()).powi(2),
            NamedLoss::Mspe | NamedLoss::MspeSourceCompat => (y - y_hat).powi(2) / y.powi(2),
        }
    }

    fn gradient(self, y_hat: f64, y: f64) -> f64 {
        match self {
            NamedLoss::Mape => (y_hat - y).signum() / y,
            NamedLoss::Mae => (y_hat - y).signum(),
            NamedLoss::Mse => 2.0 * (y_hat - y),
            NamedLoss::Msle => -2.0 * ((y + 1.0).ln() - (y_hat + 1.0).ln()) / (y_hat + 1.0),
            NamedLoss::Mspe => -2.0 * (y - y_hat) / y.powi(2),
            NamedLoss::MspeSourceCompat => -2.0 * y_hat + 2.0 * y,
        }
    }
}

/// A pointwise loss `L(y_hat, y)` paired with an optional gradient `dL/d
/// y_hat`.
#[derive(Clone)]
pub enum Loss {
    /// One of the five built-in losses.
    Named(NamedLoss),
    /// A user-supplied loss, with an optional gradient.
    Custom {
        value: LossFn,
        gradient: Option<LossFn>,
    },
}

impl std::fmt::Debug for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loss::Named(n) => write!(f, "Loss::Named({n:?})"),
            Loss::Custom { gradient, .. } => f
                .debug_struct("Loss::Custom")
                .field("has_gradient", &gradient.is_some())
                .finish(),
        }
    }
}

impl Loss {
    /// Look up one of the five named losses, case-insensitively.
    pub fn named(name: &str) -> Result<Loss, EngineError> {
        NamedLoss::from_name(name)
            .map(Loss::Named)
            .ok_or_else(|| EngineError::UnsupportedLoss(name.to_owned()))
    }

    /// The source-compatible MSPE gradient, for callers that need it. See
    /// [`NamedLoss::MspeSourceCompat`].
    pub fn mspe_source_compat() -> Loss {
        Loss::Named(NamedLoss::MspeSourceCompat)
    }

    /// Build a custom loss with no gradient. Using this with
    /// `use_gradient_trick = true` fails construction with
    /// [`EngineError::MissingGradient`].
    pub fn custom(value: impl Fn(f64, f64) -> f64 + Send + Sync + 'static) -> Loss {
        Loss::Custom {
            value: Arc::new(value),
            gradient: None,
        }
    }

    /// Build a custom loss together with its gradient.
    pub fn custom_with_gradient(
        value: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
        gradient: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
    ) -> Loss {
        Loss::Custom {
            value: Arc::new(value),
            gradient: Some(Arc::new(gradient)),
        }
    }

    /// Whether this loss carries a usable gradient.
    pub fn has_gradient(&self) -> bool {
        match self {
            Loss::Named(_) => true,
            Loss::Custom { gradient, .. } => gradient.is_some(),
        }
    }

    /// Evaluate `L(y_hat, y)`.
    pub fn value(&self, y_hat: f64, y: f64) -> f64 {
        match self {
            Loss::Named(n) => n.value(y_hat, y),
            Loss::Custom { value, .. } => value(y_hat, y),
        }
    }

    /// Evaluate `dL/d y_hat` at `(y_hat, y)`. Panics if the loss has no
    /// gradient; callers must check [`Loss::has_gradient`] (or rely on the
    /// construction-time check performed by [`crate::EngineConfig`]) before
    /// calling this in the gradient-trick path.
    pub fn gradient(&self, y_hat: f64, y: f64) -> f64 {
        match self {
            Loss::Named(n) => n.gradient(y_hat, y),
            Loss::Custom { gradient, .. } => {
                gradient.as_ref().expect("gradient checked at construction")(y_hat, y)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn named_lookup_is_case_insensitive() {
        assert_eq!(NamedLoss::from_name("MSE"), Some(NamedLoss::Mse));
        assert_eq!(NamedLoss::from_name("Mape"), Some(NamedLoss::Mape));
        assert_eq!(NamedLoss::from_name("bogus"), None);
    }

    #[test]
    fn mse_value_and_gradient() {
        let loss = Loss::named("mse").unwrap();
        assert_relative_eq!(loss.value(3.0, 1.0), 4.0);
        assert_relative_eq!(loss.gradient(3.0, 1.0), 4.0);
    }

    #[test]
    fn mspe_default_gradient_is_analytically_correct() {
        let loss = Loss::named("mspe").unwrap();
        let y_hat = 2.0;
        let y = 3.0;
        let h = 1e-6;
        let numeric = (loss.value(y_hat + h, y) - loss.value(y_hat - h, y)) / (2.0 * h);
        assert_relative_eq!(loss.gradient(y_hat, y), numeric, epsilon = 1e-4);
    }

    #[test]
    fn mspe_source_compat_keeps_literal_gradient() {
        let loss = Loss::mspe_source_compat();
        assert_relative_eq!(loss.gradient(2.0, 3.0), -2.0 * 2.0 + 2.0 * 3.0);
    }

    #[test]
    fn custom_without_gradient_reports_no_gradient() {
        let loss = Loss::custom(|y_hat, y| (y_hat - y).abs());
        assert!(!loss.has_gradient());
    }
}
