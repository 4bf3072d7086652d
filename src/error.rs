//! The error taxonomy reported at the construction/`update` boundary.
//!
//! None of these are recoverable by the engine itself: they all indicate a
//! caller mistake (bad shapes, an unknown algorithm, a loss that needs a
//! gradient it wasn't given) that has to be fixed upstream.

use thiserror::Error;

/// Errors produced while constructing or driving a [`crate::Engine`][engine].
///
/// [engine]: crate::Engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A named loss string did not match one of the five supported losses.
    #[error("unsupported loss function: {0:?} (expected one of mape, mae, mse, msle, mspe)")]
    UnsupportedLoss(String),

    /// A custom loss was supplied with the gradient trick requested, but no
    /// gradient callable was given.
    #[error("use_gradient_trick requires a gradient, but the supplied loss has none")]
    MissingGradient,

    /// The experts matrix has no named columns, or its column count doesn't
    /// agree with the number of names supplied.
    #[error("bad experts: {0}")]
    BadExperts(String),

    /// The explicit initial weight vector has the wrong length or does not
    /// sum to 1.
    #[error("bad initial weights: {0}")]
    BadInitialWeights(String),

    /// The requested algorithm name is not one of BOA, MLpol, MLprod, FTRL.
    #[error("unknown algorithm: {0:?} (expected one of BOA, MLpol, MLprod, FTRL)")]
    UnknownAlgorithm(String),

    /// `experts`, `y`, or `awake` disagree on the number of rows or columns.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A column name in `new_experts` or `awake` doesn't match the engine's
    /// expert names.
    #[error("unknown expert column: {0:?}")]
    UnknownExpert(String),

    /// FTRL was selected with `use_gradient_trick = false`: FTRL's regret is
    /// always the linearised gradient surrogate, so it has no direct-loss form.
    #[error("FTRL requires use_gradient_trick = true (a usable gradient for the regret)")]
    FtrlMissingGradientOption,
}

/// Convenience alias used throughout the crate's public surface.
pub type Result<T> = std::result::Result<T, EngineError>;
