//! Online prediction by expert aggregation.
//!
//! Given a sequence of targets and, at each step, a vector of expert
//! forecasts, this crate maintains a mixing weight over the experts and
//! produces a combined prediction. Four aggregation rules are provided:
//! [BOA][algorithms::BoaState], [MLpol][algorithms::MLpolState],
//! [MLprod][algorithms::MLprodState] and [FTRL][algorithms::FtrlState]. They
//! share a regret computation and a history log, and differ only in how
//! they turn accumulated regret into a weight vector.
//!
//! ```
//! use expertmix::{Algorithm, Engine, Experts, Loss};
//!
//! let experts = Experts::new(
//!     vec!["a".to_owned(), "b".to_owned()],
//!     vec![vec![1.0, 0.0], vec![1.0, 2.0], vec![1.0, -1.0]],
//! ).unwrap();
//! let y = vec![1.0, 1.0, 1.0];
//!
//! let engine = Engine::construct(
//!     experts,
//!     y,
//!     None,
//!     Algorithm::Boa,
//!     None,
//!     Loss::named("mse").unwrap(),
//!     false,
//!     None,
//! ).unwrap();
//!
//! assert_eq!(engine.history().len(), 3);
//! ```

pub mod algorithms;
pub mod config;
pub mod engine;
pub mod error;
pub mod ftrl_solver;
pub mod history;
pub mod loss;
pub mod regret;

pub use config::{Algorithm, EngineConfig, FtrlParams};
pub use engine::{Engine, Experts};
pub use error::{EngineError, Result};
pub use history::History;
pub use loss::{Loss, NamedLoss};
