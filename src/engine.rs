//! The façade: construction, batch `update`, batch `predict`, and read-only
//! access to history and configuration.

use log::{debug, info};

use crate::algorithms::{AnyAggregator, Aggregator};
use crate::config::{Algorithm, EngineConfig, FtrlParams};
use crate::error::EngineError;
use crate::history::History;
use crate::loss::Loss;

/// A named set of expert forecasts presented row by row: `columns[k]` is
/// expert `k`'s name, `rows[t]` is its length-K forecast vector at step `t`.
#[derive(Debug, Clone)]
pub struct Experts {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Experts {
    /// Build an expert matrix from named columns and row-major data. Fails
    /// with `BadExperts` if any row's length disagrees with `columns`.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Experts, EngineError> {
        if columns.is_empty() {
            return Err(EngineError::BadExperts("at least one expert column is required".to_owned()));
        }
        for (t, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(EngineError::BadExperts(format!(
                    "row {t} has {} columns, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Experts { columns, rows })
    }

    pub fn k(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Reorder this matrix's columns to match `target` names, failing with
    /// `UnknownExpert` if any name in `target` isn't one of ours.
    fn reorder_to(&self, target: &[String]) -> Result<Vec<Vec<f64>>, EngineError> {
        let mut indices = Vec::with_capacity(target.len());
        for name in target {
            let idx = self
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| EngineError::UnknownExpert(name.clone()))?;
            indices.push(idx);
        }
        Ok(self.rows.iter().map(|row| indices.iter().map(|&i| row[i]).collect()).collect())
    }
}

/// The online aggregation engine: holds the selected algorithm's state, the
/// append-only history, and the configuration it was built with.
pub struct Engine {
    config: EngineConfig,
    aggregator: AnyAggregator,
    history: History,
}

impl Engine {
    /// Construct an engine and immediately feed it `(experts, y, awake)`, as
    /// the reference implementation's constructor does.
    pub fn construct(
        experts: Experts,
        y: Vec<f64>,
        awake: Option<Vec<Vec<bool>>>,
        algorithm: Algorithm,
        initial_weights: Option<Vec<f64>>,
        loss: Loss,
        use_gradient_trick: bool,
        ftrl_params: Option<FtrlParams>,
    ) -> Result<Engine, EngineError> {
        let config = EngineConfig::new(
            algorithm,
            experts.column_names().to_vec(),
            loss,
            use_gradient_trick,
            initial_weights,
            ftrl_params,
        )?;

        info!(
            "constructing engine: algorithm={:?} k={} gradient_trick={}",
            config.algorithm, config.k, config.use_gradient_trick
        );

        let aggregator = AnyAggregator::new(config.algorithm, config.k, config.ftrl_params.clone());

        let mut engine = Engine {
            config,
            aggregator,
            history: History::new(experts.k()),
        };

        engine.update(experts, y, awake)?;
        Ok(engine)
    }

    /// Feed a batch of observations through the engine, in order, appending
    /// one history row per observation.
    pub fn update(&mut self, experts: Experts, y: Vec<f64>, awake: Option<Vec<Vec<bool>>>) -> Result<(), EngineError> {
        if experts.len() != y.len() {
            return Err(EngineError::ShapeMismatch(format!(
                "experts has {} rows, y has {}",
                experts.len(),
                y.len()
            )));
        }
        let rows = experts.reorder_to(self.config.expert_names.as_slice())?;

        let awake_rows: Vec<Vec<bool>> = match awake {
            Some(a) => {
                if a.len() != rows.len() {
                    return Err(EngineError::ShapeMismatch(format!(
                        "awake has {} rows, experts has {}",
                        a.len(),
                        rows.len()
                    )));
                }
                for row in &a {
                    if row.len() != self.config.k {
                        return Err(EngineError::ShapeMismatch(format!(
                            "awake row has {} columns, expected {}",
                            row.len(),
                            self.config.k
                        )));
                    }
                }
                a
            }
            None => vec![vec![true; self.config.k]; rows.len()],
        };

        debug!("update: processing {} rows", rows.len());

        for ((x, &target), awake_row) in rows.iter().zip(&y).zip(&awake_rows) {
            if awake_row.iter().all(|&a| !a) {
                let w_used = self.aggregator.current_weights().to_vec();
                let y_hat = crate::regret::mixture_prediction(&w_used, x);
                self.history.push(&w_used, y_hat, x, target, awake_row);
                continue;
            }

            let (y_hat, w_used) =
                self.aggregator
                    .step(x, target, awake_row, &self.config.loss, self.config.use_gradient_trick);
            self.history.push(&w_used, y_hat, x, target, awake_row);
        }

        self.aggregator.recompute_weights_from_state();

        Ok(())
    }

    /// Pure prediction: returns ŷ for each row of `experts` using the
    /// *current* weights, without touching any state or history.
    pub fn predict(&self, experts: &Experts, awake: Option<&[Vec<bool>]>) -> Result<Vec<f64>, EngineError> {
        let rows = experts.reorder_to(self.config.expert_names.as_slice())?;
        let w = self.aggregator.current_weights();

        let predictions = rows
            .iter()
            .enumerate()
            .map(|(t, x)| {
                let masked = match awake {
                    Some(a) => crate::algorithms::mask_and_renormalize(w, &a[t]),
                    None => w.to_vec(),
                };
                crate::regret::mixture_prediction(&masked, x)
            })
            .collect();
        Ok(predictions)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_weights(&self) -> &[f64] {
        self.aggregator.current_weights()
    }

    pub fn expert_names(&self) -> &[String] {
        &self.config.expert_names
    }

    pub fn k(&self) -> usize {
        self.config.k
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    pub fn loss_function(&self) -> &Loss {
        &self.config.loss
    }

    /// Mean empirical loss of the mixture to date.
    pub fn mean_loss(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .history
            .predictions()
            .iter()
            .zip(self.history.targets())
            .map(|(&y_hat, &y)| self.config.loss.value(y_hat, y))
            .sum();
        total / self.history.len() as f64
    }
}
