//! The fit/predict collaborator seam.
//!
//! Model internals (gradient boosting, neural nets, ...) live outside this
//! crate; the walk-forward loop only needs fit and predict. `MeanModel` is
//! the reference implementation behind the seam, used by the CLI and the
//! tests.

use std::cell::RefCell;
use std::rc::Rc;

use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid model input: {0}")]
    InvalidInput(String),
}

/// A predictive model at the crate boundary.
///
/// `predict` must return one row per input row; prediction column names
/// must not collide with dataset columns (the `_pred` suffix convention).
pub trait Model {
    fn fit(&mut self, features: &DataFrame, labels: &DataFrame) -> Result<(), ModelError>;

    fn predict(&self, features: &DataFrame) -> Result<DataFrame, ModelError>;

    /// Drop fitted state so the model can be reused across trials.
    fn reset_state(&mut self);
}

/// A model shared between a trainer and a tester.
///
/// The walk-forward loop is strictly single-threaded, so plain reference
/// counting with interior mutability is sufficient.
pub type SharedModel = Rc<RefCell<dyn Model>>;

/// Wrap a model for sharing between a `Trainer` and a `Tester`.
pub fn shared_model<M: Model + 'static>(model: M) -> SharedModel {
    Rc::new(RefCell::new(model))
}

/// Baseline predictor: each label column's training mean, for every row.
#[derive(Debug, Default)]
pub struct MeanModel {
    means: Option<Vec<(String, f64)>>,
}

impl MeanModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Model for MeanModel {
    fn fit(&mut self, _features: &DataFrame, labels: &DataFrame) -> Result<(), ModelError> {
        if labels.width() == 0 {
            return Err(ModelError::InvalidInput(
                "mean model requires at least one label column".to_string(),
            ));
        }
        let mut means = Vec::with_capacity(labels.width());
        for column in labels.get_columns() {
            let mean = column
                .cast(&DataType::Float64)?
                .f64()?
                .mean()
                .unwrap_or(0.0);
            means.push((column.name().to_string(), mean));
        }
        self.means = Some(means);
        Ok(())
    }

    fn predict(&self, features: &DataFrame) -> Result<DataFrame, ModelError> {
        let means = self.means.as_ref().ok_or(ModelError::NotFitted)?;
        let height = features.height();
        let columns: Vec<Column> = means
            .iter()
            .map(|(name, mean)| {
                Series::new(format!("{}_pred", name).into(), vec![*mean; height]).into_column()
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    fn reset_state(&mut self) {
        self.means = None;
    }
}
