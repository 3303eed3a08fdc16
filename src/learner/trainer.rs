//! Trainer and Tester: feature/label plumbing around the model seam.

use polars::prelude::*;

use crate::data::{DataError, Dataset, ROW_ID};

use super::model::{ModelError, SharedModel};

/// Fits the shared model on a dataset's features and labels.
///
/// Input columns can be pinned explicitly; otherwise the dataset's tagged
/// feature columns are used.
pub struct Trainer {
    model: SharedModel,
    input_columns: Option<Vec<String>>,
}

impl Trainer {
    pub fn new(model: SharedModel) -> Self {
        Self {
            model,
            input_columns: None,
        }
    }

    pub fn with_input_columns(model: SharedModel, columns: Vec<String>) -> Self {
        Self {
            model,
            input_columns: Some(columns),
        }
    }

    pub fn train(&mut self, dataset: &Dataset) -> Result<(), TrainerError> {
        let features = input_frame(dataset, &self.input_columns)?;
        let labels = dataset.labels()?;
        self.model.borrow_mut().fit(&features, &labels)?;
        Ok(())
    }

    pub fn reset_state(&mut self) {
        self.model.borrow_mut().reset_state();
    }
}

/// Runs the shared model over a dataset and returns a prediction frame
/// keyed by `row_id`.
pub struct Tester {
    model: SharedModel,
    input_columns: Option<Vec<String>>,
}

impl Tester {
    pub fn new(model: SharedModel) -> Self {
        Self {
            model,
            input_columns: None,
        }
    }

    pub fn with_input_columns(model: SharedModel, columns: Vec<String>) -> Self {
        Self {
            model,
            input_columns: Some(columns),
        }
    }

    /// Predict on `dataset`, indexing the output like the input rows.
    pub fn test(&mut self, dataset: &Dataset) -> Result<DataFrame, TrainerError> {
        let features = input_frame(dataset, &self.input_columns)?;
        let predictions = self.model.borrow().predict(&features)?;
        let row_ids = dataset
            .dataframe()
            .column(ROW_ID)
            .map_err(DataError::from)?
            .clone();
        let keyed = predictions.hstack(&[row_ids]).map_err(DataError::from)?;
        Ok(keyed)
    }
}

fn input_frame(
    dataset: &Dataset,
    input_columns: &Option<Vec<String>>,
) -> Result<DataFrame, DataError> {
    match input_columns {
        Some(columns) => dataset.select(columns),
        None => dataset.features(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TrainerError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::model::{shared_model, MeanModel};

    fn fixture() -> Dataset {
        let frame = df!(
            "f" => [1.0f64, 2.0, 3.0],
            "outcome" => [1.0f64, 0.0, 1.0],
        )
        .unwrap();
        Dataset::new(frame, &["f"], &["outcome"]).unwrap()
    }

    #[test]
    fn test_trainer_and_tester_share_model() {
        let dataset = fixture();
        let model = shared_model(MeanModel::new());
        let mut trainer = Trainer::new(model.clone());
        let mut tester = Tester::new(model);

        trainer.train(&dataset).unwrap();
        let preds = tester.test(&dataset).unwrap();

        assert_eq!(preds.height(), 3);
        assert!(preds
            .get_column_names_str()
            .iter()
            .any(|c| *c == "outcome_pred"));
        assert!(preds.get_column_names_str().iter().any(|c| *c == ROW_ID));
    }

    #[test]
    fn test_explicit_input_columns() {
        let dataset = fixture();
        let model = shared_model(MeanModel::new());
        let mut trainer =
            Trainer::with_input_columns(model.clone(), vec!["f".to_string()]);
        trainer.train(&dataset).unwrap();

        let mut tester = Tester::with_input_columns(model, vec!["f".to_string()]);
        assert_eq!(tester.test(&dataset).unwrap().height(), 3);
    }

    #[test]
    fn test_reset_cascades_to_model() {
        let dataset = fixture();
        let model = shared_model(MeanModel::new());
        let mut trainer = Trainer::new(model.clone());
        let mut tester = Tester::new(model);

        trainer.train(&dataset).unwrap();
        trainer.reset_state();
        assert!(tester.test(&dataset).is_err());
    }
}
