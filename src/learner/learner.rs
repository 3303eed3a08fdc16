//! Walk-forward orchestration.
//!
//! A `Learner` runs one train/test cycle over the subsets its
//! `DataSelector` currently carves. An `UpdatingLearner` drives the full
//! walk-forward loop: train, test, advance the enumeration, repeat until
//! exhausted, accumulating predictions across iterations.

use polars::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::data::{DataError, Dataset, Merger, ROW_ID};
use crate::scope::{DataSelector, ScopeError};

use super::trainer::{Tester, Trainer, TrainerError};

/// Hard ceiling on walk-forward iterations, in case a scope configuration
/// slips past validation and fails to terminate.
const WALK_ITERATION_CAP: usize = 10_000;

#[derive(Error, Debug)]
pub enum LearnerError {
    /// A trainer or tester was invoked on a dataset with an empty table.
    /// Distinct from a scope combination matching no rows, which is a
    /// silent skip upstream.
    #[error("Missing data: cannot fit or predict on an empty dataset")]
    MissingData,

    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error(transparent)]
    Trainer(#[from] TrainerError),
}

/// One train/test cycle over selector-carved subsets.
pub struct Learner {
    pub trainer: Option<Trainer>,
    pub tester: Option<Tester>,
    pub selector: DataSelector,
    /// Terminal learners attach their outputs as predictions; feature
    /// stages attach them as features for downstream learners.
    pub terminal: bool,
}

impl Learner {
    pub fn new(trainer: Option<Trainer>, tester: Option<Tester>, selector: DataSelector) -> Self {
        Self {
            trainer,
            tester,
            selector,
            terminal: true,
        }
    }

    /// Mark this learner as a feature stage: outputs become features of
    /// the augmented dataset rather than final predictions.
    pub fn feature_stage(mut self) -> Self {
        self.terminal = false;
        self
    }

    /// Carve the current train/test subsets and run one fit/predict
    /// cycle.
    ///
    /// Returns `Ok(None)` when no tester is configured, and an empty
    /// frame when either subset matched no rows (silent skip).
    pub fn train_test(&mut self, dataset: &Dataset) -> Result<Option<DataFrame>, LearnerError> {
        let train = self.selector.transform_train(dataset)?;
        let test = self.selector.transform_test(dataset)?;
        if train.empty() || test.empty() {
            return Ok(Some(DataFrame::empty()));
        }
        self.train(&train)?;
        self.test(&test)
    }

    /// Fit the configured trainer. Empty data under a configured trainer
    /// is a hard error.
    pub fn train(&mut self, dataset: &Dataset) -> Result<(), LearnerError> {
        if let Some(trainer) = &mut self.trainer {
            if dataset.empty() {
                return Err(LearnerError::MissingData);
            }
            trainer.train(dataset)?;
        }
        Ok(())
    }

    /// Predict with the configured tester. Empty data under a configured
    /// tester is a hard error.
    pub fn test(&mut self, dataset: &Dataset) -> Result<Option<DataFrame>, LearnerError> {
        match &mut self.tester {
            Some(tester) => {
                if dataset.empty() {
                    return Err(LearnerError::MissingData);
                }
                Ok(Some(tester.test(dataset)?))
            }
            None => Ok(None),
        }
    }

    /// Run one train/test cycle and return a copy of `dataset` with the
    /// predictions attached (deduplicated keep-first on the row index).
    /// Without a tester the copy comes back unchanged.
    pub fn compute(&mut self, dataset: &Dataset) -> Result<Dataset, LearnerError> {
        let outputs = self.train_test(dataset)?;
        attach_outputs(dataset, outputs, self.terminal)
    }

    /// Advance the selector enumeration.
    pub fn update(&mut self) {
        self.selector.update();
    }

    /// Whether the selector still has combinations to yield.
    pub fn holds(&self) -> bool {
        self.selector.holds()
    }

    /// Reset the selector chain and the trainer's model for reuse.
    pub fn reset_state(&mut self) {
        self.selector.reset_state();
        if let Some(trainer) = &mut self.trainer {
            trainer.reset_state();
        }
    }
}

/// Walk-forward loop over a selector enumeration, optionally coordinating
/// nested feature learners whose outputs are merged into the working
/// dataset each iteration.
pub struct UpdatingLearner {
    pub base: Learner,
    pub learners: Vec<Learner>,
    pub merger: Option<Merger>,
}

impl UpdatingLearner {
    pub fn new(trainer: Option<Trainer>, tester: Option<Tester>, selector: DataSelector) -> Self {
        Self {
            base: Learner::new(trainer, tester, selector),
            learners: Vec::new(),
            merger: None,
        }
    }

    pub fn with_learners(
        trainer: Option<Trainer>,
        tester: Option<Tester>,
        selector: DataSelector,
        learners: Vec<Learner>,
    ) -> Self {
        let merger = if learners.is_empty() {
            None
        } else {
            Some(Merger::new())
        };
        Self {
            base: Learner::new(trainer, tester, selector),
            learners,
            merger,
        }
    }

    /// Run the walk-forward loop: while the enumeration holds, run the
    /// nested learners (each on a pristine copy, advancing its own
    /// scope), merge their outputs into the working dataset, train and
    /// test on the current combination, then advance.
    ///
    /// Returns `Ok(None)` when no tester is configured; an empty frame
    /// when the loop produced no output; otherwise the concatenated
    /// predictions of all iterations.
    pub fn train_test(&mut self, dataset: &Dataset) -> Result<Option<DataFrame>, LearnerError> {
        let mut outputs: Vec<DataFrame> = Vec::new();
        let pristine = dataset.deepcopy();
        let mut working = dataset.deepcopy();
        let mut iteration = 0usize;

        while self.base.selector.holds() {
            iteration += 1;
            if iteration > WALK_ITERATION_CAP {
                warn!(
                    cap = WALK_ITERATION_CAP,
                    "walk-forward iteration cap reached, stopping enumeration"
                );
                break;
            }
            info!(iteration, combination = %self.base.selector.describe(), "walk-forward step");

            if !self.learners.is_empty() {
                let mut staged = Vec::with_capacity(self.learners.len());
                for learner in &mut self.learners {
                    staged.push(learner.compute(&pristine)?);
                    learner.update();
                }
                if let Some(merger) = &self.merger {
                    working = merger.compute(&staged)?;
                }
            }

            if let Some(frame) = self.base.train_test(&working)? {
                if frame.height() > 0 {
                    outputs.push(frame);
                }
            }
            self.base.selector.update();
        }

        if self.base.tester.is_none() {
            return Ok(None);
        }
        if outputs.is_empty() {
            return Ok(Some(DataFrame::empty()));
        }
        let lazies: Vec<LazyFrame> = outputs.into_iter().map(|frame| frame.lazy()).collect();
        let combined = concat(lazies, UnionArgs::default())
            .and_then(LazyFrame::collect)
            .map_err(DataError::from)?;
        Ok(Some(combined))
    }

    /// Run the full loop and return a copy of `dataset` with all
    /// accumulated predictions attached (first occurrence wins on
    /// duplicate rows).
    pub fn compute(&mut self, dataset: &Dataset) -> Result<Dataset, LearnerError> {
        let outputs = self.train_test(dataset)?;
        attach_outputs(dataset, outputs, self.base.terminal)
    }

    /// Reset nested learners, the selector chain, and the model.
    pub fn reset_state(&mut self) {
        for learner in &mut self.learners {
            learner.reset_state();
        }
        self.base.reset_state();
    }
}

/// Attach a prediction frame to a copy of `dataset`, deduplicating on the
/// row index keep-first. `None` yields the copy unchanged.
fn attach_outputs(
    dataset: &Dataset,
    outputs: Option<DataFrame>,
    terminal: bool,
) -> Result<Dataset, LearnerError> {
    let Some(frame) = outputs else {
        return Ok(dataset.deepcopy());
    };
    let frame = dedup_first(frame)?;
    let mut augmented = dataset.deepcopy();
    if terminal {
        augmented.add_predictions(&frame)?;
    } else {
        augmented.add_features(&frame)?;
    }
    Ok(augmented)
}

fn dedup_first(frame: DataFrame) -> Result<DataFrame, DataError> {
    if frame.height() == 0 {
        return Ok(frame);
    }
    let deduped = frame
        .lazy()
        .unique_stable(Some(vec![ROW_ID.into()]), UniqueKeepStrategy::First)
        .collect()?;
    Ok(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::model::{Model, ModelError};
    use crate::scope::{Scope, ScopeSelector, WindowBound, WindowScopeConfig};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Counts fit/predict calls; predicts the fit count as a constant.
    struct CountingModel {
        fits: Cell<usize>,
        predictions: Cell<usize>,
    }

    impl CountingModel {
        fn new() -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                fits: Cell::new(0),
                predictions: Cell::new(0),
            }))
        }
    }

    impl Model for CountingModel {
        fn fit(&mut self, _features: &DataFrame, _labels: &DataFrame) -> Result<(), ModelError> {
            self.fits.set(self.fits.get() + 1);
            Ok(())
        }

        fn predict(&self, features: &DataFrame) -> Result<DataFrame, ModelError> {
            self.predictions.set(self.predictions.get() + 1);
            let value = self.fits.get() as f64;
            let series = Series::new(
                "outcome_pred".into(),
                vec![value; features.height()],
            );
            Ok(DataFrame::new(vec![series.into_column()])?)
        }

        fn reset_state(&mut self) {
            self.fits.set(0);
            self.predictions.set(0);
        }
    }

    fn dataset() -> Dataset {
        let frame = df!(
            "Season" => [2000i64, 2001, 2002],
            "f" => [1.0f64, 2.0, 3.0],
            "outcome" => [1.0f64, 0.0, 1.0],
        )
        .unwrap();
        Dataset::new(frame, &["f"], &["outcome"]).unwrap()
    }

    fn window_selector(start: i64, max: i64) -> DataSelector {
        let config = WindowScopeConfig {
            col: "Season".to_string(),
            start: WindowBound::Int(start),
            max: WindowBound::Int(max),
            size: 1,
            stride: 1,
        };
        DataSelector::new(
            vec![ScopeSelector::new(Scope::expander(config.clone()).unwrap())],
            vec![ScopeSelector::new(Scope::expander(config).unwrap())],
        )
    }

    fn pair(model: Rc<RefCell<CountingModel>>) -> (Trainer, Tester) {
        (Trainer::new(model.clone()), Tester::new(model))
    }

    #[test]
    fn test_learner_compute_attaches_predictions() {
        let model = CountingModel::new();
        let (trainer, tester) = pair(model.clone());
        let mut learner = Learner::new(
            Some(trainer),
            Some(tester),
            window_selector(2000, 2002),
        );

        let augmented = learner.compute(&dataset()).unwrap();
        assert!(augmented.prediction_columns().any(|c| c == "outcome_pred"));
        assert_eq!(model.borrow().fits.get(), 1);
        assert_eq!(model.borrow().predictions.get(), 1);
    }

    #[test]
    fn test_empty_subset_is_silent_skip() {
        let model = CountingModel::new();
        let (trainer, tester) = pair(model.clone());
        // Window far past the data: subsets are empty, nothing fits.
        let mut learner = Learner::new(
            Some(trainer),
            Some(tester),
            window_selector(2010, 2012),
        );

        let data = dataset();
        let frame = learner.train_test(&data).unwrap().unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(model.borrow().fits.get(), 0);

        let augmented = learner.compute(&data).unwrap();
        assert_eq!(augmented.prediction_columns().count(), 0);
    }

    #[test]
    fn test_train_on_empty_dataset_is_missing_data() {
        let model = CountingModel::new();
        let (trainer, _) = pair(model);
        let mut learner = Learner::new(Some(trainer), None, window_selector(2000, 2002));

        let empty = Dataset::new(
            df!(
                "Season" => Vec::<i64>::new(),
                "f" => Vec::<f64>::new(),
                "outcome" => Vec::<f64>::new(),
            )
            .unwrap(),
            &["f"],
            &["outcome"],
        )
        .unwrap();

        assert!(matches!(
            learner.train(&empty),
            Err(LearnerError::MissingData)
        ));
    }

    #[test]
    fn test_no_tester_returns_input_unchanged() {
        let model = CountingModel::new();
        let (trainer, _) = pair(model.clone());
        let mut learner = Learner::new(Some(trainer), None, window_selector(2000, 2002));

        let data = dataset();
        let augmented = learner.compute(&data).unwrap();
        assert_eq!(augmented.dataframe().width(), data.dataframe().width());
        // Training still happened.
        assert_eq!(model.borrow().fits.get(), 1);
    }

    #[test]
    fn test_walk_forward_runs_each_combination_once() {
        // Expander 2000..2002 size 1 stride 1 yields exactly 2 iterations.
        let model = CountingModel::new();
        let (trainer, tester) = pair(model.clone());
        let mut learner = UpdatingLearner::new(
            Some(trainer),
            Some(tester),
            window_selector(2000, 2002),
        );

        let augmented = learner.compute(&dataset()).unwrap();
        assert_eq!(model.borrow().fits.get(), 2);
        assert_eq!(model.borrow().predictions.get(), 2);

        // All three rows predicted; duplicates resolved keep-first, so
        // rows seen in iteration 1 keep the iteration-1 value.
        let preds: Vec<f64> = augmented
            .dataframe()
            .column("outcome_pred")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(preds, vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_walk_forward_empty_enumeration() {
        let model = CountingModel::new();
        let (trainer, tester) = pair(model.clone());
        // size 3 > max - start: not inside from the start.
        let config = WindowScopeConfig {
            col: "Season".to_string(),
            start: WindowBound::Int(2000),
            max: WindowBound::Int(2002),
            size: 3,
            stride: 1,
        };
        let selector = DataSelector::new(
            vec![ScopeSelector::new(Scope::expander(config.clone()).unwrap())],
            vec![ScopeSelector::new(Scope::expander(config).unwrap())],
        );
        let mut learner = UpdatingLearner::new(Some(trainer), Some(tester), selector);

        let frame = learner.train_test(&dataset()).unwrap().unwrap();
        assert_eq!(frame.height(), 0);
        assert_eq!(model.borrow().fits.get(), 0);
    }

    #[test]
    fn test_reset_state_allows_second_run() {
        let model = CountingModel::new();
        let (trainer, tester) = pair(model.clone());
        let mut learner = UpdatingLearner::new(
            Some(trainer),
            Some(tester),
            window_selector(2000, 2002),
        );

        learner.compute(&dataset()).unwrap();
        assert_eq!(model.borrow().fits.get(), 2);

        learner.reset_state();
        assert_eq!(model.borrow().fits.get(), 0);
        learner.compute(&dataset()).unwrap();
        assert_eq!(model.borrow().fits.get(), 2);
    }

    #[test]
    fn test_nested_feature_learners_merge_into_working_dataset() {
        let outer_model = CountingModel::new();
        let nested_model = CountingModel::new();

        let nested = Learner::new(
            Some(Trainer::new(nested_model.clone())),
            Some(Tester::new(nested_model.clone())),
            window_selector(2000, 2002),
        )
        .feature_stage();

        let (trainer, tester) = pair(outer_model.clone());
        let mut learner = UpdatingLearner::with_learners(
            Some(trainer),
            Some(tester),
            window_selector(2000, 2002),
            vec![nested],
        );

        let augmented = learner.compute(&dataset()).unwrap();
        // Nested learner ran once per outer iteration.
        assert_eq!(nested_model.borrow().fits.get(), 2);
        assert_eq!(outer_model.borrow().fits.get(), 2);
        assert!(augmented.prediction_columns().any(|c| c == "outcome_pred"));
    }
}
