//! Dataset handle with column-role tracking.
//!
//! Wraps a polars `DataFrame` and tracks which columns are features,
//! labels, and predictions. All transforming operations are copy-based:
//! `filter`, `add_features`, and `add_predictions` leave the source frame
//! untouched, so no two walk-forward iterations alias the same table.
//!
//! Polars frames carry no row index, so every dataset gets a synthetic
//! `row_id` column at construction. Prediction frames carry `row_id` too;
//! it is the join and deduplication key when predictions are attached back
//! to a full dataset.

use std::collections::BTreeSet;

use polars::prelude::*;
use thiserror::Error;

/// Name of the synthetic row-index column.
pub const ROW_ID: &str = "row_id";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A tabular dataset with feature/label/prediction column roles.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    feature_cols: BTreeSet<String>,
    label_cols: BTreeSet<String>,
    prediction_cols: BTreeSet<String>,
}

impl Dataset {
    /// Create a dataset from a frame, tagging feature and label columns.
    ///
    /// A `row_id` column is appended when the frame does not already carry
    /// one, numbering rows from zero.
    pub fn new(
        frame: DataFrame,
        feature_cols: &[&str],
        label_cols: &[&str],
    ) -> Result<Self, DataError> {
        let frame = if has_column(&frame, ROW_ID) {
            frame
        } else {
            frame.with_row_index(ROW_ID.into(), None)?
        };

        for col in feature_cols.iter().chain(label_cols.iter()) {
            if !has_column(&frame, col) {
                return Err(DataError::MissingColumn((*col).to_string()));
            }
        }

        Ok(Self {
            frame,
            feature_cols: feature_cols.iter().map(|s| s.to_string()).collect(),
            label_cols: label_cols.iter().map(|s| s.to_string()).collect(),
            prediction_cols: BTreeSet::new(),
        })
    }

    /// The underlying frame.
    pub fn dataframe(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Whether the dataset has no rows.
    pub fn empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Column names tagged as features.
    pub fn feature_columns(&self) -> impl Iterator<Item = &str> {
        self.feature_cols.iter().map(|s| s.as_str())
    }

    /// Column names tagged as labels.
    pub fn label_columns(&self) -> impl Iterator<Item = &str> {
        self.label_cols.iter().map(|s| s.as_str())
    }

    /// Column names tagged as predictions.
    pub fn prediction_columns(&self) -> impl Iterator<Item = &str> {
        self.prediction_cols.iter().map(|s| s.as_str())
    }

    /// Feature columns as a frame.
    pub fn features(&self) -> Result<DataFrame, DataError> {
        Ok(self.frame.select(self.feature_cols.iter().cloned())?)
    }

    /// Label columns as a frame.
    pub fn labels(&self) -> Result<DataFrame, DataError> {
        Ok(self.frame.select(self.label_cols.iter().cloned())?)
    }

    /// Prediction columns as a frame.
    pub fn predictions(&self) -> Result<DataFrame, DataError> {
        Ok(self.frame.select(self.prediction_cols.iter().cloned())?)
    }

    /// Select arbitrary columns by name.
    pub fn select(&self, columns: &[String]) -> Result<DataFrame, DataError> {
        Ok(self.frame.select(columns.iter().cloned())?)
    }

    /// Unique values of a column, in first-seen order.
    pub fn unique_values(&self, column: &str) -> Result<Series, DataError> {
        let col = self
            .frame
            .column(column)
            .map_err(|_| DataError::MissingColumn(column.to_string()))?;
        Ok(col.as_materialized_series().unique_stable()?)
    }

    /// An independent copy of this dataset.
    pub fn deepcopy(&self) -> Self {
        self.clone()
    }

    /// A copy of this dataset carrying a different frame but the same
    /// column roles.
    pub fn with_frame(&self, frame: DataFrame) -> Self {
        Self {
            frame,
            feature_cols: self.feature_cols.clone(),
            label_cols: self.label_cols.clone(),
            prediction_cols: self.prediction_cols.clone(),
        }
    }

    /// A copy of this dataset with replaced frame and role sets.
    pub fn with_frame_and_roles(
        &self,
        frame: DataFrame,
        feature_cols: BTreeSet<String>,
        label_cols: BTreeSet<String>,
    ) -> Self {
        Self {
            frame,
            feature_cols,
            label_cols,
            prediction_cols: self.prediction_cols.clone(),
        }
    }

    /// Filter rows by a polars expression, returning an independent copy.
    pub fn filter(&self, predicate: Expr) -> Result<Self, DataError> {
        let filtered = self.frame.clone().lazy().filter(predicate).collect()?;
        Ok(self.with_frame(filtered))
    }

    /// Attach prediction columns from a frame keyed by `row_id`.
    ///
    /// Rows absent from `predictions` get nulls. New columns are tracked
    /// under the prediction role. An empty frame is a no-op.
    pub fn add_predictions(&mut self, predictions: &DataFrame) -> Result<(), DataError> {
        let added = self.join_on_row_id(predictions)?;
        self.prediction_cols.extend(added);
        Ok(())
    }

    /// Attach feature columns from a frame keyed by `row_id`.
    pub fn add_features(&mut self, features: &DataFrame) -> Result<(), DataError> {
        let added = self.join_on_row_id(features)?;
        self.feature_cols.extend(added);
        Ok(())
    }

    fn join_on_row_id(&mut self, incoming: &DataFrame) -> Result<Vec<String>, DataError> {
        if incoming.height() == 0 || !has_column(incoming, ROW_ID) {
            return Ok(Vec::new());
        }

        let added: Vec<String> = incoming
            .get_column_names_str()
            .into_iter()
            .filter(|name| *name != ROW_ID)
            .map(|name| name.to_string())
            .collect();

        let joined = self
            .frame
            .clone()
            .lazy()
            .join(
                incoming.clone().lazy(),
                [col(ROW_ID)],
                [col(ROW_ID)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?;

        self.frame = joined;
        Ok(added)
    }
}

fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_names_str().iter().any(|c| *c == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Dataset {
        let frame = df!(
            "Season" => [2000i64, 2000, 2001, 2001],
            "strength" => [0.2f64, 0.4, 0.6, 0.8],
            "outcome" => [1.0f64, 0.0, 1.0, 1.0],
        )
        .unwrap();
        Dataset::new(frame, &["strength"], &["outcome"]).unwrap()
    }

    #[test]
    fn test_row_id_assigned() {
        let ds = fixture();
        let ids: Vec<u32> = ds
            .dataframe()
            .column(ROW_ID)
            .unwrap()
            .u32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_role_selection() {
        let ds = fixture();
        assert_eq!(ds.features().unwrap().get_column_names_str(), ["strength"]);
        assert_eq!(ds.labels().unwrap().get_column_names_str(), ["outcome"]);
        assert!(ds.predictions().unwrap().is_empty());
    }

    #[test]
    fn test_missing_role_column_rejected() {
        let frame = df!("Season" => [2000i64]).unwrap();
        let err = Dataset::new(frame, &["nope"], &[]).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(c) if c == "nope"));
    }

    #[test]
    fn test_filter_does_not_mutate_source() {
        let ds = fixture();
        let filtered = ds.filter(col("Season").eq(lit(2000i64))).unwrap();
        assert_eq!(filtered.height(), 2);
        assert_eq!(ds.height(), 4);
    }

    #[test]
    fn test_filter_empty_is_valid() {
        let ds = fixture();
        let filtered = ds.filter(col("Season").eq(lit(1990i64))).unwrap();
        assert!(filtered.empty());
    }

    #[test]
    fn test_add_predictions_joins_on_row_id() {
        let mut ds = fixture();
        let preds = df!(
            ROW_ID => [2u32, 3],
            "outcome_pred" => [0.7f64, 0.9],
        )
        .unwrap();
        ds.add_predictions(&preds).unwrap();

        assert_eq!(
            ds.prediction_columns().collect::<Vec<_>>(),
            ["outcome_pred"]
        );
        let pred_col = ds.dataframe().column("outcome_pred").unwrap();
        assert_eq!(pred_col.f64().unwrap().get(0), None);
        assert_eq!(pred_col.f64().unwrap().get(2), Some(0.7));
    }

    #[test]
    fn test_add_empty_predictions_is_noop() {
        let mut ds = fixture();
        let width = ds.dataframe().width();
        ds.add_predictions(&DataFrame::empty()).unwrap();
        assert_eq!(ds.dataframe().width(), width);
        assert_eq!(ds.prediction_columns().count(), 0);
    }

    #[test]
    fn test_unique_values_order() {
        let ds = fixture();
        let seasons = ds.unique_values("Season").unwrap();
        let vals: Vec<i64> = seasons.i64().unwrap().into_no_null_iter().collect();
        assert_eq!(vals, vec![2000, 2001]);
    }
}
