//! Combining datasets produced by parallel learners.

use std::collections::BTreeSet;

use polars::prelude::*;

use super::dataset::{DataError, Dataset};

/// Joins several compatible datasets into one.
///
/// Each pair of frames is inner-joined on the columns they share (the
/// original rows plus `row_id`), so columns added by different learners
/// end up side by side on the same rows. Feature and label role sets are
/// unioned across the inputs.
#[derive(Debug, Default)]
pub struct Merger;

impl Merger {
    pub fn new() -> Self {
        Self
    }

    /// Merge `datasets` into a single dataset.
    ///
    /// The first dataset provides the base copy; its frame is replaced by
    /// the joined result.
    pub fn compute(&self, datasets: &[Dataset]) -> Result<Dataset, DataError> {
        let Some(first) = datasets.first() else {
            return Err(DataError::MissingColumn(
                "merger requires at least one dataset".to_string(),
            ));
        };
        if datasets.len() == 1 {
            return Ok(first.deepcopy());
        }

        let features: BTreeSet<String> = datasets
            .iter()
            .flat_map(|d| d.feature_columns().map(|s| s.to_string()))
            .collect();
        let labels: BTreeSet<String> = datasets
            .iter()
            .flat_map(|d| d.label_columns().map(|s| s.to_string()))
            .collect();

        let mut merged = first.dataframe().clone();
        for dataset in &datasets[1..] {
            merged = join_on_common(&merged, dataset.dataframe())?;
        }

        Ok(first.with_frame_and_roles(merged, features, labels))
    }
}

fn join_on_common(left: &DataFrame, right: &DataFrame) -> Result<DataFrame, DataError> {
    let right_names: BTreeSet<&str> = right.get_column_names_str().into_iter().collect();
    let common: Vec<Expr> = left
        .get_column_names_str()
        .into_iter()
        .filter(|name| right_names.contains(name))
        .map(col)
        .collect();

    let joined = left
        .clone()
        .lazy()
        .join(
            right.clone().lazy(),
            common.clone(),
            common,
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::super::dataset::ROW_ID;
    use super::*;

    #[test]
    fn test_merge_two_datasets_on_shared_columns() {
        let base = df!(
            "Season" => [2000i64, 2001],
            "outcome" => [1.0f64, 0.0],
        )
        .unwrap();
        let left = Dataset::new(base, &[], &["outcome"]).unwrap();

        let mut right = left.deepcopy();
        let extra = df!(
            ROW_ID => [0u32, 1],
            "elo" => [1500.0f64, 1600.0],
        )
        .unwrap();
        right.add_features(&extra).unwrap();

        let merged = Merger::new().compute(&[left, right]).unwrap();
        assert_eq!(merged.height(), 2);
        assert!(merged
            .dataframe()
            .get_column_names_str()
            .iter()
            .any(|c| *c == "elo"));
        assert!(merged.feature_columns().any(|c| c == "elo"));
        assert!(merged.label_columns().any(|c| c == "outcome"));
    }

    #[test]
    fn test_merge_single_dataset_is_copy() {
        let base = df!("Season" => [2000i64]).unwrap();
        let ds = Dataset::new(base, &[], &[]).unwrap();
        let merged = Merger::new().compute(&[ds]).unwrap();
        assert_eq!(merged.height(), 1);
    }

    #[test]
    fn test_merge_empty_input_is_error() {
        assert!(Merger::new().compute(&[]).is_err());
    }
}
