//! Dataset handle, flat-file loading, and dataset merging.
//!
//! The dataset handle is the tabular collaborator the rest of the crate
//! filters and augments; it tracks which columns play the feature, label,
//! and prediction roles across copies.

pub mod dataset;
pub mod loader;
pub mod merger;

pub use dataset::{DataError, Dataset, ROW_ID};
pub use loader::{load_csv, load_parquet, write_csv};
pub use merger::Merger;
