//! Flat-file loading.
//!
//! Storage is a boundary concern for this crate: these helpers read a CSV
//! or parquet file into a `DataFrame` so the CLI and tests have something
//! to walk over. Database connectors and richer sources stay outside.

use std::path::Path;

use polars::prelude::*;

use super::dataset::DataError;

/// Load a CSV file with a header row.
pub fn load_csv(path: &Path) -> Result<DataFrame, DataError> {
    if !path.exists() {
        return Err(DataError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }
    let lf = LazyCsvReader::new(path).with_has_header(true).finish()?;
    Ok(lf.collect()?)
}

/// Load a parquet file.
pub fn load_parquet(path: &Path) -> Result<DataFrame, DataError> {
    if !path.exists() {
        return Err(DataError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }
    let lf = LazyFrame::scan_parquet(path, ScanArgsParquet::default())?;
    Ok(lf.collect()?)
}

/// Write a frame out as CSV.
pub fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = std::fs::File::create(path)?;
    CsvWriter::new(file).finish(frame)?;
    Ok(())
}
