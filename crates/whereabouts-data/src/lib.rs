//! Gazetteer data for the Whereabouts geocoder.
//!
//! This crate owns the record model shared by the engine and any gazetteer backend,
//! and the ingestion of the Ordnance Survey Open Names product into that model.

pub mod open_names;
mod record;
pub mod test_data;

pub use error::{DataError, Result};
pub use open_names::{OPEN_NAMES_CRS, read_open_names_csv, records_from_frame};
pub use record::{GazetteerRecord, LocalType};

mod error {
    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Invalid value {value:?} in column {column} (row {row})")]
        InvalidValue {
            column: &'static str,
            row: usize,
            value: String,
        },
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}
