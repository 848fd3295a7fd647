//! Storage layer: resumable progress state, the spreadsheet sink, and the
//! Parquet mirror of the law index.

mod atomic;
pub mod census;
mod error;
pub mod mirror;
pub mod progress;
pub mod sheet;

pub use census::{PdfCensus, count_pdfs};
pub use error::StoreError;
pub use mirror::{read_parquet, records_from_batch, records_to_batch, write_parquet};
pub use progress::{ALL_GROUP, ProgressState, ProgressStore, year_number_key};
pub use sheet::{RecordSheet, SheetFormat};
