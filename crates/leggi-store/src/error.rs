use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt progress file {path}: {source}")]
    CorruptProgress {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("xlsx read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("could not move {path} into place: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parquet file not found: {0}")]
    ParquetNotFound(PathBuf),

    #[error("{0}")]
    Other(String),
}
