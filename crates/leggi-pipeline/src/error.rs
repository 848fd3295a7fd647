use std::path::PathBuf;

use leggi_core::CoreError;
use leggi_fetch::FetchError;
use leggi_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read profile {path}: {source}")]
    ProfileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse profile {path}: {source}")]
    ProfileParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error(transparent)]
    Pattern(#[from] CoreError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("worker pool closed: {0}")]
    Pool(#[from] tokio::sync::AcquireError),

    #[error("profile needs browser rendering but leggi was built without the `browser` feature")]
    BrowserUnavailable,
}
