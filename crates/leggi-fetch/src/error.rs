use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status} for {url}")]
    Server { status: u16, url: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not move download into {path}: {source}")]
    Persist {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("not a PDF: {url} ({})", content_type.as_deref().unwrap_or("no content type"))]
    NotPdf {
        url: String,
        content_type: Option<String>,
    },
    #[error("rendered PDF too small: {bytes} bytes (minimum {min})")]
    TooSmall { bytes: usize, min: usize },
    #[error("browser error: {0}")]
    Browser(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Server { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }
}
