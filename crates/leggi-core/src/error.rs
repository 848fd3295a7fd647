use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid pattern {pattern}: {reason}")]
    Pattern { pattern: String, reason: String },
}
