//! Fetch layer: HTTP client with retry and backoff, streamed PDF downloads,
//! and headless-browser print-to-PDF.

pub mod download;
mod error;
pub mod http;
#[cfg(feature = "browser")]
pub mod render;

pub use download::{DownloadOutcome, Downloader, PART_SUFFIX, is_pdf, write_pdf_file};
pub use error::FetchError;
pub use http::{FetchedBody, HttpClient, RetryPolicy, with_retry};

#[cfg(feature = "browser")]
pub use render::{BrowserRenderer, RenderOptions, RenderedPage};
