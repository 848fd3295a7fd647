//! Direct PDF downloads.
//!
//! Bodies stream into a uniquely named temp file next to the target and are
//! persisted into place only once complete and verified. An interrupted crawl
//! never leaves a truncated file that a later existence check would take for
//! a finished download, and two writers aimed at one target never share a
//! temp file.

use std::path::Path;

use futures::{Stream, StreamExt};
use reqwest::header;
use tempfile::{Builder, TempPath};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::FetchError;
use crate::http::{HttpClient, header_string};

pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Suffix of in-flight download files.
pub const PART_SUFFIX: &str = ".part";

/// Accept a body as PDF by content type, or by its leading magic bytes.
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
        || head.starts_with(PDF_MAGIC)
}

/// Create `<dest>.<random>.part` beside `dest`, removed on drop unless persisted.
fn part_file(dest: &Path) -> Result<(std::fs::File, TempPath), FetchError> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut prefix = dest.file_name().unwrap_or_default().to_os_string();
    prefix.push(".");
    let tmp = Builder::new()
        .prefix(&prefix)
        .suffix(PART_SUFFIX)
        .tempfile_in(dir)?;
    Ok(tmp.into_parts())
}

fn persist(part: TempPath, dest: &Path) -> Result<(), FetchError> {
    part.persist(dest).map_err(|e| FetchError::Persist {
        path: dest.to_path_buf(),
        source: e.error,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { bytes: u64 },
    /// `dest` already existed; nothing was requested.
    AlreadyPresent,
}

/// Write an in-memory PDF through a temp file.
pub async fn write_pdf_file(dest: &Path, bytes: &[u8]) -> Result<u64, FetchError> {
    let (file, part) = part_file(dest)?;
    let mut file = fs::File::from_std(file);
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    persist(part, dest)?;
    Ok(bytes.len() as u64)
}

/// Stream chunks into `dest`, rejecting the body as soon as its first bytes
/// show it is not a PDF.
pub async fn write_pdf_stream<S, B, E>(
    url: &str,
    content_type: Option<&str>,
    stream: S,
    dest: &Path,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<FetchError>,
{
    let (file, part) = part_file(dest)?;
    // `part` deletes the temp file if anything below fails.
    let written = stream_to_file(url, content_type, stream, fs::File::from_std(file)).await?;
    persist(part, dest)?;
    Ok(written)
}

async fn stream_to_file<S, B, E>(
    url: &str,
    content_type: Option<&str>,
    stream: S,
    mut file: fs::File,
) -> Result<u64, FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<FetchError>,
{
    let mut stream = std::pin::pin!(stream);
    let mut head: Vec<u8> = Vec::with_capacity(PDF_MAGIC.len());
    let mut verified = false;
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        let chunk = chunk.as_ref();
        if !verified {
            let need = PDF_MAGIC.len() - head.len();
            head.extend_from_slice(&chunk[..need.min(chunk.len())]);
            if head.len() == PDF_MAGIC.len() {
                if !is_pdf(content_type, &head) {
                    return Err(not_pdf(url, content_type));
                }
                verified = true;
            }
        }
        file.write_all(chunk).await?;
        written += chunk.len() as u64;
    }
    if !verified && !is_pdf(content_type, &head) {
        return Err(not_pdf(url, content_type));
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn not_pdf(url: &str, content_type: Option<&str>) -> FetchError {
    FetchError::NotPdf {
        url: url.to_string(),
        content_type: content_type.map(str::to_string),
    }
}

/// Downloads PDFs over HTTP.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: HttpClient,
}

impl Downloader {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Fetch `url` into `dest` unless `dest` already exists.
    pub async fn download_pdf(&self, url: &str, dest: &Path) -> Result<DownloadOutcome, FetchError> {
        if fs::try_exists(dest).await? {
            debug!(path = %dest.display(), "already downloaded");
            return Ok(DownloadOutcome::AlreadyPresent);
        }
        let resp = self.http.get_response(url).await?;
        let content_type = header_string(resp.headers(), header::CONTENT_TYPE);
        let bytes = write_pdf_stream(url, content_type.as_deref(), resp.bytes_stream(), dest).await?;
        info!(url, path = %dest.display(), bytes, "downloaded PDF");
        Ok(DownloadOutcome::Downloaded { bytes })
    }
}
