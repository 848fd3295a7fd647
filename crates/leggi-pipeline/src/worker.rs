//! Bounded worker pool for per-law jobs.
//!
//! Jobs run as tokio tasks gated by a `Semaphore`. The sheet and the progress
//! store sit together behind one async `Mutex`; counters are atomics.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use leggi_core::{DownloadStatus, LawRecord};
use leggi_fetch::{DownloadOutcome, Downloader, FetchError, HttpClient};
use leggi_store::{ProgressStore, RecordSheet};
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::PipelineError;
use crate::detail::{DetailExtractor, LawDetail};
use crate::listing::Candidate;
use crate::profile::{Acquisition, MetadataSource};

// ── Acquisition ──────────────────────────────────────────────────────

/// Fetches detail pages and puts PDFs on disk.
#[async_trait]
pub trait Acquirer: Send + Sync {
    async fn detail_html(&self, url: &str) -> Result<String, FetchError>;

    /// Place the PDF obtained from `url` at `dest`, unless `dest` already exists.
    async fn acquire(&self, url: &str, dest: &Path) -> Result<DownloadOutcome, FetchError>;
}

/// Plain HTTP: detail pages via GET, PDFs streamed to disk.
pub struct HttpAcquirer {
    http: HttpClient,
    downloader: Downloader,
}

impl HttpAcquirer {
    pub fn new(http: HttpClient) -> Self {
        Self {
            downloader: Downloader::new(http.clone()),
            http,
        }
    }
}

#[async_trait]
impl Acquirer for HttpAcquirer {
    async fn detail_html(&self, url: &str) -> Result<String, FetchError> {
        self.http.get_text(url).await
    }

    async fn acquire(&self, url: &str, dest: &Path) -> Result<DownloadOutcome, FetchError> {
        self.downloader.download_pdf(url, dest).await
    }
}

/// Headless browser: detail pages rendered, PDFs printed from the page.
#[cfg(feature = "browser")]
pub struct RenderAcquirer {
    renderer: Arc<leggi_fetch::BrowserRenderer>,
}

#[cfg(feature = "browser")]
impl RenderAcquirer {
    pub fn new(renderer: Arc<leggi_fetch::BrowserRenderer>) -> Self {
        Self { renderer }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl Acquirer for RenderAcquirer {
    async fn detail_html(&self, url: &str) -> Result<String, FetchError> {
        self.renderer.page_html(url).await
    }

    async fn acquire(&self, url: &str, dest: &Path) -> Result<DownloadOutcome, FetchError> {
        if tokio::fs::try_exists(dest).await? {
            return Ok(DownloadOutcome::AlreadyPresent);
        }
        let page = self.renderer.render(url).await?;
        let bytes = leggi_fetch::write_pdf_file(dest, &page.pdf).await?;
        info!(url, path = %dest.display(), bytes, "printed PDF");
        Ok(DownloadOutcome::Downloaded { bytes })
    }
}

/// Spreadsheet label for a failed fetch.
pub fn status_for_error(e: &FetchError) -> DownloadStatus {
    match e {
        FetchError::NotPdf { .. } => DownloadStatus::failed("not a PDF"),
        FetchError::TooSmall { .. } => DownloadStatus::failed("Empty"),
        FetchError::Server { status, .. } => DownloadStatus::failed(format!("HTTP {status}")),
        FetchError::RetriesExhausted { last, .. } => match status_for_error(last) {
            failed @ DownloadStatus::Failed(_) => failed,
            _ => DownloadStatus::error(e),
        },
        other => DownloadStatus::error(other),
    }
}

// ── Shared state ─────────────────────────────────────────────────────

/// The sheet and the progress store, mutated together.
#[derive(Debug)]
pub struct Sink {
    sheet: RecordSheet,
    progress: ProgressStore,
    flush_every: usize,
    /// Filenames claimed by jobs that have not recorded their row yet.
    in_flight: HashSet<String>,
}

impl Sink {
    pub fn new(sheet: RecordSheet, progress: ProgressStore, flush_every: usize) -> Self {
        Self {
            sheet,
            progress,
            flush_every: flush_every.max(1),
            in_flight: HashSet::new(),
        }
    }

    /// Claim `record`'s filename before anything is written under it.
    ///
    /// When another job holds the name, or a different law (by source URL)
    /// already recorded it, the record moves to the first free
    /// [`LawRecord::with_filename_variant`]. The claim lasts until
    /// [`record`](Self::record) is called with the returned record.
    pub fn reserve(&mut self, record: LawRecord) -> LawRecord {
        let mut n = 1;
        let mut candidate = record.clone();
        while self.is_taken(&candidate) {
            n += 1;
            candidate = record.clone().with_filename_variant(n);
        }
        if n > 1 {
            info!(
                filename = %record.filename,
                renamed = %candidate.filename,
                "filename already used by another law"
            );
        }
        self.in_flight.insert(candidate.filename.clone());
        candidate
    }

    fn is_taken(&self, record: &LawRecord) -> bool {
        if self.in_flight.contains(&record.filename) {
            return true;
        }
        self.sheet.get(&record.filename).is_some_and(|existing| {
            !existing.status.is_failure() && existing.source_url != record.source_url
        })
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.progress.contains(key)
    }

    pub fn is_group_done(&self, group: &str) -> bool {
        self.progress.is_group_done(group)
    }

    pub fn sheet(&self) -> &RecordSheet {
        &self.sheet
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Append a row and, unless it failed, mark `key` processed. Flushes
    /// once `flush_every` rows have accumulated. Returns false when the
    /// filename was already taken by a successful row.
    pub fn record(&mut self, record: LawRecord, key: &str) -> Result<bool, PipelineError> {
        self.in_flight.remove(&record.filename);
        let succeeded = !record.status.is_failure();
        let appended = self.sheet.push(record);
        if succeeded {
            self.progress.mark_done(key);
        }
        if self.sheet.unflushed() >= self.flush_every {
            self.flush()?;
        }
        Ok(appended)
    }

    /// Close a traversal group: record it as done when `complete`, then flush.
    pub fn finish_group(&mut self, group: Option<&str>, complete: bool) -> Result<(), PipelineError> {
        if let Some(group) = group
            && complete
        {
            self.progress.mark_group_done(group);
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), PipelineError> {
        self.sheet.flush()?;
        self.progress.save()?;
        Ok(())
    }
}

/// Counters updated by every job.
#[derive(Debug, Default)]
pub struct RunStats {
    pub candidates: AtomicUsize,
    pub already_done: AtomicUsize,
    pub downloaded: AtomicUsize,
    pub skipped: AtomicUsize,
    pub abrogated: AtomicUsize,
    pub failed: AtomicUsize,
    pub errors: AtomicUsize,
    pub duplicates: AtomicUsize,
    pub missing_number: AtomicUsize,
    pub missing_date: AtomicUsize,
}

/// Point-in-time copy of [`RunStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub candidates: usize,
    pub already_done: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub abrogated: usize,
    pub failed: usize,
    pub errors: usize,
    pub duplicates: usize,
    pub missing_number: usize,
    pub missing_date: usize,
}

impl StatsSnapshot {
    pub fn failures(&self) -> usize {
        self.failed + self.errors
    }
}

impl RunStats {
    pub fn add(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a finished row by status and missing metadata.
    pub fn record(&self, record: &LawRecord) {
        let counter = match record.status {
            DownloadStatus::Downloaded => &self.downloaded,
            DownloadStatus::Skipped => &self.skipped,
            DownloadStatus::Abrogated => &self.abrogated,
            DownloadStatus::Failed(_) => &self.failed,
            DownloadStatus::Error(_) | DownloadStatus::Pending => &self.errors,
        };
        Self::add(counter, 1);
        if !record.has_number() {
            Self::add(&self.missing_number, 1);
        }
        if !record.has_date() {
            Self::add(&self.missing_date, 1);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicUsize| c.load(Ordering::Relaxed);
        StatsSnapshot {
            candidates: get(&self.candidates),
            already_done: get(&self.already_done),
            downloaded: get(&self.downloaded),
            skipped: get(&self.skipped),
            abrogated: get(&self.abrogated),
            failed: get(&self.failed),
            errors: get(&self.errors),
            duplicates: get(&self.duplicates),
            missing_number: get(&self.missing_number),
            missing_date: get(&self.missing_date),
        }
    }
}

// ── Jobs ─────────────────────────────────────────────────────────────

/// One law to process, keyed for progress tracking.
#[derive(Debug, Clone)]
pub struct Job {
    pub key: String,
    pub candidate: Candidate,
}

impl Job {
    /// Listing jobs are keyed by their detail URL.
    pub fn from_candidate(candidate: Candidate) -> Self {
        Self {
            key: candidate.url.clone(),
            candidate,
        }
    }
}

/// Everything a job needs, shared across workers.
pub struct JobContext {
    pub region: String,
    pub pdf_dir: PathBuf,
    pub metadata_from: MetadataSource,
    pub acquisition: Acquisition,
    pub extractor: DetailExtractor,
    pub acquirer: Arc<dyn Acquirer>,
    pub sink: Arc<Mutex<Sink>>,
    pub stats: Arc<RunStats>,
    pub request_delay: Duration,
}

impl JobContext {
    /// Extract, acquire and record one law. Per-law failures end up in the
    /// row's status; only storage failures are returned as errors.
    pub async fn process(&self, job: Job) -> Result<(), PipelineError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        let candidate = &job.candidate;

        let law = match self.metadata_from {
            MetadataSource::Listing => self.extractor.from_listing(candidate),
            MetadataSource::Detail => match self.acquirer.detail_html(&candidate.url).await {
                Ok(html) => self.extractor.from_detail_page(&html, candidate),
                Err(e) => {
                    warn!(url = %candidate.url, error = %e, "detail page failed");
                    let law = self.extractor.from_listing(candidate);
                    let record = self.sink.lock().await.reserve(self.build_record(&law, candidate));
                    return self.finish(record.with_status(status_for_error(&e)), &job.key).await;
                }
            },
        };

        let record = self.sink.lock().await.reserve(self.build_record(&law, candidate));
        let dest = self.pdf_dir.join(&record.filename);

        let status = if law.abrogated {
            remove_abrogated_file(&dest).await;
            DownloadStatus::Abrogated
        } else {
            let source = match self.acquisition {
                Acquisition::Direct => law.pdf_url.clone(),
                Acquisition::Render => Some(candidate.url.clone()),
            };
            match source {
                None => DownloadStatus::failed("no PDF link"),
                Some(url) => match self.acquirer.acquire(&url, &dest).await {
                    Ok(DownloadOutcome::Downloaded { .. }) => DownloadStatus::Downloaded,
                    Ok(DownloadOutcome::AlreadyPresent) => DownloadStatus::Skipped,
                    Err(e) => {
                        warn!(url, filename = %record.filename, error = %e, "acquisition failed");
                        status_for_error(&e)
                    }
                },
            }
        };
        self.finish(record.with_status(status), &job.key).await
    }

    fn build_record(&self, law: &LawDetail, candidate: &Candidate) -> LawRecord {
        LawRecord::new(
            &self.region,
            law.title.clone(),
            law.metadata.number.as_deref(),
            law.metadata.date,
        )
        .with_source(candidate.url.clone())
    }

    async fn finish(&self, record: LawRecord, key: &str) -> Result<(), PipelineError> {
        debug!(filename = %record.filename, status = %record.status, "recorded");
        self.stats.record(&record);
        let mut sink = self.sink.lock().await;
        if !sink.record(record, key)? {
            RunStats::add(&self.stats.duplicates, 1);
        }
        Ok(())
    }
}

async fn remove_abrogated_file(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => info!(path = %dest.display(), "removed PDF of abrogated law"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dest.display(), error = %e, "could not remove abrogated PDF"),
    }
}

/// Run `jobs` with at most `workers` in flight.
pub async fn run_jobs(
    jobs: Vec<Job>,
    ctx: Arc<JobContext>,
    workers: usize,
) -> Result<(), PipelineError> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();

    for job in jobs {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let ctx = Arc::clone(&ctx);
        set.spawn(async move {
            let _permit = permit;
            ctx.process(job).await
        });
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined? {
            set.abort_all();
            return Err(e);
        }
    }
    Ok(())
}
