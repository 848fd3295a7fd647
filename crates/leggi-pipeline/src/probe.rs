//! Enumerate laws by probing predictable PDF URLs.
//!
//! For sites without a listing: numbers 1, 2, 3, ... are tried per year until
//! too many consecutive probes come back without a PDF. Hits carry no page to
//! extract from, so the date comes from the `Content-Disposition` filename or
//! the PDF's first page, and the title from the first page.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use leggi_core::{DownloadStatus, LawDate, LawRecord, parse_italian_date};
use leggi_fetch::{FetchError, FetchedBody, HttpClient, is_pdf, write_pdf_file};
use leggi_store::year_number_key;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::PipelineError;
use crate::pdf_text::{PdfMetadata, first_page_text, pdf_metadata};
use crate::profile::ProbeSpec;
use crate::worker::{RunStats, Sink, status_for_error};

static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#).expect("disposition filename pattern")
});

/// Source of whole response bodies, headers included.
#[async_trait]
pub trait BodySource: Send + Sync {
    async fn fetch_body(&self, url: &str) -> Result<FetchedBody, FetchError>;
}

#[async_trait]
impl BodySource for HttpClient {
    async fn fetch_body(&self, url: &str) -> Result<FetchedBody, FetchError> {
        self.get_body(url).await
    }
}

/// Date carried by the filename in a `Content-Disposition` header, e.g.
/// `attachment; filename="LR_7_del_4_marzo_2019.pdf"`.
pub fn disposition_date(header: Option<&str>) -> Option<LawDate> {
    let header = header?;
    let name = DISPOSITION_FILENAME
        .captures(header)
        .and_then(|c| c.get(1))
        .map_or(header, |m| m.as_str());
    let spaced = name.replace("%20", " ").replace(['_', '-', '+'], " ");
    parse_italian_date(&spaced)
}

/// Outcome of probing one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeYear {
    pub probes: u32,
    pub hits: u32,
    /// Highest number tried.
    pub last_number: u32,
    /// False when a probe failed for reasons other than "no such law".
    pub complete: bool,
}

pub struct Prober<'a> {
    source: &'a dyn BodySource,
    spec: &'a ProbeSpec,
    region: &'a str,
    pdf_dir: &'a Path,
    sink: &'a Mutex<Sink>,
    stats: &'a RunStats,
    delay: Duration,
}

impl<'a> Prober<'a> {
    pub fn new(
        source: &'a dyn BodySource,
        spec: &'a ProbeSpec,
        region: &'a str,
        pdf_dir: &'a Path,
        sink: &'a Mutex<Sink>,
        stats: &'a RunStats,
        delay: Duration,
    ) -> Self {
        Self {
            source,
            spec,
            region,
            pdf_dir,
            sink,
            stats,
            delay,
        }
    }

    /// Probe `year` from number 1 until the miss limit is reached.
    pub async fn probe_year(&self, year: i32) -> Result<ProbeYear, PipelineError> {
        let mut out = ProbeYear {
            complete: true,
            ..ProbeYear::default()
        };
        let mut misses = 0;
        let mut number = 0;

        while misses < self.spec.max_consecutive_misses {
            number += 1;
            out.last_number = number;
            let key = year_number_key(year, number);
            if self.sink.lock().await.is_done(&key) {
                RunStats::add(&self.stats.already_done, 1);
                misses = 0;
                continue;
            }

            if out.probes > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            out.probes += 1;
            let url = self.spec.probe_url(year, number);

            match self.source.fetch_body(&url).await {
                Ok(body) if is_pdf(body.content_type.as_deref(), &body.bytes) => {
                    misses = 0;
                    out.hits += 1;
                    RunStats::add(&self.stats.candidates, 1);
                    self.store_hit(year, number, &url, &body, &key).await?;
                }
                Ok(body) => {
                    debug!(url, content_type = ?body.content_type, "no PDF at probe URL");
                    misses += 1;
                }
                Err(FetchError::Server { status: 404, .. }) => {
                    debug!(url, "no law at probe URL");
                    misses += 1;
                }
                Err(e) => {
                    warn!(url, error = %e, "probe failed");
                    out.complete = false;
                    misses += 1;
                }
            }
        }

        info!(
            region = self.region,
            year,
            probes = out.probes,
            hits = out.hits,
            last_number = out.last_number,
            "probing finished"
        );
        Ok(out)
    }

    async fn store_hit(
        &self,
        year: i32,
        number: u32,
        url: &str,
        body: &FetchedBody,
        key: &str,
    ) -> Result<(), PipelineError> {
        let meta = match first_page_text(body.bytes.clone()).await {
            Some(text) => pdf_metadata(&text),
            None => PdfMetadata::default(),
        };
        let title = meta.title.unwrap_or_else(|| self.spec.title(year, number));
        // A first-page date from another year is a cited law, not this one.
        let date = disposition_date(body.content_disposition.as_deref())
            .or(meta.date.filter(|d| d.year() == year));
        let n = number.to_string();
        let record = match date {
            Some(date) => LawRecord::new(self.region, title, Some(&n), Some(date)),
            None => LawRecord::new(self.region, title, Some(&n), LawDate::new(year, 1, 1))
                .with_display_date(year.to_string()),
        }
        .with_source(url);
        let record = self.sink.lock().await.reserve(record);

        let dest = self.pdf_dir.join(&record.filename);
        let status = if tokio::fs::try_exists(&dest).await? {
            DownloadStatus::Skipped
        } else {
            match write_pdf_file(&dest, &body.bytes).await {
                Ok(bytes) => {
                    info!(url, path = %dest.display(), bytes, "downloaded PDF");
                    DownloadStatus::Downloaded
                }
                Err(e) => {
                    warn!(url, path = %dest.display(), error = %e, "could not write PDF");
                    status_for_error(&e)
                }
            }
        };

        let record = record.with_status(status);
        self.stats.record(&record);
        if !self.sink.lock().await.record(record, key)? {
            RunStats::add(&self.stats.duplicates, 1);
        }
        Ok(())
    }
}
