//! One region, end to end: traverse, extract, acquire, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use leggi_core::filename::region_stem;
use leggi_fetch::HttpClient;
use leggi_store::{ALL_GROUP, ProgressStore, RecordSheet, SheetFormat, write_parquet};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::PipelineError;
use crate::detail::DetailExtractor;
use crate::listing::{ListingSelectors, ListingWalker, PageSource, StopReason};
use crate::probe::{BodySource, Prober};
use crate::profile::{ListingSpec, ProbeSpec, SiteProfile, SourceSpec};
use crate::worker::{Acquirer, HttpAcquirer, Job, JobContext, RunStats, Sink, StatsSnapshot, run_jobs};

/// Where a region's outputs live under the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdfs")
    }

    pub fn sheet_path(&self, region: &str, format: SheetFormat) -> PathBuf {
        self.root
            .join(format!("{}_laws.{}", region_stem(region), format.extension()))
    }

    pub fn parquet_path(&self, region: &str) -> PathBuf {
        self.root.join(format!("{}_laws.parquet", region_stem(region)))
    }

    pub fn progress_path(&self) -> PathBuf {
        self.root.join("progress.json")
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub region: String,
    /// Groups traversed in this run.
    pub groups: usize,
    /// Groups skipped because an earlier run finished them.
    pub groups_skipped: usize,
    pub pages: u32,
    pub probes: u32,
    /// Rows in the sheet after the run, including earlier runs.
    pub rows: usize,
    pub stats: StatsSnapshot,
    pub sheet_path: PathBuf,
    pub parquet_path: PathBuf,
}

pub struct Pipeline {
    profile: SiteProfile,
    layout: OutputLayout,
    pages: Arc<dyn PageSource>,
    bodies: Arc<dyn BodySource>,
    acquirer: Arc<dyn Acquirer>,
}

impl Pipeline {
    pub fn new(
        profile: SiteProfile,
        layout: OutputLayout,
        pages: Arc<dyn PageSource>,
        bodies: Arc<dyn BodySource>,
        acquirer: Arc<dyn Acquirer>,
    ) -> Self {
        Self {
            profile,
            layout,
            pages,
            bodies,
            acquirer,
        }
    }

    /// Wire the pipeline to the network as the profile describes. One
    /// headless browser is launched when listing pages or PDFs need it.
    pub fn connect(profile: SiteProfile, out_dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        profile.validate()?;
        let http = HttpClient::new(profile.run.http_timeout(), profile.run.retry)?;
        let browser = browser_parts(&profile)?;
        let pages: Arc<dyn PageSource> = match browser.pages {
            Some(pages) => pages,
            None => Arc::new(http.clone()),
        };
        let acquirer: Arc<dyn Acquirer> = match browser.acquirer {
            Some(acquirer) => acquirer,
            None => Arc::new(HttpAcquirer::new(http.clone())),
        };
        Ok(Self::new(
            profile,
            OutputLayout::new(out_dir),
            pages,
            Arc::new(http),
            acquirer,
        ))
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run every pending group, then write the Parquet mirror of the sheet.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let profile = &self.profile;
        profile.validate()?;
        let region = profile.region.as_str();

        tokio::fs::create_dir_all(self.layout.pdf_dir()).await?;
        let sheet_path = self.layout.sheet_path(region, profile.run.sheet_format);
        let sheet = RecordSheet::open(&sheet_path)?;
        let progress = ProgressStore::open(self.layout.progress_path())?;
        info!(
            region,
            rows = sheet.len(),
            done = progress.len(),
            out = %self.layout.root().display(),
            "starting run"
        );

        let sink = Arc::new(Mutex::new(Sink::new(sheet, progress, profile.run.flush_every)));
        let stats = Arc::new(RunStats::default());
        let mut report = RunReport {
            region: region.to_string(),
            groups: 0,
            groups_skipped: 0,
            pages: 0,
            probes: 0,
            rows: 0,
            stats: StatsSnapshot::default(),
            sheet_path,
            parquet_path: self.layout.parquet_path(region),
        };

        match &profile.source {
            SourceSpec::Listing(spec) => {
                self.run_listing(spec, &sink, &stats, &mut report).await?;
            }
            SourceSpec::Probe(spec) => {
                self.run_probe(spec, &sink, &stats, &mut report).await?;
            }
        }

        let mut sink = sink.lock().await;
        sink.flush()?;
        let records = sink.sheet().records();
        let written = write_parquet(&report.parquet_path, records)?;
        report.rows = records.len();
        report.stats = stats.snapshot();
        info!(
            region,
            rows = written,
            downloaded = report.stats.downloaded,
            failed = report.stats.failures(),
            "run finished"
        );
        Ok(report)
    }

    async fn run_listing(
        &self,
        spec: &ListingSpec,
        sink: &Arc<Mutex<Sink>>,
        stats: &Arc<RunStats>,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let profile = &self.profile;
        let selectors = ListingSelectors::from_spec(spec)?;
        let ctx = Arc::new(JobContext {
            region: profile.region.clone(),
            pdf_dir: self.layout.pdf_dir(),
            metadata_from: profile.metadata_from,
            acquisition: profile.acquisition,
            extractor: DetailExtractor::from_profile(profile)?,
            acquirer: Arc::clone(&self.acquirer),
            sink: Arc::clone(sink),
            stats: Arc::clone(stats),
            request_delay: profile.run.request_delay(),
        });
        let walker = ListingWalker::new(
            self.pages.as_ref(),
            spec,
            &selectors,
            profile.run.request_delay(),
        );

        let groups: Vec<Option<i32>> = match profile.years() {
            Some(years) => years.into_iter().map(Some).collect(),
            None => vec![None],
        };

        for year in groups {
            let label = year.map_or_else(|| ALL_GROUP.to_string(), |y| y.to_string());
            if year.is_some() && sink.lock().await.is_group_done(&label) {
                info!(group = %label, "group already finished, skipping");
                report.groups_skipped += 1;
                continue;
            }

            let traversal = walker.traverse(year).await;
            report.groups += 1;
            report.pages += traversal.pages;

            let jobs: Vec<Job> = {
                let sink = sink.lock().await;
                traversal
                    .candidates
                    .into_iter()
                    .filter(|c| {
                        let done = sink.is_done(&c.url);
                        if done {
                            RunStats::add(&stats.already_done, 1);
                        }
                        !done
                    })
                    .map(Job::from_candidate)
                    .collect()
            };
            RunStats::add(&stats.candidates, jobs.len());
            info!(group = %label, pages = traversal.pages, jobs = jobs.len(), stop = %traversal.stop, "traversal finished");

            let failures_before = stats.snapshot().failures();
            run_jobs(jobs, Arc::clone(&ctx), profile.run.workers).await?;
            let clean = stats.snapshot().failures() == failures_before;
            let complete = clean && traversal.stop != StopReason::FetchFailed;
            if !complete {
                warn!(group = %label, "group had failures; it will be revisited next run");
            }
            sink.lock()
                .await
                .finish_group(year.is_some().then_some(label.as_str()), complete)?;
        }
        Ok(())
    }

    async fn run_probe(
        &self,
        spec: &ProbeSpec,
        sink: &Arc<Mutex<Sink>>,
        stats: &Arc<RunStats>,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let pdf_dir = self.layout.pdf_dir();
        let prober = Prober::new(
            self.bodies.as_ref(),
            spec,
            &self.profile.region,
            &pdf_dir,
            sink.as_ref(),
            stats.as_ref(),
            self.profile.run.request_delay(),
        );
        let years = self.profile.years().unwrap_or_else(|| spec.years.years());

        for year in years {
            let label = year.to_string();
            if sink.lock().await.is_group_done(&label) {
                info!(group = %label, "group already finished, skipping");
                report.groups_skipped += 1;
                continue;
            }
            let failures_before = stats.snapshot().failures();
            let outcome = prober.probe_year(year).await?;
            report.groups += 1;
            report.probes += outcome.probes;
            let complete = outcome.complete && stats.snapshot().failures() == failures_before;
            sink.lock().await.finish_group(Some(&label), complete)?;
        }
        Ok(())
    }
}

/// Browser-backed parts of a pipeline, present only where the profile asks.
#[derive(Default)]
struct BrowserParts {
    pages: Option<Arc<dyn PageSource>>,
    acquirer: Option<Arc<dyn Acquirer>>,
}

#[cfg(feature = "browser")]
fn browser_parts(profile: &SiteProfile) -> Result<BrowserParts, PipelineError> {
    use crate::listing::{BrowserPages, HtmlRenderer};
    use crate::profile::{Acquisition, ListingFetch};
    use leggi_fetch::{BrowserRenderer, RenderOptions};

    if !profile.needs_browser() {
        return Ok(BrowserParts::default());
    }
    let renderer = Arc::new(BrowserRenderer::launch(RenderOptions {
        navigation_timeout: profile.run.navigation_timeout(),
        min_bytes: profile.run.min_render_bytes,
    })?);

    let mut parts = BrowserParts::default();
    if let SourceSpec::Listing(listing) = &profile.source
        && listing.fetch == ListingFetch::Browser
    {
        let html: Arc<dyn HtmlRenderer> = Arc::clone(&renderer) as Arc<dyn HtmlRenderer>;
        parts.pages = Some(Arc::new(BrowserPages::new(html)));
    }
    if profile.acquisition == Acquisition::Render {
        parts.acquirer = Some(Arc::new(crate::worker::RenderAcquirer::new(renderer)));
    }
    Ok(parts)
}

#[cfg(not(feature = "browser"))]
fn browser_parts(profile: &SiteProfile) -> Result<BrowserParts, PipelineError> {
    if profile.needs_browser() {
        return Err(PipelineError::BrowserUnavailable);
    }
    Ok(BrowserParts::default())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::listing::tests::{FakeRenderer, FixturePages};
    use crate::listing::{BrowserPages, HtmlRenderer};
    use crate::pdf_text::tests::tiny_pdf;
    use crate::profile::{Acquisition, ListingFetch};
    use crate::worker::tests::FakeAcquirer;
    use async_trait::async_trait;
    use leggi_core::{DownloadStatus, LawRecord};
    use leggi_fetch::{FetchError, FetchedBody};
    use leggi_store::{read_parquet, records_from_batch};
    use tempfile::TempDir;

    struct NoBodies;

    #[async_trait]
    impl BodySource for NoBodies {
        async fn fetch_body(&self, url: &str) -> Result<FetchedBody, FetchError> {
            Err(FetchError::Server {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn profile() -> SiteProfile {
        serde_json::from_value(serde_json::json!({
            "region": "Valle d'Aosta",
            "source": {
                "kind": "listing",
                "url_template": "https://x.it/leggi/{year}?p={page}",
                "link_selector": "a.legge",
                "empty_streak": 1,
                "years": { "from": 2020, "to": 2021 }
            },
            "detail": { "title_selector": "h1", "pdf_selector": "a.pdf" },
            "abrogation": [{ "kind": "indicators" }],
            "run": { "workers": 2, "flush_every": 1, "request_delay_ms": 0 }
        }))
        .unwrap()
    }

    /// Served PDFs by URL; everything else is a 404.
    #[derive(Default)]
    struct PdfBodies(HashMap<String, FetchedBody>);

    impl PdfBodies {
        fn pdf(mut self, url: &str, disposition: Option<&str>, bytes: Vec<u8>) -> Self {
            self.0.insert(
                url.to_string(),
                FetchedBody {
                    url: url.to_string(),
                    status: 200,
                    content_type: Some("application/pdf".into()),
                    content_disposition: disposition.map(String::from),
                    bytes,
                },
            );
            self
        }
    }

    #[async_trait]
    impl BodySource for PdfBodies {
        async fn fetch_body(&self, url: &str) -> Result<FetchedBody, FetchError> {
            self.0.get(url).cloned().ok_or_else(|| FetchError::Server {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn numbered_profile() -> SiteProfile {
        serde_json::from_value(serde_json::json!({
            "region": "Calabria",
            "source": {
                "kind": "probe",
                "url_template": "https://x.it/lr/{year}/{number}.pdf",
                "years": { "from": 2019, "to": 2019 },
                "max_consecutive_misses": 1
            },
            "run": { "flush_every": 1, "request_delay_ms": 0 }
        }))
        .unwrap()
    }

    fn parquet_rows(path: &Path) -> Vec<LawRecord> {
        read_parquet(path)
            .unwrap()
            .iter()
            .flat_map(|batch| records_from_batch(batch).unwrap())
            .collect()
    }

    fn listing(ids: &[u32]) -> String {
        ids.iter()
            .map(|id| format!(r#"<a class="legge" href="/legge/{id}">Legge {id}</a>"#))
            .collect()
    }

    fn detail(id: u32, date: &str, extra: &str) -> String {
        format!(
            r#"<h1>Legge regionale {date}, n. {id}{extra}</h1><a class="pdf" href="/pdf/{id}.pdf">PDF</a>"#
        )
    }

    fn pipeline(tmp: &TempDir, pages: FixturePages, acquirer: FakeAcquirer) -> Pipeline {
        Pipeline::new(
            profile(),
            OutputLayout::new(tmp.path()),
            Arc::new(pages),
            Arc::new(NoBodies),
            Arc::new(acquirer),
        )
    }

    fn site() -> (FixturePages, FakeAcquirer) {
        let pages = FixturePages::default()
            .page("https://x.it/leggi/2020?p=1", &listing(&[1, 2]))
            .page("https://x.it/leggi/2021?p=1", &listing(&[3]));
        let acquirer = FakeAcquirer::default()
            .page("https://x.it/legge/1", &detail(1, "4 febbraio 2020", ""))
            .page("https://x.it/legge/2", &detail(2, "9 marzo 2020", " (abrogata dal 1° gennaio 2021)"))
            .page("https://x.it/legge/3", &detail(3, "1° luglio 2021", ""))
            .pdf("https://x.it/pdf/1.pdf", b"%PDF uno")
            .pdf("https://x.it/pdf/3.pdf", b"%PDF tre");
        (pages, acquirer)
    }

    #[tokio::test]
    async fn listing_run_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let (pages, acquirer) = site();
        let report = pipeline(&tmp, pages, acquirer).run().await.unwrap();

        assert_eq!(report.groups, 2);
        assert_eq!(report.rows, 3);
        assert_eq!(report.stats.downloaded, 2);
        assert_eq!(report.stats.abrogated, 1);
        assert!(report.sheet_path.ends_with("ValledAosta_laws.xlsx"));
        assert!(report.sheet_path.exists());

        let pdfs = tmp.path().join("pdfs");
        assert!(pdfs.join("ValledAosta_1_2020-02-04.pdf").exists());
        assert!(pdfs.join("ValledAosta_3_2021-07-01.pdf").exists());
        assert!(!pdfs.join("ValledAosta_2_2020-03-09.pdf").exists());

        let rows = parquet_rows(&report.parquet_path);
        assert_eq!(rows.len(), 3);
        let abrogated = rows.iter().find(|r| r.number == "2").unwrap();
        assert_eq!(abrogated.status, DownloadStatus::Abrogated);
        let third = rows.iter().find(|r| r.number == "3").unwrap();
        assert_eq!(third.date, "1 luglio 2021");

        let progress = ProgressStore::open(tmp.path().join("progress.json")).unwrap();
        assert!(progress.is_group_done("2020"));
        assert!(progress.is_group_done("2021"));
    }

    #[tokio::test]
    async fn second_run_skips_finished_groups() {
        let tmp = TempDir::new().unwrap();
        let (pages, acquirer) = site();
        pipeline(&tmp, pages, acquirer).run().await.unwrap();

        let (pages, acquirer) = site();
        let report = pipeline(&tmp, pages, acquirer).run().await.unwrap();
        assert_eq!(report.groups, 0);
        assert_eq!(report.groups_skipped, 2);
        assert_eq!(report.rows, 3);
        assert_eq!(report.stats.candidates, 0);
    }

    #[tokio::test]
    async fn failed_group_is_revisited_and_completed() {
        let tmp = TempDir::new().unwrap();
        let (pages, _) = site();
        // First run: law 3's PDF is missing.
        let acquirer = FakeAcquirer::default()
            .page("https://x.it/legge/1", &detail(1, "4 febbraio 2020", ""))
            .page("https://x.it/legge/2", &detail(2, "9 marzo 2020", ""))
            .page("https://x.it/legge/3", &detail(3, "1° luglio 2021", ""))
            .pdf("https://x.it/pdf/1.pdf", b"%PDF")
            .pdf("https://x.it/pdf/2.pdf", b"%PDF");
        let report = pipeline(&tmp, pages, acquirer).run().await.unwrap();
        assert_eq!(report.stats.failed, 1);
        let progress = ProgressStore::open(tmp.path().join("progress.json")).unwrap();
        assert!(progress.is_group_done("2020"));
        assert!(!progress.is_group_done("2021"));

        let (pages, acquirer) = site();
        let report = pipeline(&tmp, pages, acquirer).run().await.unwrap();
        assert_eq!(report.groups, 1);
        assert_eq!(report.stats.downloaded, 1);
        // The failed row was replaced, not duplicated.
        assert_eq!(report.rows, 3);
        let sheet = RecordSheet::open(tmp.path().join("ValledAosta_laws.xlsx")).unwrap();
        assert!(sheet.records().iter().all(|r| !r.status.is_failure()));
    }

    #[test]
    fn output_paths() {
        let layout = OutputLayout::new("/data/out");
        assert_eq!(layout.pdf_dir(), PathBuf::from("/data/out/pdfs"));
        assert_eq!(layout.progress_path(), PathBuf::from("/data/out/progress.json"));
        assert!(layout.sheet_path("Lazio", SheetFormat::Xlsx).ends_with("Lazio_laws.xlsx"));
        assert!(layout.sheet_path("Lazio", SheetFormat::Csv).ends_with("Lazio_laws.csv"));
        assert!(layout.parquet_path("Emilia Romagna").ends_with("EmiliaRomagna_laws.parquet"));
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn render_needs_browser_feature() {
        let mut profile = profile();
        profile.acquisition = Acquisition::Render;
        assert!(matches!(
            Pipeline::connect(profile, "/tmp/out"),
            Err(PipelineError::BrowserUnavailable)
        ));
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn browser_listing_needs_browser_feature() {
        let mut profile = profile();
        if let SourceSpec::Listing(listing) = &mut profile.source {
            listing.fetch = ListingFetch::Browser;
        }
        assert!(matches!(
            Pipeline::connect(profile, "/tmp/out"),
            Err(PipelineError::BrowserUnavailable)
        ));
    }

    #[tokio::test]
    async fn csv_sheet_when_configured() {
        let tmp = TempDir::new().unwrap();
        let (pages, acquirer) = site();
        let mut profile = profile();
        profile.run.sheet_format = SheetFormat::Csv;
        let pipeline = Pipeline::new(
            profile,
            OutputLayout::new(tmp.path()),
            Arc::new(pages),
            Arc::new(NoBodies),
            Arc::new(acquirer),
        );
        let report = pipeline.run().await.unwrap();
        assert!(report.sheet_path.ends_with("ValledAosta_laws.csv"));
        assert_eq!(RecordSheet::open(&report.sheet_path).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn listing_through_a_browser_session() {
        let tmp = TempDir::new().unwrap();
        let (_, acquirer) = site();
        let renderer = Arc::new(
            FakeRenderer::default()
                .page("https://x.it/leggi/2020?p=1", &listing(&[1, 2]))
                .page("https://x.it/leggi/2021?p=1", &listing(&[3])),
        );
        let mut profile = profile();
        if let SourceSpec::Listing(listing) = &mut profile.source {
            listing.fetch = ListingFetch::Browser;
        }
        let pipeline = Pipeline::new(
            profile,
            OutputLayout::new(tmp.path()),
            Arc::new(BrowserPages::new(Arc::clone(&renderer) as Arc<dyn HtmlRenderer>)),
            Arc::new(NoBodies),
            Arc::new(acquirer),
        );
        let report = pipeline.run().await.unwrap();

        assert_eq!(report.groups, 2);
        assert_eq!(report.stats.downloaded, 2);
        let rendered = renderer.rendered.lock().unwrap();
        assert!(rendered.contains(&"https://x.it/leggi/2020?p=1".to_string()));
        assert!(rendered.contains(&"https://x.it/leggi/2021?p=1".to_string()));
    }

    #[tokio::test]
    async fn rendered_detail_pages_in_a_full_run() {
        let tmp = TempDir::new().unwrap();
        let (pages, _) = site();
        let acquirer = FakeAcquirer::default()
            .page("https://x.it/legge/1", &detail(1, "4 febbraio 2020", ""))
            .page("https://x.it/legge/2", &detail(2, "9 marzo 2020", ""))
            .page("https://x.it/legge/3", &detail(3, "1° luglio 2021", ""))
            .pdf("https://x.it/legge/1", b"%PDF stampa uno")
            .pdf("https://x.it/legge/2", b"%PDF stampa due")
            .pdf("https://x.it/legge/3", b"%PDF stampa tre");
        let mut profile = profile();
        profile.acquisition = Acquisition::Render;
        let pipeline = Pipeline::new(
            profile,
            OutputLayout::new(tmp.path()),
            Arc::new(pages),
            Arc::new(NoBodies),
            Arc::new(acquirer),
        );
        let report = pipeline.run().await.unwrap();

        assert_eq!(report.stats.downloaded, 3);
        assert_eq!(
            std::fs::read(tmp.path().join("pdfs/ValledAosta_3_2021-07-01.pdf")).unwrap(),
            b"%PDF stampa tre"
        );
    }

    #[tokio::test]
    async fn numbered_urls_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let bodies = PdfBodies::default()
            .pdf(
                "https://x.it/lr/2019/1.pdf",
                Some(r#"attachment; filename="LR_1_del_5_marzo_2019.pdf""#),
                tiny_pdf(&["Norme sulla tutela delle acque interne"]),
            )
            .pdf(
                "https://x.it/lr/2019/2.pdf",
                None,
                tiny_pdf(&[
                    "Legge regionale 12 aprile 2019, n. 2",
                    "Disposizioni per la valorizzazione dei borghi",
                ]),
            );
        let run = |bodies| {
            Pipeline::new(
                numbered_profile(),
                OutputLayout::new(tmp.path()),
                Arc::new(FixturePages::default()),
                Arc::new(bodies),
                Arc::new(FakeAcquirer::default()),
            )
        };
        let report = run(bodies).run().await.unwrap();

        assert_eq!(report.groups, 1);
        assert_eq!(report.probes, 3);
        assert_eq!(report.stats.downloaded, 2);
        assert!(report.sheet_path.ends_with("Calabria_laws.xlsx"));

        let pdfs = tmp.path().join("pdfs");
        assert!(pdfs.join("Calabria_1_2019-03-05.pdf").exists());
        assert!(pdfs.join("Calabria_2_2019-04-12.pdf").exists());

        let rows = parquet_rows(&report.parquet_path);
        assert_eq!(rows.len(), 2);
        let second = rows.iter().find(|r| r.number == "2").unwrap();
        assert_eq!(second.title, "Disposizioni per la valorizzazione dei borghi");

        let progress = ProgressStore::open(tmp.path().join("progress.json")).unwrap();
        assert!(progress.is_group_done("2019"));

        let report = run(PdfBodies::default()).run().await.unwrap();
        assert_eq!(report.groups, 0);
        assert_eq!(report.groups_skipped, 1);
        assert_eq!(report.rows, 2);
    }
}
