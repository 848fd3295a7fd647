//! Site profiles: everything that differs between regional council websites,
//! expressed as data.
//!
//! A profile is a JSON document:
//!
//! ```json
//! {
//!   "region": "Lazio",
//!   "source": {
//!     "kind": "listing",
//!     "url_template": "https://www.consiglio.regione.lazio.it/?vw=leggiregionali&pg={page}",
//!     "link_selector": "a[href*='leggiregionalidettaglio']"
//!   },
//!   "detail": {
//!     "title_selector": "h1",
//!     "pdf_url_rewrite": { "from": "vw=leggiregionalidettaglio", "to": "vw=pdf" }
//!   }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use leggi_core::{AbrogationRule, MetadataExtractor};
use leggi_fetch::RetryPolicy;
use leggi_store::SheetFormat;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

pub const PAGE_PLACEHOLDER: &str = "{page}";
pub const YEAR_PLACEHOLDER: &str = "{year}";
pub const NUMBER_PLACEHOLDER: &str = "{number}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Region name as written in the sheet and (sanitised) in filenames.
    pub region: String,
    pub source: SourceSpec,
    #[serde(default)]
    pub detail: DetailSpec,
    #[serde(default)]
    pub metadata_from: MetadataSource,
    #[serde(default)]
    pub acquisition: Acquisition,
    #[serde(default)]
    pub abrogation: Vec<AbrogationRule>,
    /// Extra law-number regexes (first capture group), tried before the built-ins.
    #[serde(default)]
    pub number_patterns: Vec<String>,
    #[serde(default)]
    pub run: RunSettings,
}

/// Where candidate laws come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Listing(ListingSpec),
    Probe(ProbeSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSpec {
    /// Listing URL with `{page}` and, for year-grouped sites, `{year}`.
    pub url_template: String,
    /// How listing pages are loaded.
    #[serde(default)]
    pub fetch: ListingFetch,
    #[serde(default = "default_first_page")]
    pub first_page: u32,
    /// Increment between consecutive `{page}` values (offset-paged sites use e.g. 20).
    #[serde(default = "default_page_step")]
    pub page_step: u32,
    /// Selects the anchors that lead to a law.
    pub link_selector: String,
    /// Keep only links whose `href` contains this substring.
    #[serde(default)]
    pub link_contains: Option<String>,
    /// Element enclosing each link whose text carries listing metadata
    /// (a table row, a list item). Links are searched inside it.
    #[serde(default)]
    pub block_selector: Option<String>,
    /// When set, traversal stops on the first page lacking this element.
    #[serde(default)]
    pub next_selector: Option<String>,
    #[serde(default = "default_empty_streak")]
    pub empty_streak: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default)]
    pub years: Option<YearRange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingFetch {
    /// Plain HTTP GET.
    #[default]
    Http,
    /// Load each page in a headless browser tab and read the DOM after
    /// scripts ran, for indexes built client-side.
    Browser,
}

/// What a listing traversal does once a page fetch has exhausted its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Count the page as empty and move on.
    #[default]
    Skip,
    /// Stop, keeping the links collected so far.
    Stop,
    /// Start over from the first page, once.
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
    #[serde(default)]
    pub descending: bool,
}

impl YearRange {
    pub fn years(&self) -> Vec<i32> {
        let (lo, hi) = if self.from <= self.to {
            (self.from, self.to)
        } else {
            (self.to, self.from)
        };
        let mut years: Vec<i32> = (lo..=hi).collect();
        if self.descending {
            years.reverse();
        }
        years
    }
}

/// Enumerate laws by guessing `(year, number)` URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSpec {
    /// URL with `{year}` and `{number}`.
    pub url_template: String,
    pub years: YearRange,
    #[serde(default = "default_max_misses")]
    pub max_consecutive_misses: u32,
    /// Title recorded for each hit; `{number}` and `{year}` are substituted.
    #[serde(default = "default_probe_title")]
    pub title_template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailSpec {
    #[serde(default)]
    pub title_selector: Option<String>,
    /// Region of the page scanned for metadata and repeal markers.
    #[serde(default)]
    pub text_selector: Option<String>,
    /// Element whose `href` (or `src`) is the PDF.
    #[serde(default)]
    pub pdf_selector: Option<String>,
    #[serde(default)]
    pub pdf_url_rewrite: Option<UrlRewrite>,
}

/// Derive the PDF URL from the candidate URL by substring replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRewrite {
    pub from: String,
    pub to: String,
}

impl UrlRewrite {
    pub fn apply(&self, url: &str) -> Option<String> {
        url.contains(&self.from)
            .then(|| url.replacen(&self.from, &self.to, 1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    /// Fetch each detail page and extract from it.
    #[default]
    Detail,
    /// Take everything from the listing link and its block; no detail fetch.
    Listing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    /// Download the PDF over HTTP.
    #[default]
    Direct,
    /// Print the detail page to PDF in a headless browser.
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub workers: usize,
    pub flush_every: usize,
    pub request_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub min_render_bytes: usize,
    pub retry: RetryPolicy,
    pub sheet_format: SheetFormat,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            flush_every: 10,
            request_delay_ms: 300,
            http_timeout_secs: 30,
            navigation_timeout_secs: 60,
            min_render_bytes: 2000,
            retry: RetryPolicy::default(),
            sheet_format: SheetFormat::Xlsx,
        }
    }
}

impl RunSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Command-line adjustments layered over a loaded profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileOverrides {
    pub workers: Option<usize>,
    pub flush_every: Option<usize>,
    pub max_pages: Option<u32>,
    pub years: Option<(i32, i32)>,
    pub sheet_format: Option<SheetFormat>,
}

fn default_first_page() -> u32 {
    1
}
fn default_page_step() -> u32 {
    1
}
fn default_empty_streak() -> u32 {
    3
}
fn default_max_pages() -> u32 {
    150
}
fn default_max_misses() -> u32 {
    10
}
fn default_probe_title() -> String {
    "Legge Regionale n. {number}".to_string()
}

impl SiteProfile {
    /// Read, parse and validate a profile file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ProfileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: Self =
            serde_json::from_str(&text).map_err(|source| PipelineError::ProfileParse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn apply(&mut self, overrides: &ProfileOverrides) {
        if let Some(workers) = overrides.workers {
            self.run.workers = workers;
        }
        if let Some(every) = overrides.flush_every {
            self.run.flush_every = every;
        }
        if let Some(format) = overrides.sheet_format {
            self.run.sheet_format = format;
        }
        match &mut self.source {
            SourceSpec::Listing(listing) => {
                if let Some(max) = overrides.max_pages {
                    listing.max_pages = max;
                }
                if let (Some((from, to)), Some(years)) = (overrides.years, listing.years.as_mut()) {
                    years.from = from;
                    years.to = to;
                }
            }
            SourceSpec::Probe(probe) => {
                if let Some((from, to)) = overrides.years {
                    probe.years.from = from;
                    probe.years.to = to;
                }
            }
        }
    }

    /// Check everything that would otherwise fail halfway through a crawl:
    /// selectors, regexes, URL templates, and numeric settings.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.region.trim().is_empty() {
            return invalid("region must not be empty");
        }
        if self.run.workers == 0 {
            return invalid("run.workers must be at least 1");
        }
        if self.run.flush_every == 0 {
            return invalid("run.flush_every must be at least 1");
        }

        match &self.source {
            SourceSpec::Listing(listing) => listing.validate()?,
            SourceSpec::Probe(probe) => probe.validate()?,
        }

        for sel in [
            &self.detail.title_selector,
            &self.detail.text_selector,
            &self.detail.pdf_selector,
        ]
        .into_iter()
        .flatten()
        {
            parse_selector(sel)?;
        }
        if let Some(rewrite) = &self.detail.pdf_url_rewrite
            && rewrite.from.is_empty()
        {
            return invalid("detail.pdf_url_rewrite.from must not be empty");
        }
        MetadataExtractor::with_number_patterns(&self.number_patterns)?;
        Ok(())
    }

    /// Whether running this profile needs a headless browser.
    pub fn needs_browser(&self) -> bool {
        self.acquisition == Acquisition::Render
            || matches!(&self.source, SourceSpec::Listing(l) if l.fetch == ListingFetch::Browser)
    }

    /// Year groups to traverse, or `None` for a single ungrouped pass.
    pub fn years(&self) -> Option<Vec<i32>> {
        match &self.source {
            SourceSpec::Listing(listing) => listing.years.map(|y| y.years()),
            SourceSpec::Probe(probe) => Some(probe.years.years()),
        }
    }
}

impl ListingSpec {
    fn validate(&self) -> Result<(), PipelineError> {
        parse_selector(&self.link_selector)?;
        for sel in [&self.next_selector, &self.block_selector].into_iter().flatten() {
            parse_selector(sel)?;
        }
        if !self.url_template.contains(PAGE_PLACEHOLDER) && self.max_pages != 1 {
            return invalid("source.url_template needs {page} unless max_pages is 1");
        }
        match (self.years.is_some(), self.url_template.contains(YEAR_PLACEHOLDER)) {
            (true, false) => return invalid("source.years is set but url_template has no {year}"),
            (false, true) => return invalid("url_template has {year} but source.years is not set"),
            _ => {}
        }
        if self.max_pages == 0 || self.empty_streak == 0 || self.page_step == 0 {
            return invalid("max_pages, empty_streak and page_step must be at least 1");
        }
        url::Url::parse(&self.page_url(self.first_page, self.years.map(|y| y.from)))
            .map_err(|e| PipelineError::InvalidProfile(format!("source.url_template: {e}")))?;
        Ok(())
    }

    /// Concrete URL of the page at `index` (0-based) of a group, or `None`
    /// once the page number no longer fits in a `u32`.
    pub fn page_url_at(&self, index: u32, year: Option<i32>) -> Option<String> {
        let page = index
            .checked_mul(self.page_step)
            .and_then(|offset| self.first_page.checked_add(offset))?;
        Some(self.page_url(page, year))
    }

    fn page_url(&self, page: u32, year: Option<i32>) -> String {
        let url = self.url_template.replace(PAGE_PLACEHOLDER, &page.to_string());
        match year {
            Some(y) => url.replace(YEAR_PLACEHOLDER, &y.to_string()),
            None => url,
        }
    }
}

impl ProbeSpec {
    fn validate(&self) -> Result<(), PipelineError> {
        if !self.url_template.contains(YEAR_PLACEHOLDER)
            || !self.url_template.contains(NUMBER_PLACEHOLDER)
        {
            return invalid("probe url_template needs both {year} and {number}");
        }
        if self.max_consecutive_misses == 0 {
            return invalid("max_consecutive_misses must be at least 1");
        }
        url::Url::parse(&self.probe_url(self.years.from, 1))
            .map_err(|e| PipelineError::InvalidProfile(format!("source.url_template: {e}")))?;
        Ok(())
    }

    pub fn probe_url(&self, year: i32, number: u32) -> String {
        fill_year_number(&self.url_template, year, number)
    }

    pub fn title(&self, year: i32, number: u32) -> String {
        fill_year_number(&self.title_template, year, number)
    }
}

fn fill_year_number(template: &str, year: i32, number: u32) -> String {
    template
        .replace(YEAR_PLACEHOLDER, &year.to_string())
        .replace(NUMBER_PLACEHOLDER, &number.to_string())
}

/// Compile a CSS selector, reporting which one failed.
pub fn parse_selector(selector: &str) -> Result<Selector, PipelineError> {
    Selector::parse(selector).map_err(|e| PipelineError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn invalid<T>(msg: &str) -> Result<T, PipelineError> {
    Err(PipelineError::InvalidProfile(msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAZIO: &str = r#"{
        "region": "Lazio",
        "source": {
            "kind": "listing",
            "url_template": "https://www.consiglio.regione.lazio.it/?vw=leggiregionali&pg={page}",
            "link_selector": "a[href*='leggiregionalidettaglio']"
        },
        "detail": {
            "title_selector": "h1",
            "pdf_url_rewrite": { "from": "vw=leggiregionalidettaglio", "to": "vw=pdf" }
        }
    }"#;

    fn listing(profile: &SiteProfile) -> &ListingSpec {
        match &profile.source {
            SourceSpec::Listing(l) => l,
            SourceSpec::Probe(_) => panic!("expected listing"),
        }
    }

    #[test]
    fn defaults_fill_in() {
        let profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        profile.validate().unwrap();
        let l = listing(&profile);
        assert_eq!(l.first_page, 1);
        assert_eq!(l.empty_streak, 3);
        assert_eq!(l.max_pages, 150);
        assert_eq!(l.on_error, OnError::Skip);
        assert_eq!(profile.run.workers, 4);
        assert_eq!(profile.run.flush_every, 10);
        assert_eq!(profile.run.request_delay(), Duration::from_millis(300));
        assert_eq!(profile.metadata_from, MetadataSource::Detail);
        assert_eq!(profile.acquisition, Acquisition::Direct);
        assert_eq!(profile.run.sheet_format, SheetFormat::Xlsx);
        assert!(profile.years().is_none());
    }

    #[test]
    fn page_urls() {
        let profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        let l = listing(&profile);
        assert!(l.page_url_at(0, None).unwrap().ends_with("pg=1"));
        assert!(l.page_url_at(4, None).unwrap().ends_with("pg=5"));
    }

    #[test]
    fn offset_paging_with_years() {
        let profile: SiteProfile = serde_json::from_str(
            r#"{
                "region": "Campania",
                "source": {
                    "kind": "listing",
                    "url_template": "https://example.it/leggi?anno={year}&start={page}",
                    "first_page": 0,
                    "page_step": 20,
                    "link_selector": "td a",
                    "years": { "from": 2020, "to": 2018, "descending": true }
                }
            }"#,
        )
        .unwrap();
        profile.validate().unwrap();
        assert_eq!(
            listing(&profile).page_url_at(2, Some(2019)).as_deref(),
            Some("https://example.it/leggi?anno=2019&start=40")
        );
        assert_eq!(profile.years().unwrap(), vec![2020, 2019, 2018]);
    }

    #[test]
    fn huge_page_step_does_not_overflow() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        if let SourceSpec::Listing(l) = &mut profile.source {
            l.page_step = u32::MAX / 2 + 1;
        }
        let l = listing(&profile);
        assert!(l.page_url_at(1, None).is_some());
        assert_eq!(l.page_url_at(2, None), None);
        assert_eq!(l.page_url_at(u32::MAX, None), None);
    }

    #[test]
    fn browser_listing_needs_a_browser() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        assert!(!profile.needs_browser());
        assert_eq!(listing(&profile).fetch, ListingFetch::Http);

        let json = LAZIO.replace(r#""kind": "listing","#, r#""kind": "listing", "fetch": "browser","#);
        let browsed: SiteProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(listing(&browsed).fetch, ListingFetch::Browser);
        assert!(browsed.needs_browser());

        profile.acquisition = Acquisition::Render;
        assert!(profile.needs_browser());
    }

    #[test]
    fn probe_profile() {
        let profile: SiteProfile = serde_json::from_str(
            r#"{
                "region": "Calabria",
                "source": {
                    "kind": "probe",
                    "url_template": "https://example.it/leggi?numero={number}&anno={year}",
                    "years": { "from": 2019, "to": 2020 }
                }
            }"#,
        )
        .unwrap();
        profile.validate().unwrap();
        let SourceSpec::Probe(probe) = &profile.source else {
            panic!("expected probe")
        };
        assert_eq!(probe.max_consecutive_misses, 10);
        assert_eq!(probe.probe_url(2019, 7), "https://example.it/leggi?numero=7&anno=2019");
        assert_eq!(probe.title(2019, 7), "Legge Regionale n. 7");
    }

    #[test]
    fn rejects_bad_selector() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        profile.detail.pdf_selector = Some("a[[".into());
        assert!(matches!(
            profile.validate(),
            Err(PipelineError::Selector { .. })
        ));
    }

    #[test]
    fn rejects_bad_pattern() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        profile.number_patterns = vec!["(unclosed".into()];
        assert!(matches!(profile.validate(), Err(PipelineError::Pattern(_))));
    }

    #[test]
    fn rejects_template_without_placeholders() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        if let SourceSpec::Listing(l) = &mut profile.source {
            l.url_template = "https://example.it/leggi".into();
        }
        assert!(matches!(
            profile.validate(),
            Err(PipelineError::InvalidProfile(_))
        ));
        if let SourceSpec::Listing(l) = &mut profile.source {
            l.max_pages = 1;
        }
        profile.validate().unwrap();
    }

    #[test]
    fn year_placeholder_must_match_years() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        if let SourceSpec::Listing(l) = &mut profile.source {
            l.years = Some(YearRange {
                from: 2000,
                to: 2001,
                descending: false,
            });
        }
        assert!(profile.validate().is_err());
    }

    #[test]
    fn overrides_apply() {
        let mut profile: SiteProfile = serde_json::from_str(LAZIO).unwrap();
        profile.apply(&ProfileOverrides {
            workers: Some(8),
            flush_every: Some(1),
            max_pages: Some(2),
            years: Some((2001, 2002)),
            sheet_format: Some(SheetFormat::Csv),
        });
        assert_eq!(profile.run.workers, 8);
        assert_eq!(profile.run.sheet_format, SheetFormat::Csv);
        assert_eq!(profile.run.flush_every, 1);
        assert_eq!(listing(&profile).max_pages, 2);
        assert!(profile.years().is_none());
    }

    #[test]
    fn rewrite() {
        let rw = UrlRewrite {
            from: "vw=leggiregionalidettaglio".into(),
            to: "vw=pdf".into(),
        };
        assert_eq!(
            rw.apply("https://x.it/?vw=leggiregionalidettaglio&id=9").as_deref(),
            Some("https://x.it/?vw=pdf&id=9")
        );
        assert_eq!(rw.apply("https://x.it/?vw=other"), None);
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lazio.json");
        std::fs::write(&path, LAZIO).unwrap();
        let profile = SiteProfile::load(&path).unwrap();
        assert_eq!(profile.region, "Lazio");

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            SiteProfile::load(&path),
            Err(PipelineError::ProfileParse { .. })
        ));
    }

    #[test]
    fn shipped_profiles_are_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../profiles");
        let mut checked = 0;
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|e| e == "json") {
                let profile = SiteProfile::load(&path).unwrap();
                profile.validate().unwrap();
                checked += 1;
            }
        }
        assert!(checked >= 5);
    }
}
