//! Paged listing traversal.
//!
//! Pages are requested one after another from a URL template until one of
//! the stop rules fires. Candidate links are resolved against the page URL
//! and deduplicated in first-seen order.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leggi_fetch::{FetchError, HttpClient};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::PipelineError;
use crate::html::element_text;
use crate::profile::{ListingSpec, OnError, parse_selector};

/// Anything that can hand back the HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}

/// Loads a page in a browser and hands back the DOM after scripts ran.
#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn rendered_html(&self, url: &str) -> Result<String, FetchError>;
}

#[cfg(feature = "browser")]
#[async_trait]
impl HtmlRenderer for leggi_fetch::BrowserRenderer {
    async fn rendered_html(&self, url: &str) -> Result<String, FetchError> {
        self.page_html(url).await
    }
}

/// Listing pages read through a browser session instead of plain GETs.
pub struct BrowserPages {
    renderer: Arc<dyn HtmlRenderer>,
}

impl BrowserPages {
    pub fn new(renderer: Arc<dyn HtmlRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl PageSource for BrowserPages {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let html = self.renderer.rendered_html(url).await?;
        debug!(url, bytes = html.len(), "listing page rendered");
        Ok(html)
    }
}

/// A link to one law found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute URL of the detail page (or PDF).
    pub url: String,
    pub link_text: String,
    /// Text of the enclosing block; equals `link_text` without a block selector.
    pub block_text: String,
}

impl Candidate {
    pub fn new(url: impl Into<String>, link_text: impl Into<String>) -> Self {
        let link_text = link_text.into();
        Self {
            url: url.into(),
            block_text: link_text.clone(),
            link_text,
        }
    }
}

/// Compiled selectors for one listing.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    link: Selector,
    block: Option<Selector>,
    next: Option<Selector>,
    link_contains: Option<String>,
}

impl ListingSelectors {
    pub fn from_spec(spec: &ListingSpec) -> Result<Self, PipelineError> {
        Ok(Self {
            link: parse_selector(&spec.link_selector)?,
            block: spec.block_selector.as_deref().map(parse_selector).transpose()?,
            next: spec.next_selector.as_deref().map(parse_selector).transpose()?,
            link_contains: spec.link_contains.clone(),
        })
    }

    fn accepts(&self, href: &str) -> bool {
        self.link_contains
            .as_deref()
            .is_none_or(|needle| href.contains(needle))
    }
}

/// What one listing page yielded.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub candidates: Vec<Candidate>,
    /// Whether the next-page element was present (always true without a `next_selector`).
    pub has_next: bool,
}

/// Extract candidates from a listing page.
pub fn parse_listing_page(html: &str, page_url: &Url, selectors: &ListingSelectors) -> ListingPage {
    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    let mut push = |link: ElementRef<'_>, block_text: Option<String>| {
        let Some(href) = link.value().attr("href") else {
            return;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return;
        }
        if !selectors.accepts(href) {
            return;
        }
        let Ok(url) = page_url.join(href) else {
            debug!(href, "unresolvable link");
            return;
        };
        let link_text = element_text(link);
        candidates.push(Candidate {
            url: url.to_string(),
            block_text: block_text.unwrap_or_else(|| link_text.clone()),
            link_text,
        });
    };

    match &selectors.block {
        Some(block_sel) => {
            for block in document.select(block_sel) {
                if let Some(link) = block.select(&selectors.link).next() {
                    push(link, Some(element_text(block)));
                }
            }
        }
        None => {
            for link in document.select(&selectors.link) {
                push(link, None);
            }
        }
    }

    let has_next = selectors
        .next
        .as_ref()
        .is_none_or(|next| document.select(next).next().is_some());
    ListingPage {
        candidates,
        has_next,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Too many consecutive pages without links, or an empty first page.
    EmptyStreak,
    /// A page repeated links already seen.
    NoNewLinks,
    /// The next-page element disappeared.
    NoNextPage,
    MaxPages,
    /// A page could not be fetched and the profile says to stop.
    FetchFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmptyStreak => "empty pages",
            Self::NoNewLinks => "no new links",
            Self::NoNextPage => "no next page",
            Self::MaxPages => "page cap reached",
            Self::FetchFailed => "page fetch failed",
        })
    }
}

/// Result of walking one listing group.
#[derive(Debug, Clone)]
pub struct Traversal {
    pub candidates: Vec<Candidate>,
    pub pages: u32,
    pub stop: StopReason,
}

/// Walks one listing, page by page.
pub struct ListingWalker<'a> {
    source: &'a dyn PageSource,
    spec: &'a ListingSpec,
    selectors: &'a ListingSelectors,
    delay: Duration,
}

impl<'a> ListingWalker<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        spec: &'a ListingSpec,
        selectors: &'a ListingSelectors,
        delay: Duration,
    ) -> Self {
        Self {
            source,
            spec,
            selectors,
            delay,
        }
    }

    /// Traverse the listing for `year` (or the ungrouped listing).
    pub async fn traverse(&self, year: Option<i32>) -> Traversal {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut pages = 0u32;
        let mut index = 0u32;
        let mut empty_run = 0u32;
        let mut restarted = false;

        let stop = loop {
            if index >= self.spec.max_pages {
                break StopReason::MaxPages;
            }
            if pages > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let Some(url) = self.spec.page_url_at(index, year) else {
                break StopReason::MaxPages;
            };
            let fetched = self.source.fetch_page(&url).await;
            pages += 1;

            let page = match fetched {
                Ok(html) => {
                    let page_url = match Url::parse(&url) {
                        Ok(u) => u,
                        Err(e) => {
                            warn!(url, error = %e, "listing URL does not parse");
                            break StopReason::FetchFailed;
                        }
                    };
                    Some(parse_listing_page(&html, &page_url, self.selectors))
                }
                Err(e) => {
                    warn!(url, error = %e, "listing page failed");
                    match self.spec.on_error {
                        OnError::Skip => None,
                        OnError::Stop => break StopReason::FetchFailed,
                        OnError::Restart if !restarted => {
                            info!(url, "restarting listing from the first page");
                            restarted = true;
                            seen.clear();
                            candidates.clear();
                            index = 0;
                            empty_run = 0;
                            continue;
                        }
                        OnError::Restart => break StopReason::FetchFailed,
                    }
                }
            };

            let found = page.as_ref().map_or(0, |p| p.candidates.len());
            if found == 0 {
                if index == 0 && page.is_some() {
                    debug!(url, "first page empty");
                    break StopReason::EmptyStreak;
                }
                empty_run += 1;
                debug!(url, empty_run, "empty listing page");
                if empty_run >= self.spec.empty_streak {
                    break StopReason::EmptyStreak;
                }
            } else if let Some(page) = &page {
                empty_run = 0;
                let before = candidates.len();
                for c in &page.candidates {
                    if seen.insert(c.url.clone()) {
                        candidates.push(c.clone());
                    }
                }
                let new = candidates.len() - before;
                debug!(url, found, new, "listing page");
                if new == 0 && index > 0 {
                    break StopReason::NoNewLinks;
                }
            }

            if let Some(page) = &page
                && !page.has_next
            {
                break StopReason::NoNextPage;
            }
            index += 1;
        };

        info!(
            year = year.map(|y| y.to_string()).unwrap_or_default(),
            pages,
            candidates = candidates.len(),
            stop = %stop,
            "listing traversed"
        );
        Traversal {
            candidates,
            pages,
            stop,
        }
    }
}
