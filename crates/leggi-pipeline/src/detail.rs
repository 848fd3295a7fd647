//! Metadata from detail pages and listing entries.

use leggi_core::{AbrogationRule, Metadata, MetadataExtractor, is_abrogated};
use scraper::{Html, Selector};
use url::Url;

use crate::PipelineError;
use crate::html::{element_text, first_text};
use crate::listing::Candidate;
use crate::profile::{SiteProfile, UrlRewrite, parse_selector};

/// Shortest text block considered as a fallback title.
const MIN_TITLE_CHARS: usize = 40;

/// Elements scanned for the longest-text title fallback.
const TITLE_BLOCKS: &str = "td, th, p, h1, h2, h3, h4";

/// What was recovered for one law.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawDetail {
    pub title: String,
    pub metadata: Metadata,
    /// Where to download the PDF from, if it could be determined.
    pub pdf_url: Option<String>,
    pub abrogated: bool,
}

/// Per-profile extraction settings, compiled once per run.
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    title: Option<Selector>,
    text: Option<Selector>,
    pdf: Option<Selector>,
    blocks: Selector,
    page_title: Selector,
    rewrite: Option<UrlRewrite>,
    rules: Vec<AbrogationRule>,
    metadata: MetadataExtractor,
}

impl DetailExtractor {
    pub fn from_profile(profile: &SiteProfile) -> Result<Self, PipelineError> {
        let detail = &profile.detail;
        Ok(Self {
            title: detail.title_selector.as_deref().map(parse_selector).transpose()?,
            text: detail.text_selector.as_deref().map(parse_selector).transpose()?,
            pdf: detail.pdf_selector.as_deref().map(parse_selector).transpose()?,
            blocks: parse_selector(TITLE_BLOCKS)?,
            page_title: parse_selector("title")?,
            rewrite: detail.pdf_url_rewrite.clone(),
            rules: profile.abrogation.clone(),
            metadata: MetadataExtractor::with_number_patterns(&profile.number_patterns)?,
        })
    }

    pub fn metadata(&self) -> &MetadataExtractor {
        &self.metadata
    }

    /// Extract a law from its detail page.
    pub fn from_detail_page(&self, html: &str, candidate: &Candidate) -> LawDetail {
        let document = Html::parse_document(html);
        let page_url = Url::parse(&candidate.url).ok();

        let title = self.title(&document, candidate);
        let body = match &self.text {
            Some(sel) => document
                .select(sel)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" "),
            None => element_text(document.root_element()),
        };

        let metadata = self.metadata.extract_from_blocks([
            title.as_str(),
            candidate.link_text.as_str(),
            candidate.block_text.as_str(),
            body.as_str(),
        ]);

        let abrogated = is_abrogated(&title, &self.rules) || is_abrogated(&body, &self.rules);

        let linked_pdf = self.pdf.as_ref().and_then(|sel| {
            document.select(sel).find_map(|el| {
                let href = el.value().attr("href").or_else(|| el.value().attr("src"))?;
                match &page_url {
                    Some(base) => base.join(href.trim()).ok().map(String::from),
                    None => Some(href.trim().to_string()),
                }
            })
        });

        LawDetail {
            title,
            metadata,
            pdf_url: resolve_pdf_url(linked_pdf, &candidate.url, self.rewrite.as_ref()),
            abrogated,
        }
    }

    /// Build a law from listing text alone.
    pub fn from_listing(&self, candidate: &Candidate) -> LawDetail {
        let title = if candidate.block_text.chars().count() > candidate.link_text.chars().count() {
            candidate.block_text.clone()
        } else {
            candidate.link_text.clone()
        };
        let metadata = self
            .metadata
            .extract_from_blocks([candidate.link_text.as_str(), candidate.block_text.as_str()]);
        let abrogated = is_abrogated(&candidate.block_text, &self.rules);
        let pdf_url = resolve_pdf_url(None, &candidate.url, self.rewrite.as_ref())
            .or_else(|| Some(candidate.url.clone()));
        LawDetail {
            title,
            metadata,
            pdf_url,
            abrogated,
        }
    }

    fn title(&self, document: &Html, candidate: &Candidate) -> String {
        if let Some(title) = self.title.as_ref().and_then(|sel| first_text(document, sel)) {
            return title;
        }
        let longest = document
            .select(&self.blocks)
            .map(element_text)
            .filter(|t| t.chars().count() > MIN_TITLE_CHARS)
            .max_by_key(|t| t.chars().count());
        if let Some(title) = longest {
            return title;
        }
        if !candidate.link_text.is_empty() {
            return candidate.link_text.clone();
        }
        first_text(document, &self.page_title).unwrap_or_default()
    }
}

/// PDF location, in order of preference: a link found on the detail page,
/// the candidate URL rewritten, the candidate URL itself when it is a PDF.
pub fn resolve_pdf_url(
    linked: Option<String>,
    candidate_url: &str,
    rewrite: Option<&UrlRewrite>,
) -> Option<String> {
    linked
        .or_else(|| rewrite.and_then(|rw| rw.apply(candidate_url)))
        .or_else(|| looks_like_pdf(candidate_url).then(|| candidate_url.to_string()))
}

fn looks_like_pdf(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".pdf")
}
