//! Metadata from the text of a downloaded PDF, for sites that serve nothing
//! but the file.

use leggi_core::{LawDate, clean_text, parse_italian_date};
use tracing::debug;

/// Lines shorter than this are headers, page numbers or stamps.
const MIN_TITLE_CHARS: usize = 20;

/// Text of the first page is all that is needed; stop reading after this.
const FIRST_PAGE_CHARS: usize = 4000;

/// What the first page of a law says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub date: Option<LawDate>,
}

/// Extract text from the first page of `bytes`. Unreadable PDFs give `None`.
pub async fn first_page_text(bytes: Vec<u8>) -> Option<String> {
    // Parsing is CPU-bound and may panic on malformed input; the blocking
    // task turns a panic into a join error.
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
    let text = match extracted {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            debug!(error = %e, "no text in PDF");
            return None;
        }
        Err(e) => {
            debug!(error = %e, "PDF text extraction aborted");
            return None;
        }
    };
    let first = text.split('\u{c}').next().unwrap_or_default();
    let first: String = first.chars().take(FIRST_PAGE_CHARS).collect();
    (!first.trim().is_empty()).then_some(first)
}

/// Title and date from first-page text.
///
/// The title is the first substantial line that is not the bare
/// "Legge regionale ..." heading; the date is the first Italian date.
pub fn pdf_metadata(text: &str) -> PdfMetadata {
    let title = text
        .lines()
        .map(clean_text)
        .find(|line| {
            line.chars().count() > MIN_TITLE_CHARS
                && !line.to_lowercase().starts_with("legge regionale")
        });
    PdfMetadata {
        title,
        date: parse_italian_date(text),
    }
}
