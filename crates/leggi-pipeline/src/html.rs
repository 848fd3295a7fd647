//! Small helpers over `scraper` documents.

use leggi_core::clean_text;
use scraper::{ElementRef, Html, Selector};

/// Visible text of an element, text nodes joined by spaces and cleaned.
pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first element matching `selector`, if non-empty.
pub fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}
