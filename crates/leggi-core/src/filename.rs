//! Deterministic PDF filenames: `{Region}_{LawNumber}_{Date}.pdf`.

use std::sync::LazyLock;

use regex::Regex;

use crate::date::{LawDate, parse_iso};

/// Longest law-number component kept in a filename.
const MAX_COMPONENT_CHARS: usize = 50;

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{4}-\d{2}-\d{2})\.pdf$").expect("filename date pattern"));

/// Drop characters that are illegal in Windows/Unix filenames and collapse whitespace.
pub fn sanitize_component(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_COMPONENT_CHARS).collect()
}

/// Region as it appears in filenames: letters, digits and hyphens only.
///
/// `Valle d'Aosta` → `ValledAosta`, `Friuli-Venezia Giulia` → `Friuli-VeneziaGiulia`.
pub fn region_stem(region: &str) -> String {
    region
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// Build the PDF filename for a law.
pub fn law_filename(region: &str, number: &str, iso_date: &str) -> String {
    let number = sanitize_component(number).replace(' ', "_");
    format!("{}_{}_{}.pdf", region_stem(region), number, iso_date)
}

/// The `n`-th alternative to `name` for a different law that derived the
/// same filename: `Lazio_Unknown_0000-00-00.pdf` becomes
/// `Lazio_Unknown-2_0000-00-00.pdf`. The date suffix is left in place.
pub fn filename_variant(name: &str, n: u32) -> String {
    match name.rsplit_once('_') {
        Some((head, tail)) => format!("{head}-{n}_{tail}"),
        None => format!("{n}_{name}"),
    }
}

/// The date encoded in a filename produced by [`law_filename`].
pub fn date_from_filename(name: &str) -> Option<LawDate> {
    let caps = FILENAME_DATE.captures(name)?;
    parse_iso(&caps[1])
}
