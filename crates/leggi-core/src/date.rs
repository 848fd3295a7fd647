//! Italian date recognition for law headings.
//!
//! Regional law headings carry their enactment date in one of two shapes:
//!
//! - textual: `15 gennaio 2023`, `1° dicembre 2025`, `3 MARZO 2020`
//! - numeric: `15/01/2023`, `15-1-2023`, `15.01.2023`
//!
//! Patterns are tried in that order and the first one that yields a real
//! calendar date wins.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// ISO placeholder used in filenames when no date could be recovered.
pub const UNKNOWN_DATE: &str = "0000-00-00";

/// Italian month names, January first.
pub const ITALIAN_MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

const MONTH_ALTERNATION: &str =
    "gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|agosto|settembre|ottobre|novembre|dicembre";

static TEXTUAL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s*(?:°|º)?\s+({MONTH_ALTERNATION})\s+(\d{{4}})\b"
    ))
    .expect("textual date pattern")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b").expect("numeric date pattern")
});

/// Month number (1-12) for an Italian month name, case-insensitive.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    ITALIAN_MONTHS
        .iter()
        .position(|m| *m == lower)
        .map(|i| i as u32 + 1)
}

/// A validated calendar date recovered from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LawDate(NaiveDate);

impl LawDate {
    /// Build a date, rejecting impossible combinations (31 febbraio, month 13).
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// `YYYY-MM-DD`, the form used in filenames.
    pub fn iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// `15 gennaio 2023`, the form written to the Date column.
    pub fn italian(&self) -> String {
        let month = ITALIAN_MONTHS[self.0.month0() as usize];
        format!("{} {} {}", self.0.day(), month, self.0.year())
    }
}

impl fmt::Display for LawDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso())
    }
}

/// Find the first Italian date in `text`.
pub fn parse_italian_date(text: &str) -> Option<LawDate> {
    find_textual(text).or_else(|| find_numeric(text))
}

fn find_textual(text: &str) -> Option<LawDate> {
    TEXTUAL_DATE.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        LawDate::new(year, month, day)
    })
}

fn find_numeric(text: &str) -> Option<LawDate> {
    NUMERIC_DATE.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        LawDate::new(year, month, day)
    })
}

/// Parse an ISO `YYYY-MM-DD` string, as found in filenames.
pub fn parse_iso(s: &str) -> Option<LawDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok().map(LawDate)
}
