//! The law index row shared by every stage of the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::{LawDate, UNKNOWN_DATE};
use crate::filename::{filename_variant, law_filename};

/// Law number recorded when no pattern matched.
pub const UNKNOWN_NUMBER: &str = "Unknown";

/// Spreadsheet column headers, in output order.
pub const COLUMNS: [&str; 7] = [
    "Region",
    "Law Title",
    "Law Number",
    "Date",
    "Filename",
    "Source URL",
    "Status",
];

/// Outcome of acquiring one law's PDF.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloaded,
    /// Target file was already on disk.
    Skipped,
    /// Repeal marker found on the detail page; nothing downloaded.
    Abrogated,
    /// The server answered but the result was unusable (not a PDF, empty render, HTTP status).
    Failed(String),
    /// Transport or I/O failure.
    Error(String),
}

impl DownloadStatus {
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed(detail.into())
    }

    pub fn error(msg: impl fmt::Display) -> Self {
        Self::Error(msg.to_string())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Error(_))
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Downloaded => f.write_str("Downloaded"),
            Self::Skipped => f.write_str("Skipped"),
            Self::Abrogated => f.write_str("Skipped (Abrogated)"),
            Self::Failed(detail) if detail.is_empty() => f.write_str("Failed"),
            Self::Failed(detail) => write!(f, "Failed ({detail})"),
            Self::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl FromStr for DownloadStatus {
    type Err = std::convert::Infallible;

    /// Parse a spreadsheet label back into a status. Unrecognised labels
    /// become `Error` carrying the original text so nothing is lost on resume.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let status = match s {
            "" | "Pending" => Self::Pending,
            "Downloaded" => Self::Downloaded,
            "Skipped" | "Skipped (Exists)" => Self::Skipped,
            "Skipped (Abrogated)" => Self::Abrogated,
            "Failed" => Self::Failed(String::new()),
            _ => {
                if let Some(msg) = s.strip_prefix("Error:") {
                    Self::Error(msg.trim().to_string())
                } else if let Some(detail) = s
                    .strip_prefix("Failed (")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    Self::Failed(detail.to_string())
                } else {
                    Self::Error(s.to_string())
                }
            }
        };
        Ok(status)
    }
}

impl Serialize for DownloadStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DownloadStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(label.parse().unwrap_or_default())
    }
}

/// One row of the law index.
///
/// Serialised with the spreadsheet's column names so the same struct reads
/// and writes the CSV sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawRecord {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Law Title")]
    pub title: String,
    #[serde(rename = "Law Number")]
    pub number: String,
    /// Display date: Italian text when parsed, `0000-00-00` otherwise.
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Source URL", default)]
    pub source_url: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: DownloadStatus,
}

impl LawRecord {
    /// Build a pending record, deriving the filename from region, number and date.
    pub fn new(
        region: &str,
        title: impl Into<String>,
        number: Option<&str>,
        date: Option<LawDate>,
    ) -> Self {
        let number = number
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_NUMBER)
            .to_string();
        let iso = date.map(|d| d.iso()).unwrap_or_else(|| UNKNOWN_DATE.to_string());
        let display = date
            .map(|d| d.italian())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());
        Self {
            region: region.to_string(),
            title: title.into(),
            filename: law_filename(region, &number, &iso),
            number,
            date: display,
            source_url: None,
            status: DownloadStatus::Pending,
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Override the display date while keeping the derived filename.
    pub fn with_display_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Rename to the `n`-th filename variant (see [`filename_variant`]).
    pub fn with_filename_variant(mut self, n: u32) -> Self {
        self.filename = filename_variant(&self.filename, n);
        self
    }

    pub fn with_status(mut self, status: DownloadStatus) -> Self {
        self.status = status;
        self
    }

    pub fn has_number(&self) -> bool {
        self.number != UNKNOWN_NUMBER
    }

    pub fn has_date(&self) -> bool {
        !self.filename.ends_with(&format!("_{UNKNOWN_DATE}.pdf"))
    }

    /// Cells in [`COLUMNS`] order.
    pub fn cells(&self) -> [String; 7] {
        [
            self.region.clone(),
            self.title.clone(),
            self.number.clone(),
            self.date.clone(),
            self.filename.clone(),
            self.source_url.clone().unwrap_or_default(),
            self.status.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(DownloadStatus::Pending.to_string(), "Pending");
        assert_eq!(DownloadStatus::Abrogated.to_string(), "Skipped (Abrogated)");
        assert_eq!(DownloadStatus::failed("").to_string(), "Failed");
        assert_eq!(DownloadStatus::failed("Empty").to_string(), "Failed (Empty)");
        assert_eq!(
            DownloadStatus::error("connection reset").to_string(),
            "Error: connection reset"
        );
    }

    #[test]
    fn status_labels_parse_back() {
        for status in [
            DownloadStatus::Pending,
            DownloadStatus::Downloaded,
            DownloadStatus::Skipped,
            DownloadStatus::Abrogated,
            DownloadStatus::failed(""),
            DownloadStatus::failed("not a PDF"),
            DownloadStatus::error("timed out"),
        ] {
            let parsed: DownloadStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn legacy_skip_label() {
        let parsed: DownloadStatus = "Skipped (Exists)".parse().unwrap();
        assert_eq!(parsed, DownloadStatus::Skipped);
    }

    #[test]
    fn unknown_label_is_kept_as_error() {
        let parsed: DownloadStatus = "Something odd".parse().unwrap();
        assert_eq!(parsed, DownloadStatus::Error("Something odd".into()));
    }

    #[test]
    fn new_record_derives_filename() {
        let date = LawDate::new(2023, 1, 15).unwrap();
        let rec = LawRecord::new("Lazio", "Disposizioni varie", Some("12"), Some(date));
        assert_eq!(rec.filename, "Lazio_12_2023-01-15.pdf");
        assert_eq!(rec.date, "15 gennaio 2023");
        assert_eq!(rec.status, DownloadStatus::Pending);
        assert!(rec.has_number());
        assert!(rec.has_date());
    }

    #[test]
    fn new_record_falls_back_to_unknowns() {
        let rec = LawRecord::new("Molise", "Legge", None, None);
        assert_eq!(rec.number, UNKNOWN_NUMBER);
        assert_eq!(rec.date, UNKNOWN_DATE);
        assert_eq!(rec.filename, "Molise_Unknown_0000-00-00.pdf");
        assert!(!rec.has_number());
        assert!(!rec.has_date());
    }

    #[test]
    fn filename_variant_keeps_metadata() {
        let rec = LawRecord::new("Molise", "Legge", None, None).with_filename_variant(2);
        assert_eq!(rec.filename, "Molise_Unknown-2_0000-00-00.pdf");
        assert_eq!(rec.number, UNKNOWN_NUMBER);
        assert!(!rec.has_date());
    }

    #[test]
    fn blank_number_is_unknown() {
        let rec = LawRecord::new("Umbria", "x", Some("  "), None);
        assert_eq!(rec.number, UNKNOWN_NUMBER);
    }

    #[test]
    fn record_json_roundtrip_uses_column_names() {
        let rec = LawRecord::new("Marche", "Titolo", Some("3"), None)
            .with_source("https://example.org/lr/3")
            .with_status(DownloadStatus::Downloaded);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"Law Number\":\"3\""));
        assert!(json.contains("\"Status\":\"Downloaded\""));
        let parsed: LawRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn cells_follow_column_order() {
        let rec = LawRecord::new("Veneto", "T", Some("1"), None);
        let cells = rec.cells();
        assert_eq!(cells.len(), COLUMNS.len());
        assert_eq!(cells[0], "Veneto");
        assert_eq!(cells[4], "Veneto_1_0000-00-00.pdf");
        assert_eq!(cells[5], "");
        assert_eq!(cells[6], "Pending");
    }
}
