//! Count downloaded PDFs by the year encoded in their filenames.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use leggi_core::date_from_filename;

use crate::StoreError;

/// PDFs found in a download directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfCensus {
    pub by_year: BTreeMap<i32, usize>,
    /// PDFs whose filename carries `0000-00-00` or no date at all.
    pub undated: usize,
}

impl PdfCensus {
    pub fn total(&self) -> usize {
        self.by_year.values().sum::<usize>() + self.undated
    }
}

pub fn count_pdfs(dir: &Path) -> Result<PdfCensus, StoreError> {
    let mut census = PdfCensus::default();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.to_ascii_lowercase().ends_with(".pdf") {
            continue;
        }
        match date_from_filename(name) {
            Some(date) => *census.by_year.entry(date.year()).or_default() += 1,
            None => census.undated += 1,
        }
    }
    Ok(census)
}
