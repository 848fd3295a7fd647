//! Law number + date extraction over free-form heading text.

use crate::CoreError;
use crate::date::{LawDate, parse_italian_date};
use crate::number::NumberPatterns;

/// What the regex heuristics recovered from a block of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub number: Option<String>,
    pub date: Option<LawDate>,
}

impl Metadata {
    pub fn is_complete(&self) -> bool {
        self.number.is_some() && self.date.is_some()
    }

    /// Fill whichever fields are still missing from `other`.
    pub fn merge(&mut self, other: Metadata) {
        if self.number.is_none() {
            self.number = other.number;
        }
        if self.date.is_none() {
            self.date = other.date;
        }
    }
}

/// Applies number and date patterns to text blocks.
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor {
    numbers: NumberPatterns,
}

impl MetadataExtractor {
    /// Extractor with profile-specific number patterns tried first.
    pub fn with_number_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CoreError> {
        Ok(Self {
            numbers: NumberPatterns::with_extra(patterns)?,
        })
    }

    pub fn extract(&self, text: &str) -> Metadata {
        Metadata {
            number: self.numbers.find(text),
            date: parse_italian_date(text),
        }
    }

    /// Scan blocks in priority order, keeping the first hit for each field.
    pub fn extract_from_blocks<'a, I>(&self, blocks: I) -> Metadata
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut meta = Metadata::default();
        for block in blocks {
            if meta.is_complete() {
                break;
            }
            meta.merge(self.extract(block));
        }
        meta
    }
}
