//! The law index spreadsheet, kept in memory and rewritten whole on flush.
//!
//! The file is an Excel workbook (`.xlsx`) or a CSV file, chosen by the
//! path's extension.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use calamine::{Data, Reader, Xlsx, open_workbook};
use leggi_core::{COLUMNS, LawRecord};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::StoreError;
use crate::atomic::write_atomic;

const WORKSHEET_NAME: &str = "Laws";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    #[default]
    Xlsx,
    Csv,
}

impl SheetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    /// Format implied by a file extension; anything but `.csv` is a workbook.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Xlsx,
        }
    }
}

impl fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SheetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown sheet format {other:?} (expected xlsx or csv)")),
        }
    }
}

/// Append-only list of records backed by a spreadsheet file.
///
/// Every flush overwrites the file with the full list. Opening an existing
/// file loads its rows so a resumed run keeps what earlier runs recorded.
#[derive(Debug)]
pub struct RecordSheet {
    path: PathBuf,
    format: SheetFormat,
    records: Vec<LawRecord>,
    by_filename: HashMap<String, usize>,
    unflushed: usize,
}

impl RecordSheet {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut sheet = Self {
            format: SheetFormat::for_path(&path),
            path,
            records: Vec::new(),
            by_filename: HashMap::new(),
            unflushed: 0,
        };
        if sheet.path.exists() {
            let rows = match sheet.format {
                SheetFormat::Csv => read_csv(&sheet.path)?,
                SheetFormat::Xlsx => read_xlsx(&sheet.path)?,
            };
            for row in rows {
                sheet.insert(row);
            }
            info!(path = %sheet.path.display(), rows = sheet.records.len(), "resumed sheet");
        }
        Ok(sheet)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SheetFormat {
        self.format
    }

    /// Add a record unless its filename is already taken.
    ///
    /// A row whose earlier attempt failed is replaced in place, so a retried
    /// law does not appear twice. Returns whether the sheet changed.
    pub fn push(&mut self, record: LawRecord) -> bool {
        if let Some(&idx) = self.by_filename.get(&record.filename) {
            if !self.records[idx].status.is_failure() {
                debug!(filename = %record.filename, "filename already recorded");
                return false;
            }
            self.records[idx] = record;
        } else {
            self.insert(record);
        }
        self.unflushed += 1;
        true
    }

    fn insert(&mut self, record: LawRecord) {
        self.by_filename
            .insert(record.filename.clone(), self.records.len());
        self.records.push(record);
    }

    pub fn contains_filename(&self, filename: &str) -> bool {
        self.by_filename.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&LawRecord> {
        self.by_filename.get(filename).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[LawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records pushed since the last flush.
    pub fn unflushed(&self) -> usize {
        self.unflushed
    }

    /// Rewrite the whole file atomically.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let records = &self.records;
        match self.format {
            SheetFormat::Csv => write_atomic(&self.path, |f| {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(f);
                writer.write_record(COLUMNS)?;
                for record in records {
                    writer.write_record(record.cells())?;
                }
                writer.flush()?;
                Ok(())
            })?,
            SheetFormat::Xlsx => {
                let mut workbook = workbook(records)?;
                write_atomic(&self.path, |f| {
                    workbook.save_to_writer(f)?;
                    Ok(())
                })?
            }
        }
        debug!(path = %self.path.display(), rows = self.records.len(), "flushed sheet");
        self.unflushed = 0;
        Ok(())
    }
}

fn read_csv(path: &Path) -> Result<Vec<LawRecord>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows: Result<Vec<LawRecord>, csv::Error> = reader.deserialize().collect();
    Ok(rows?)
}

/// One worksheet: a header row of [`COLUMNS`], then one string row per record.
fn workbook(records: &[LawRecord]) -> Result<Workbook, StoreError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;
    for (col, heading) in (0u16..).zip(COLUMNS) {
        worksheet.write_string(0, col, heading)?;
    }
    for (row, record) in (1u32..).zip(records) {
        for (col, cell) in (0u16..).zip(record.cells()) {
            if !cell.is_empty() {
                worksheet.write_string(row, col, cell)?;
            }
        }
    }
    Ok(workbook)
}

fn read_xlsx(path: &Path) -> Result<Vec<LawRecord>, StoreError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StoreError::Other(format!("{} has no worksheet", path.display())))??;
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(Data::to_string).collect();
    if header != COLUMNS {
        return Err(StoreError::Other(format!(
            "{}: unexpected header {header:?}",
            path.display()
        )));
    }

    let records = rows
        .map(|row| {
            let cell = |i: usize| row.get(i).map(Data::to_string).unwrap_or_default();
            let source = cell(5);
            LawRecord {
                region: cell(0),
                title: cell(1),
                number: cell(2),
                date: cell(3),
                filename: cell(4),
                source_url: (!source.is_empty()).then_some(source),
                status: cell(6).parse().unwrap_or_default(),
            }
        })
        .collect();
    Ok(records)
}
