//! Terminal output: law cards read back from the Parquet mirror, run
//! summaries, and PDF counts.

use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use leggi_pipeline::RunReport;
use leggi_store::PdfCensus;

// ── Schema section groupings ──

const IDENTITY: &[&str] = &["region", "number", "date"];

const DOCUMENT: &[&str] = &["filename", "status", "source_url"];

// ── Law card ──

/// Locate the row for `filename` across `batches` and return it as a
/// single-row batch.
pub fn find_law(batches: &[RecordBatch], filename: &str) -> Option<RecordBatch> {
    batches.iter().find_map(|batch| {
        let idx = batch.schema().index_of("filename").ok()?;
        let col = batch.column(idx);
        (0..batch.num_rows())
            .find(|&i| col_str(col.as_ref(), i) == Some(filename))
            .map(|i| batch.slice(i, 1))
    })
}

/// Print a single law as a vertical card grouped by section.
pub fn print_law_card(batch: &RecordBatch) {
    let title = get_utf8(batch, "title").unwrap_or_default();
    let filename = get_utf8(batch, "filename").unwrap_or_default();

    println!("=== {} ===", filename);
    if !title.is_empty() {
        println!("{}", title);
    }
    println!();

    print_section(batch, "Identity", IDENTITY);
    print_section(batch, "Document", DOCUMENT);
}

fn print_section(batch: &RecordBatch, header: &str, cols: &[&str]) {
    let has_data = cols.iter().any(|&col| {
        batch
            .schema()
            .index_of(col)
            .ok()
            .is_some_and(|i| !batch.column(i).is_null(0))
    });
    if !has_data {
        return;
    }

    println!("{header}");
    let schema = batch.schema();
    for &col_name in cols {
        let Ok(idx) = schema.index_of(col_name) else {
            continue;
        };
        let col = batch.column(idx);
        if col.is_null(0) {
            continue;
        }
        match schema.field(idx).data_type() {
            DataType::Utf8 | DataType::LargeUtf8 => {
                if let Some(value) = col_str(col.as_ref(), 0) {
                    println!("  {:<12} {}", col_name, value);
                }
            }
            other => println!("  {:<12} ({other})", col_name),
        }
    }
    println!();
}

// ── Summaries ──

pub fn print_run_report(report: &RunReport) {
    let s = &report.stats;
    println!("=== {} ===", report.region);
    println!("  {:<16} {}", "groups", report.groups);
    if report.groups_skipped > 0 {
        println!("  {:<16} {}", "groups skipped", report.groups_skipped);
    }
    if report.pages > 0 {
        println!("  {:<16} {}", "listing pages", report.pages);
    }
    if report.probes > 0 {
        println!("  {:<16} {}", "probes", report.probes);
    }
    println!("  {:<16} {}", "new laws", s.candidates);
    if s.already_done > 0 {
        println!("  {:<16} {}", "already done", s.already_done);
    }
    println!();
    println!("  {:<16} {}", "downloaded", s.downloaded);
    println!("  {:<16} {}", "skipped", s.skipped);
    println!("  {:<16} {}", "abrogated", s.abrogated);
    println!("  {:<16} {}", "failed", s.failed);
    println!("  {:<16} {}", "errors", s.errors);
    if s.duplicates > 0 {
        println!("  {:<16} {}", "duplicates", s.duplicates);
    }
    println!("  {:<16} {}", "missing number", s.missing_number);
    println!("  {:<16} {}", "missing date", s.missing_date);
    println!();
    println!("  {} rows in {}", report.rows, report.sheet_path.display());
    println!("  mirror at {}", report.parquet_path.display());
}

pub fn print_census(census: &PdfCensus) {
    for (year, count) in &census.by_year {
        println!("  {year}  {count}");
    }
    if census.undated > 0 {
        println!("  ????  {}", census.undated);
    }
    println!("  total {}", census.total());
}

// ── Helpers ──

fn get_utf8(batch: &RecordBatch, col_name: &str) -> Option<String> {
    let idx = batch.schema().index_of(col_name).ok()?;
    col_str(batch.column(idx).as_ref(), 0).map(str::to_string)
}

/// Get a string value from a column that might be Utf8 or LargeUtf8.
fn col_str(col: &dyn Array, i: usize) -> Option<&str> {
    if col.is_null(i) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        return Some(arr.value(i));
    }
    if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Some(arr.value(i));
    }
    None
}
