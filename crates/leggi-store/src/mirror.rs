//! Arrow/Parquet mirror of the law index.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use leggi_core::{LawRecord, index};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;
use crate::atomic::write_atomic;

/// Convert records into a single batch with the law index schema.
pub fn records_to_batch(records: &[LawRecord]) -> Result<RecordBatch, StoreError> {
    let source: ArrayRef = Arc::new(StringArray::from(
        records
            .iter()
            .map(|r| r.source_url.as_deref())
            .collect::<Vec<_>>(),
    ));
    let status: ArrayRef = Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.status.to_string()),
    ));
    let batch = RecordBatch::try_new(
        Arc::new(index::law_index_schema()),
        vec![
            utf8(records, |r| &r.region),
            utf8(records, |r| &r.title),
            utf8(records, |r| &r.number),
            utf8(records, |r| &r.date),
            utf8(records, |r| &r.filename),
            source,
            status,
        ],
    )?;
    Ok(batch)
}

fn utf8<'a>(records: &'a [LawRecord], field: impl Fn(&'a LawRecord) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(records.iter().map(field)))
}

/// Rebuild records from a batch produced by [`records_to_batch`].
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<LawRecord>, StoreError> {
    let col = |name: &str| -> Result<&StringArray, StoreError> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| StoreError::Other(format!("missing utf8 column {name}")))
    };
    let region = col("region")?;
    let title = col("title")?;
    let number = col("number")?;
    let date = col("date")?;
    let filename = col("filename")?;
    let source = col("source_url")?;
    let status = col("status")?;

    let records = (0..batch.num_rows())
        .map(|i| LawRecord {
            region: region.value(i).to_string(),
            title: title.value(i).to_string(),
            number: number.value(i).to_string(),
            date: date.value(i).to_string(),
            filename: filename.value(i).to_string(),
            source_url: (!source.is_null(i)).then(|| source.value(i).to_string()),
            status: status.value(i).parse().unwrap_or_default(),
        })
        .collect();
    Ok(records)
}

/// Write the whole index to `path` as one Parquet file.
pub fn write_parquet(path: &Path, records: &[LawRecord]) -> Result<usize, StoreError> {
    let batch = records_to_batch(records)?;
    write_atomic(path, |f| {
        let mut writer = ArrowWriter::try_new(f, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    })?;
    info!(path = %path.display(), rows = records.len(), "wrote parquet mirror");
    Ok(records.len())
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::ParquetNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}
