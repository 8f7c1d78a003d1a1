use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use rand::Rng;
use tracing::{debug, info, warn};

use super::normalize::{normalize_row, required_columns};
use crate::cli::{LoadMode, RowFailurePolicy};
use crate::error::{LoadError, RowError, StoreError};
use crate::model::{InventoryRecord, LoadSummary, RawRow, SkippedRow};
use crate::store::{Document, DocumentStore};

#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub rows_read: usize,
    pub records: Vec<InventoryRecord>,
    pub skipped: Vec<SkippedRow>,
}

pub fn load_inventory<R: Rng + ?Sized>(
    source: &Path,
    collection: &str,
    mode: LoadMode,
    store: &DocumentStore,
    rng: &mut R,
) -> Result<LoadSummary, LoadError> {
    let batch = normalize_source(source, mode, rng)?;
    let documents = to_documents(&batch.records)?;

    let inserted = store.replace_collection(collection, documents)?;

    info!(
        collection,
        mode = mode.as_str(),
        rows = batch.rows_read,
        inserted,
        skipped = batch.skipped.len(),
        "replaced collection contents"
    );

    Ok(LoadSummary {
        collection: collection.to_string(),
        mode: mode.as_str().to_string(),
        source_path: source.display().to_string(),
        rows_read: batch.rows_read,
        inserted,
        skipped: batch.skipped,
    })
}

pub fn normalize_source<R: Rng + ?Sized>(
    source: &Path,
    mode: LoadMode,
    rng: &mut R,
) -> Result<NormalizedBatch, LoadError> {
    let file = File::open(source).map_err(|err| LoadError::File {
        path: source.to_path_buf(),
        source: err,
    })?;

    normalize_reader(file, source, mode, rng)
}

pub fn normalize_reader<Rd: Read, R: Rng + ?Sized>(
    input: Rd,
    source: &Path,
    mode: LoadMode,
    rng: &mut R,
) -> Result<NormalizedBatch, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|err| csv_fatal_error(source, err))?
        .clone();
    check_header(source, &headers, mode)?;

    let policy = mode.row_failure_policy();
    let mut batch = NormalizedBatch {
        rows_read: 0,
        records: Vec::new(),
        skipped: Vec::new(),
    };

    for (ordinal, result) in reader.records().enumerate() {
        batch.rows_read += 1;

        let (raw, outcome) = match result {
            Ok(record) => {
                let raw = raw_row(&headers, &record);
                let outcome = if record.len() == headers.len() {
                    normalize_row(&raw, ordinal, mode, rng)
                } else {
                    Err(RowError::MalformedRecord(format!(
                        "expected {} fields, found {}",
                        headers.len(),
                        record.len()
                    )))
                };
                (raw, outcome)
            }
            Err(err) if err.is_io_error() => return Err(csv_fatal_error(source, err)),
            Err(err) => (RawRow::new(), Err(RowError::MalformedRecord(err.to_string()))),
        };

        match outcome {
            Ok(record) => {
                debug!(ordinal, sku = record.sku, name = %record.name, "normalized row");
                batch.records.push(record);
            }
            Err(err) => match policy {
                RowFailurePolicy::AbortBatch => {
                    return Err(LoadError::Row {
                        ordinal,
                        raw,
                        source: err,
                    });
                }
                RowFailurePolicy::SkipRow => {
                    warn!(ordinal, reason = %err, "skipping row");
                    batch.skipped.push(SkippedRow {
                        ordinal,
                        raw,
                        reason: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(batch)
}

fn check_header(source: &Path, headers: &StringRecord, mode: LoadMode) -> Result<(), LoadError> {
    let missing = required_columns(mode)
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .copied()
        .collect::<Vec<&str>>();

    if missing.is_empty() {
        return Ok(());
    }

    Err(LoadError::Header {
        path: source.to_path_buf(),
        message: format!("missing required columns: {}", missing.join(", ")),
    })
}

fn raw_row(headers: &StringRecord, record: &StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(header, value)| (header.to_string(), value.to_string()))
        .collect()
}

fn csv_fatal_error(source: &Path, err: csv::Error) -> LoadError {
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => LoadError::File {
            path: source.to_path_buf(),
            source: io_err,
        },
        other => LoadError::Header {
            path: source.to_path_buf(),
            message: format!("{other:?}"),
        },
    }
}

fn to_documents(records: &[InventoryRecord]) -> Result<Vec<Document>, StoreError> {
    records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            serde_json::Value::Object(document) => Ok(document),
            _ => Err(StoreError::InvalidQuery(
                "inventory record did not serialize to an object".to_string(),
            )),
        })
        .collect()
}
