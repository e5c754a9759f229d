//! CSV extraction.
//!
//! Rows are read with their header names and re-serialized as a
//! pretty-printed JSON array of `{ column: value }` objects, so the chunker
//! sees labelled values instead of bare delimited fields.
//!
//! Keys keep the column order of the file. A row with more fields than the
//! header keys the extras by position (`_2`, `_3`, ...); a short row only
//! carries the columns it has.

use std::path::Path;

use serde_json::{Map, Value};

use super::{Extractor, read_bytes};
use crate::document::DocumentFormat;
use crate::error::{RagError, Result};

/// Converts CSV rows (with a header row) into structured JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExtractor;

impl Extractor for CsvExtractor {
    fn name(&self) -> &str {
        "csv"
    }

    fn can_handle(&self, format: DocumentFormat) -> bool {
        format == DocumentFormat::Csv
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;
        let mut reader = ::csv::ReaderBuilder::new().flexible(true).from_reader(bytes.as_slice());

        let headers = reader
            .headers()
            .map_err(|e| RagError::extraction(path, format!("invalid CSV header: {e}")))?
            .clone();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                RagError::extraction(path, format!("invalid CSV record {}: {e}", line + 1))
            })?;
            let row: Map<String, Value> = record
                .iter()
                .enumerate()
                .map(|(i, value)| (column_name(&headers, i), Value::String(value.to_string())))
                .collect();
            rows.push(Value::Object(row));
        }

        serde_json::to_string_pretty(&rows)
            .map_err(|e| RagError::extraction(path, format!("failed to serialize rows: {e}")))
    }
}

/// Header name for field `i`; fields past the header row are keyed `_<i>`.
fn column_name(headers: &::csv::StringRecord, i: usize) -> String {
    headers.get(i).map_or_else(|| format!("_{i}"), str::to_string)
}
