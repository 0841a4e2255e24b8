//! Turning uploaded bytes into a canonical table.
//!
//! The pipeline is:
//! 1. Parse as CSV, falling back to the first sheet of an Excel workbook
//! 2. Canonicalize headers ([`normalize_header`])
//! 3. Opportunistically retype date-like and mostly-numeric text columns

mod excel;
mod headers;
mod retype;

pub use headers::normalize_header;

pub(crate) use retype::is_date_like_name;
pub(crate) use retype::parse_timestamp_millis;

use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{RetypeOutcome, RetypeReport};
use polars::prelude::*;
use std::io::Cursor;
use tracing::{debug, info};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parse, canonicalize and retype an uploaded file.
///
/// Fails with [`AnalysisError::Ingestion`] only when the bytes are neither
/// CSV nor a readable workbook; retyping problems never fail ingestion.
pub fn ingest_bytes(
    bytes: &[u8],
    config: &ExplorerConfig,
) -> Result<(DataFrame, Vec<RetypeReport>)> {
    let raw = match read_csv(bytes, config) {
        Ok(df) => df,
        Err(csv_err) => {
            debug!("CSV parse failed ({}), trying Excel", csv_err);
            excel::read_first_sheet(bytes).map_err(|xl_err| {
                AnalysisError::Ingestion(format!("CSV: {csv_err}; Excel: {xl_err:#}"))
            })?
        }
    };

    let normalized = headers::normalize_columns(raw)?;
    let (df, reports) = retype::retype_columns(normalized, config)?;

    info!(
        "Ingested {} rows x {} columns ({} retyped)",
        df.height(),
        df.width(),
        reports
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    RetypeOutcome::ParsedDatetime | RetypeOutcome::PromotedNumeric { .. }
                )
            })
            .count()
    );
    Ok((df, reports))
}

/// Parse bytes as a comma-separated file with a header row.
///
/// Tries progressively looser readers: sampled dtype inference, inference
/// over every row, then every column as text. A column whose type changes
/// past the sample window lands in one of the later passes and is left to
/// [`retype::retype_columns`].
fn read_csv(bytes: &[u8], config: &ExplorerConfig) -> std::result::Result<DataFrame, String> {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return Err("binary workbook signature".to_string());
    }
    let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if std::str::from_utf8(text).is_err() {
        return Err("content is not valid UTF-8 text".to_string());
    }
    if text.iter().all(u8::is_ascii_whitespace) {
        return Err("file is empty".to_string());
    }

    // Strategy 1: sampled inference
    match read_csv_with_inference(text, Some(config.csv_infer_schema_rows)) {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Sampled CSV inference failed: {}", e),
    }

    // Strategy 2: inference over the whole file
    match read_csv_with_inference(text, None) {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Full-scan CSV inference failed: {}", e),
    }

    // Strategy 3: everything as text
    read_csv_with_inference(text, Some(0)).map_err(|e| e.to_string())
}

fn read_csv_with_inference(text: &[u8], infer_rows: Option<usize>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_rows)
        .into_reader_with_file_handle(Cursor::new(text.to_vec()))
        .finish()
}
