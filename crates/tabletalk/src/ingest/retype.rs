//! Opportunistic retyping of freshly parsed columns.
//!
//! Two conversions are attempted on text columns:
//!
//! - Columns whose name mentions a date or time are parsed as timestamps.
//!   Parsing is all-or-nothing: one unparseable value keeps the column as text.
//! - Columns that are still text are coerced to numbers when enough values
//!   parse (see [`ExplorerConfig::promotion_threshold`]); unparseable cells
//!   become null.
//!
//! Every column gets a [`RetypeOutcome`] so callers can see what happened.

use crate::config::ExplorerConfig;
use crate::types::{RetypeOutcome, RetypeReport};
use crate::utils::{is_text_dtype, parse_numeric_cell};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

/// Name fragments that mark a column as date-like.
const DATE_TOKENS: [&str; 3] = ["date", "time", "timestamp"];

/// Date-time layouts tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Layouts carrying a UTC offset that RFC 3339 does not accept.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S %:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Date-only layouts, read as midnight. `%B` also accepts abbreviated names.
const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

pub(crate) fn is_date_like_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    DATE_TOKENS.iter().any(|tok| lower.contains(tok))
}

/// Parse one timestamp into milliseconds since the epoch (UTC).
pub(crate) fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.timestamp_millis());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Retype every eligible column of `df`.
pub(crate) fn retype_columns(
    df: DataFrame,
    config: &ExplorerConfig,
) -> PolarsResult<(DataFrame, Vec<RetypeReport>)> {
    let rows = df.height();
    let mut columns = Vec::with_capacity(df.width());
    let mut reports = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let (converted, outcome) = retype_series(series, rows, config)?;
        debug!("Retype '{}': {:?}", series.name(), outcome);

        reports.push(RetypeReport {
            column: series.name().to_string(),
            outcome,
        });
        columns.push(converted.map(Column::from).unwrap_or_else(|| col.clone()));
    }

    Ok((DataFrame::new(columns)?, reports))
}

/// Decide what to do with one column. `None` means keep it unchanged.
fn retype_series(
    series: &Series,
    rows: usize,
    config: &ExplorerConfig,
) -> PolarsResult<(Option<Series>, RetypeOutcome)> {
    if !is_text_dtype(series.dtype()) {
        return Ok((None, RetypeOutcome::Ineligible));
    }
    let text = series.cast(&DataType::String)?;
    let values = text.str()?;

    let mut datetime_failure = None;
    if is_date_like_name(series.name()) {
        match parse_datetime_column(values) {
            Ok(millis) => {
                let parsed = Series::new(series.name().clone(), millis)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
                return Ok((Some(parsed), RetypeOutcome::ParsedDatetime));
            }
            Err(reason) => datetime_failure = Some(reason),
        }
    }

    let coerced: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.and_then(parse_numeric_cell))
        .collect();
    let parsed = coerced.iter().filter(|v| v.is_some()).count();
    let threshold = config.promotion_threshold(rows);

    if parsed > threshold {
        let promoted = Series::new(series.name().clone(), coerced);
        return Ok((Some(promoted), RetypeOutcome::PromotedNumeric { parsed }));
    }

    let numeric_reason = format!("{parsed} numeric values, needed more than {threshold}");
    let reason = match datetime_failure {
        Some(dt) => format!("{dt}; {numeric_reason}"),
        None => numeric_reason,
    };
    Ok((None, RetypeOutcome::Rejected { reason }))
}

/// All non-empty values as epoch milliseconds, or the first value that did not parse.
fn parse_datetime_column(values: &StringChunked) -> Result<Vec<Option<i64>>, String> {
    let mut out = Vec::with_capacity(values.len());
    let mut any = false;

    for value in values.into_iter() {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => out.push(None),
            Some(v) => match parse_timestamp_millis(v) {
                Some(ms) => {
                    any = true;
                    out.push(Some(ms));
                }
                None => return Err(format!("'{v}' is not a recognised timestamp")),
            },
        }
    }

    if !any {
        return Err("no timestamp values".to_string());
    }
    Ok(out)
}
