//! First-sheet Excel reader.

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use polars::prelude::*;
use std::io::Cursor;

/// Layout used when a date cell has to be rendered as text.
const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a column's non-empty cells have in common.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

/// Read the first worksheet of an xlsx/xls/ods workbook.
///
/// The first row is the header.
pub(crate) fn read_first_sheet(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("not an Excel workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets"))?
        .context("could not read the first sheet")?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| anyhow!("first sheet is empty"))?;
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            cell_text(cell)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("column_{}", idx + 1))
        })
        .collect();

    let body: Vec<&[Data]> = rows.collect();
    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            build_column(name, &cells)
        })
        .collect::<PolarsResult<Vec<Column>>>()?;

    Ok(DataFrame::new(columns)?)
}

fn build_column(name: &str, cells: &[&Data]) -> PolarsResult<Column> {
    let name: PlSmallStr = name.into();
    let series = match column_kind(cells) {
        CellKind::Int => Series::new(
            name,
            cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v),
                    Data::Float(v) => Some(*v as i64),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        CellKind::Float => Series::new(
            name,
            cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(v) => Some(*v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        CellKind::Bool => Series::new(
            name,
            cells
                .iter()
                .map(|c| match c {
                    Data::Bool(v) => Some(*v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        CellKind::DateTime => Series::new(
            name,
            cells
                .iter()
                .map(|c| match c {
                    Data::DateTime(dt) => dt.as_datetime().map(|d| d.and_utc().timestamp_millis()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        CellKind::Text => Series::new(
            name,
            cells.iter().map(|c| cell_text(c)).collect::<Vec<_>>(),
        ),
    };
    Ok(series.into())
}

/// The narrowest kind every non-empty cell fits.
fn column_kind(cells: &[&Data]) -> CellKind {
    let mut kind: Option<CellKind> = None;

    for cell in cells {
        let cell_kind = match cell {
            Data::Empty | Data::Error(_) => continue,
            Data::Int(_) => CellKind::Int,
            Data::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            Data::DateTime(_) => CellKind::DateTime,
            _ => CellKind::Text,
        };
        kind = Some(match (kind, cell_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(CellKind::Int | CellKind::Float), CellKind::Int | CellKind::Float) => {
                CellKind::Float
            }
            _ => return CellKind::Text,
        });
    }

    kind.unwrap_or(CellKind::Text)
}

/// Render a cell as text; empty and error cells are null.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(v.to_string()),
        Data::Bool(v) => Some(v.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format(DATETIME_TEXT_FORMAT).to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_narrowest_fit() {
        let int = Data::Int(1);
        let whole = Data::Float(2.0);
        let frac = Data::Float(2.5);
        let text = Data::String("x".to_string());
        let flag = Data::Bool(true);

        assert_eq!(column_kind(&[&int, &whole, &Data::Empty]), CellKind::Int);
        assert_eq!(column_kind(&[&int, &frac]), CellKind::Float);
        assert_eq!(column_kind(&[&flag, &Data::Empty]), CellKind::Bool);
        assert_eq!(column_kind(&[&int, &text]), CellKind::Text);
        assert_eq!(column_kind(&[&flag, &int]), CellKind::Text);
        assert_eq!(column_kind(&[&Data::Empty]), CellKind::Text);
    }

    #[test]
    fn test_build_int_column_with_gaps() {
        let cells = [&Data::Int(3), &Data::Empty, &Data::Float(4.0)];
        let col = build_column("qty", &cells).unwrap();
        assert_eq!(col.dtype(), &DataType::Int64);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_build_text_column_renders_numbers() {
        let a = Data::String("West".to_string());
        let b = Data::Float(1.5);
        let col = build_column("region", &[&a, &b]).unwrap();
        assert_eq!(col.dtype(), &DataType::String);
        assert_eq!(col.get(1).unwrap(), AnyValue::String("1.5"));
    }

    #[test]
    fn test_garbage_bytes_are_not_a_workbook() {
        assert!(read_first_sheet(b"definitely not a spreadsheet").is_err());
    }
}
