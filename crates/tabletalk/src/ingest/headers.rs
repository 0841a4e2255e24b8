//! Header canonicalization.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-/]").expect("Invalid regex: header characters"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace run"));

/// Canonical snake_case form of a raw header.
///
/// `"Total Sales ($)"` becomes `"total_sales_"`, `"Order-Date"` becomes
/// `"order_date"`. Applying it twice gives the same result as applying it once.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = DISALLOWED.replace_all(trimmed, "");
    let spaced = stripped.replace(['/', '-', '.'], " ");
    WHITESPACE.replace_all(&spaced, "_").to_lowercase()
}

/// Rename every column to its canonical form.
///
/// Headers that normalize to nothing become `column_<n>` (1-based position).
/// When several columns land on the same name, the last one is kept.
pub(crate) fn normalize_columns(df: DataFrame) -> PolarsResult<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let name = normalize_header(raw);
            if name.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name
            }
        })
        .collect();

    // Walk backwards so the last occurrence of each name claims it.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut keep = vec![false; names.len()];
    for (idx, name) in names.iter().enumerate().rev() {
        if seen.insert(name.as_str()) {
            keep[idx] = true;
        } else {
            warn!(
                "Dropping column {} ('{}'): a later column has the same normalized name",
                idx + 1,
                name
            );
        }
    }

    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .zip(&names)
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|((col, name), _)| {
            let mut col = col.clone();
            col.rename(name.as_str().into());
            col
        })
        .collect();

    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_header_examples() {
        assert_eq!(normalize_header("Customer Name"), "customer_name");
        assert_eq!(normalize_header("  Order-Date "), "order_date");
        assert_eq!(normalize_header("Sales/Region"), "sales_region");
        assert_eq!(normalize_header("Total Sales ($)"), "total_sales_");
        assert_eq!(normalize_header("unit.price"), "unitprice");
        assert_eq!(normalize_header("Qty   Ordered"), "qty_ordered");
    }

    #[test]
    fn test_normalize_header_is_idempotent() {
        for raw in [
            "Customer Name",
            "  Order-Date ",
            "Total Sales ($)",
            "a - b / c",
            "Ünïcode Col",
            "already_snake",
            "",
            "%%%",
        ] {
            let once = normalize_header(raw);
            assert_eq!(normalize_header(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_normalize_columns_renames() {
        let df = df!(
            "Customer Name" => &["a"],
            "Total Sales" => &[1.0f64],
        )
        .unwrap();
        let out = normalize_columns(df).unwrap();
        assert_eq!(
            out.get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec!["customer_name", "total_sales"]
        );
    }

    #[test]
    fn test_duplicate_normalized_names_keep_last() {
        let df = df!(
            "Sales" => &[1i64],
            "region" => &["West"],
            "sales" => &[2i64],
        )
        .unwrap();
        let out = normalize_columns(df).unwrap();

        assert_eq!(out.width(), 2);
        assert_eq!(
            out.column("sales").unwrap().get(0).unwrap(),
            AnyValue::Int64(2)
        );
        assert_eq!(out.get_column_names()[0].as_str(), "region");
    }

    #[test]
    fn test_empty_header_gets_positional_name() {
        let df = df!("$$" => &[1i64], "b" => &[2i64]).unwrap();
        let out = normalize_columns(df).unwrap();
        assert!(out.column("column_1").is_ok());
    }
}
