//! Per-column descriptive statistics.

use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::profiler::describe_column;
use crate::resolver;
use crate::types::{DescribeResult, ToolOutcome};
use crate::utils::column_names;
use polars::prelude::*;

/// Describe the requested columns, or the whole table.
///
/// Terms that do not resolve are skipped. When none resolve (or none are
/// given) every column is described.
pub fn describe(
    df: &DataFrame,
    columns: &[String],
    config: &ExplorerConfig,
) -> ToolOutcome<DescribeResult> {
    ToolOutcome::from_result(run(df, columns, config))
}

fn run(df: &DataFrame, columns: &[String], config: &ExplorerConfig) -> Result<DescribeResult> {
    let names = column_names(df);
    let mut selected: Vec<String> = Vec::new();
    for term in columns {
        let resolved = if names.contains(term) {
            Some(term.clone())
        } else {
            resolver::resolve(&names, term, config)
        };
        if let Some(col) = resolved
            && !selected.contains(&col)
        {
            selected.push(col);
        }
    }
    if selected.is_empty() {
        selected = names;
    }

    let table = selected
        .iter()
        .map(|name| {
            let series = df.column(name)?.as_materialized_series();
            describe_column(series).map_err(|e| AnalysisError::Internal(format!("{e:#}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DescribeResult { table })
}
