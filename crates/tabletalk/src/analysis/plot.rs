//! Chart-ready data for an external renderer.

use super::find_column;
use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::profiler::classify;
use crate::types::{ChartKind, ChartSpec, PlotAggregation, PlotResult, PlotUsed, ToolOutcome};
use crate::utils::{dataframe_to_records, is_numeric_column, is_numeric_dtype, numeric_values};
use polars::prelude::*;

/// Build the data and description for an `x`/`y` chart.
///
/// With an aggregation, `y` is summarised per `x` value (groups in order of
/// first appearance, null keys dropped). Without one, rows with a missing
/// `x` or `y` are dropped. At most `config.plot_max_points` points are
/// returned; `total_rows` counts all of them.
pub fn plot(
    df: &DataFrame,
    x: &str,
    y: &str,
    kind: ChartKind,
    agg: Option<PlotAggregation>,
    config: &ExplorerConfig,
) -> ToolOutcome<PlotResult> {
    ToolOutcome::from_result(run(df, x, y, kind, agg, config))
}

fn run(
    df: &DataFrame,
    x: &str,
    y: &str,
    kind: ChartKind,
    agg: Option<PlotAggregation>,
    config: &ExplorerConfig,
) -> Result<PlotResult> {
    let x_col = find_column(df, x, config)?;
    let y_col = find_column(df, y, config)?;

    if matches!(agg, Some(PlotAggregation::Sum | PlotAggregation::Mean))
        && !is_numeric_column(df, &y_col)
    {
        return Err(AnalysisError::NonNumericColumn {
            column: y_col,
            numeric_candidates: classify(df, config).numeric,
        });
    }

    let data = match agg {
        Some(agg) => {
            let value = match agg {
                PlotAggregation::Sum => col(y_col.as_str()).sum(),
                PlotAggregation::Mean => col(y_col.as_str()).mean(),
                PlotAggregation::Count => col(y_col.as_str()).count(),
            };
            df.clone()
                .lazy()
                .filter(col(x_col.as_str()).is_not_null())
                .group_by_stable([col(x_col.as_str())])
                .agg([value])
                .collect()?
        }
        None => {
            let mut selected = vec![col(x_col.as_str())];
            if y_col != x_col {
                selected.push(col(y_col.as_str()));
            }
            df.clone()
                .lazy()
                .select(selected)
                .filter(
                    col(x_col.as_str())
                        .is_not_null()
                        .and(col(y_col.as_str()).is_not_null()),
                )
                .collect()?
        }
    };

    let total = data.height();
    let table = dataframe_to_records(&data.head(Some(config.plot_max_points)))?;

    let mut description = vec![format!(
        "{} chart showing {} by {}. Dataset contains {} data points.",
        kind.title(),
        y_col,
        x_col,
        total
    )];
    let y_values = data.column(y_col.as_str())?;
    if is_numeric_dtype(y_values.dtype()) {
        let values = numeric_values(y_values.as_materialized_series())?;
        if !values.is_empty() {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            description.push(format!(
                "{y_col} ranges from {min:.2} to {max:.2} with an average of {mean:.2}."
            ));
        }
    }
    if let Some(agg) = agg {
        description.push(format!("Data is aggregated using {}.", agg.as_str()));
    }

    let kind_name = kind.title().to_lowercase();
    Ok(PlotResult {
        success: format!("Created {kind_name} chart with {total} data points"),
        chart: Some(ChartSpec {
            x: x_col.clone(),
            y: y_col.clone(),
            kind,
            data: table.clone(),
        }),
        table,
        description: description.join(" "),
        used: PlotUsed {
            x: x_col,
            y: y_col,
            agg,
            kind,
        },
        total_rows: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn monthly() -> DataFrame {
        df!(
            "month" => &["Jan", "Feb", "Jan", "Mar"],
            "revenue" => &[Some(10.0f64), Some(20.0), Some(30.0), None],
            "rep" => &["a", "b", "c", "d"],
        )
        .unwrap()
    }

    #[test]
    fn test_plot_raw_drops_missing() {
        let out = plot(&monthly(), "month", "revenue", ChartKind::Line, None, &ExplorerConfig::default());
        let result = out.success().unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.table.len(), 3);
        assert_eq!(
            result.description,
            "Line chart showing revenue by month. Dataset contains 3 data points. \
             revenue ranges from 10.00 to 30.00 with an average of 20.00."
        );
        assert_eq!(result.success, "Created line chart with 3 data points");
        let chart = result.chart.as_ref().unwrap();
        assert_eq!(chart.data, result.table);
    }

    #[test]
    fn test_plot_aggregated_sum() {
        let out = plot(
            &monthly(),
            "month",
            "revenue",
            ChartKind::Bar,
            Some(PlotAggregation::Sum),
            &ExplorerConfig::default(),
        );
        let result = out.success().unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.table[0]["month"], json!("Jan"));
        assert_eq!(result.table[0]["revenue"], json!(40.0));
        assert!(result.description.ends_with("Data is aggregated using sum."));
        assert_eq!(result.used.agg, Some(PlotAggregation::Sum));
    }

    #[test]
    fn test_plot_count_on_text_column() {
        let out = plot(
            &monthly(),
            "month",
            "rep",
            ChartKind::Bar,
            Some(PlotAggregation::Count),
            &ExplorerConfig::default(),
        );
        let result = out.success().unwrap();
        assert_eq!(result.table[0]["rep"], json!(2));
    }

    #[test]
    fn test_plot_caps_points() {
        let n = 120;
        let df = df!(
            "day" => (0..n).collect::<Vec<i64>>(),
            "value" => (0..n).map(|i| i as f64).collect::<Vec<_>>(),
        )
        .unwrap();
        let out = plot(&df, "day", "value", ChartKind::Area, None, &ExplorerConfig::default());
        let result = out.success().unwrap();

        assert_eq!(result.table.len(), 50);
        assert_eq!(result.total_rows, 120);
        assert!(result.description.starts_with("Area chart"));
    }

    #[test]
    fn test_plot_unknown_column() {
        let out = plot(&monthly(), "zzzz", "revenue", ChartKind::Line, None, &ExplorerConfig::default());
        assert_eq!(out.failure().unwrap().code, "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_plot_sum_of_text_rejected() {
        let out = plot(
            &monthly(),
            "month",
            "rep",
            ChartKind::Line,
            Some(PlotAggregation::Sum),
            &ExplorerConfig::default(),
        );
        assert_eq!(out.failure().unwrap().code, "NON_NUMERIC_COLUMN");
    }
}
