//! Top-k groups by an aggregated metric.

use super::find_column;
use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::profiler::classify;
use crate::types::{Aggregation, TopKResult, TopKUsed, ToolOutcome};
use crate::utils::{dataframe_to_records, is_numeric_column};
use polars::prelude::*;
use tracing::debug;

/// Aggregate `metric` per `group_by` value and keep the `k` largest groups.
///
/// Groups with a null key are dropped. Groups keep first-appearance order
/// before the descending sort, and the sort is stable, so equal totals are
/// listed in the order the groups first appear in the table.
pub fn top_k(
    df: &DataFrame,
    metric: &str,
    group_by: &str,
    k: usize,
    agg: Aggregation,
    config: &ExplorerConfig,
) -> ToolOutcome<TopKResult> {
    ToolOutcome::from_result(run(df, metric, group_by, k, agg, config))
}

fn run(
    df: &DataFrame,
    metric: &str,
    group_by: &str,
    k: usize,
    agg: Aggregation,
    config: &ExplorerConfig,
) -> Result<TopKResult> {
    let metric_col = find_column(df, metric, config)?;
    let group_col = find_column(df, group_by, config)?;

    if !is_numeric_column(df, &metric_col) {
        return Err(AnalysisError::NonNumericColumn {
            column: metric_col,
            numeric_candidates: classify(df, config).numeric,
        });
    }

    debug!(
        "top_k: {:?} of '{}' by '{}', k={}",
        agg, metric_col, group_col, k
    );

    // Grouping a column by itself would collide on the output name.
    let value_name = if metric_col == group_col {
        format!("{metric_col}_{}", agg_name(agg))
    } else {
        metric_col.clone()
    };
    let value = match agg {
        Aggregation::Sum => col(metric_col.as_str()).sum(),
        Aggregation::Mean => col(metric_col.as_str()).mean(),
    }
    .alias(value_name.as_str());

    let out = df
        .clone()
        .lazy()
        .filter(col(group_col.as_str()).is_not_null())
        .group_by_stable([col(group_col.as_str())])
        .agg([value])
        .sort(
            [value_name.as_str()],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .limit(k as IdxSize)
        .collect()?;

    Ok(TopKResult {
        table: dataframe_to_records(&out)?,
        used: TopKUsed {
            metric: metric_col,
            group_by: group_col,
            agg,
        },
    })
}

fn agg_name(agg: Aggregation) -> &'static str {
    match agg {
        Aggregation::Sum => "sum",
        Aggregation::Mean => "mean",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sales() -> DataFrame {
        df!(
            "region" => &[Some("West"), Some("East"), Some("West"), Some("North"), None, Some("East")],
            "total_sales" => &[10.0f64, 30.0, 25.0, 5.0, 100.0, 5.0],
            "customer_name" => &["a", "b", "c", "d", "e", "f"],
        )
        .unwrap()
    }

    #[test]
    fn test_top_k_sum_ordering() {
        let out = top_k(&sales(), "total_sales", "region", 5, Aggregation::Sum, &ExplorerConfig::default());
        let result = out.success().unwrap();

        let regions: Vec<_> = result.table.iter().map(|r| r["region"].clone()).collect();
        // West and East tie on 35; West appears first.
        assert_eq!(regions, vec![json!("West"), json!("East"), json!("North")]);
        assert_eq!(result.table[0]["total_sales"], json!(35.0));
        assert_eq!(result.used.metric, "total_sales");
        assert_eq!(result.used.group_by, "region");
    }

    #[test]
    fn test_top_k_truncates_and_is_sorted() {
        let out = top_k(&sales(), "total_sales", "region", 2, Aggregation::Mean, &ExplorerConfig::default());
        let table = &out.success().unwrap().table;

        assert_eq!(table.len(), 2);
        let values: Vec<f64> = table
            .iter()
            .map(|r| r["total_sales"].as_f64().unwrap())
            .collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_top_k_stable_ties() {
        let df = df!(
            "category" => &["b", "a", "c"],
            "amount" => &[1i64, 1, 1],
        )
        .unwrap();
        let out = top_k(&df, "amount", "category", 3, Aggregation::Sum, &ExplorerConfig::default());
        let cats: Vec<_> = out
            .success()
            .unwrap()
            .table
            .iter()
            .map(|r| r["category"].clone())
            .collect();
        assert_eq!(cats, vec![json!("b"), json!("a"), json!("c")]);
    }

    #[test]
    fn test_top_k_resolves_terms() {
        let out = top_k(&sales(), "revenue", "Region", 5, Aggregation::Sum, &ExplorerConfig::default());
        let used = &out.success().unwrap().used;
        assert_eq!(used.metric, "total_sales");
        assert_eq!(used.group_by, "region");
    }

    #[test]
    fn test_top_k_non_numeric_metric() {
        let out = top_k(&sales(), "customer_name", "region", 5, Aggregation::Sum, &ExplorerConfig::default());
        let failure = out.failure().unwrap();
        assert_eq!(failure.code, "NON_NUMERIC_COLUMN");
        assert_eq!(failure.candidates, vec!["total_sales".to_string()]);
        assert!(!failure.suggestions.is_empty());
    }

    #[test]
    fn test_top_k_unknown_group() {
        let out = top_k(&sales(), "total_sales", "zzzz", 5, Aggregation::Sum, &ExplorerConfig::default());
        let failure = out.failure().unwrap();
        assert_eq!(failure.code, "COLUMN_NOT_FOUND");
        assert!(!failure.suggestions.is_empty());
    }
}
