//! Presentation helpers: exploration report, analysis ideas, recovery hints.
//!
//! These compose the schema, the role map and a few summary numbers into
//! human-readable strings. They never fail; a statistic that cannot be
//! computed is simply left out.

use crate::config::ExplorerConfig;
use crate::profiler::{classify, describe_column, map_roles};
use crate::types::{
    AnalysisSuggestions, AvailableData, ExploreReport, FallbackHelp, Role, RoleMap, Schema,
};
use crate::utils::{column_names, numeric_values};
use polars::prelude::*;
use tracing::debug;

/// Identify key business columns and summarise the table.
pub fn smart_explore(df: &DataFrame, config: &ExplorerConfig) -> ExploreReport {
    let columns = column_names(df);
    let roles = map_roles(&columns, "explore");
    let schema = classify(df, config);

    let mut insights = vec![
        format!(
            "Dataset has {} rows and {} columns.",
            df.height(),
            df.width()
        ),
        format!(
            "Columns by type: {} numeric, {} datetime, {} categorical.",
            schema.numeric.len(),
            schema.datetime.len(),
            schema.categorical.len()
        ),
    ];
    insights.extend(date_span_insight(df, &roles, &schema));
    insights.extend(sales_total_insight(df, &roles, &schema));

    let key_columns = roles
        .iter()
        .map(|(role, col)| format!("{} column: {}", role.display_name(), col))
        .collect();

    ExploreReport {
        smart_columns: roles,
        schema,
        insights,
        key_columns,
        columns,
    }
}

fn date_span_insight(df: &DataFrame, roles: &RoleMap, schema: &Schema) -> Option<String> {
    let date_col = roles.get(Role::Date).filter(|c| schema.is_datetime(c))?;
    let series = df.column(date_col).ok()?.as_materialized_series();
    match describe_column(series) {
        Ok(d) => Some(format!(
            "{} spans {} to {}.",
            date_col,
            d.earliest?,
            d.latest?
        )),
        Err(e) => {
            debug!("Skipping date span for '{}': {}", date_col, e);
            None
        }
    }
}

fn sales_total_insight(df: &DataFrame, roles: &RoleMap, schema: &Schema) -> Option<String> {
    let sales_col = roles.get(Role::Sales).filter(|c| schema.is_numeric(c))?;
    let series = df.column(sales_col).ok()?.as_materialized_series();
    match numeric_values(series) {
        Ok(values) => Some(format!(
            "Total {}: {:.2}.",
            sales_col,
            values.iter().sum::<f64>()
        )),
        Err(e) => {
            debug!("Skipping total for '{}': {}", sales_col, e);
            None
        }
    }
}

/// Concrete analysis ideas for a vague request.
pub fn suggest_analysis(df: &DataFrame, config: &ExplorerConfig) -> AnalysisSuggestions {
    let columns = column_names(df);
    let roles = map_roles(&columns, "suggest");
    let schema = classify(df, config);

    let mut suggestions = Vec::new();
    let has_sales = roles.contains(Role::Sales);

    if has_sales && roles.contains(Role::Customer) {
        suggestions.push("Top customers by sales/revenue".to_string());
    }
    if has_sales && roles.contains(Role::Category) {
        suggestions.push("Sales breakdown by category/product type".to_string());
    }
    if has_sales && roles.contains(Role::Region) {
        suggestions.push("Regional sales analysis".to_string());
    }
    if has_sales && roles.contains(Role::Date) {
        suggestions.push("Sales trends over time".to_string());
    }
    if !schema.numeric.is_empty() {
        suggestions.push(format!(
            "Statistical summary of key metrics like {}",
            schema.numeric.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if !schema.categorical.is_empty() {
        suggestions.push(format!(
            "Distribution analysis of {}",
            schema.categorical.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if suggestions.is_empty() {
        suggestions.push("Try 'describe the data' to see the data structure".to_string());
    }

    AnalysisSuggestions {
        suggestions,
        smart_columns: roles,
    }
}

/// Alternatives to offer after a tool failed.
///
/// `error_context` is matched case-insensitively for `column`, `plot`/`chart`
/// and `filter`; the three generic hints are always included.
pub fn fallback_help(df: &DataFrame, error_context: &str, config: &ExplorerConfig) -> FallbackHelp {
    let columns = column_names(df);
    let roles = map_roles(&columns, "fallback");
    let context = error_context.to_lowercase();

    let mut alternatives = Vec::new();

    if context.contains("column") {
        alternatives.push(format!("Available columns: {}", columns.join(", ")));
        if !roles.is_empty() {
            let found: Vec<String> = roles
                .iter()
                .map(|(role, col)| format!("{}={}", role.as_str(), col))
                .collect();
            alternatives.push(format!("Key business columns found: {}", found.join(", ")));
        }
    }

    if context.contains("plot") || context.contains("chart") {
        let numeric = classify(df, config).numeric;
        if !numeric.is_empty() {
            alternatives.push(format!(
                "Try plotting these numeric columns: {}",
                numeric.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    if context.contains("filter") {
        alternatives
            .push("Try basic filters like: column_name > value or column_name == 'text'".to_string());
    }

    alternatives.extend([
        "Try 'describe the data' to see data structure".to_string(),
        "Ask for 'top 10 rows' to see sample data".to_string(),
        "Request 'data summary' for key statistics".to_string(),
    ]);

    FallbackHelp {
        alternatives,
        available_data: AvailableData {
            shape: format!("{} rows × {} columns", df.height(), df.width()),
            columns,
            smart_columns: roles,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_timestamp_millis;
    use pretty_assertions::assert_eq;

    fn orders() -> DataFrame {
        let dates = Series::new(
            "order_date".into(),
            &[
                parse_timestamp_millis("2024-01-01").unwrap(),
                parse_timestamp_millis("2024-03-31").unwrap(),
            ],
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
        let mut df = df!(
            "customer_name" => &["Acme", "Globex"],
            "total_sales" => &[100.0f64, 50.5],
            "region" => &["West", "East"],
        )
        .unwrap();
        df.with_column(dates).unwrap();
        df
    }

    #[test]
    fn test_smart_explore() {
        let report = smart_explore(&orders(), &ExplorerConfig::default());

        assert_eq!(report.insights[0], "Dataset has 2 rows and 4 columns.");
        assert_eq!(
            report.insights[1],
            "Columns by type: 1 numeric, 1 datetime, 2 categorical."
        );
        assert!(report.insights.iter().any(|i| i.starts_with("order_date spans 2024-01-01")));
        assert!(report.insights.contains(&"Total total_sales: 150.50.".to_string()));
        assert_eq!(
            report.key_columns,
            vec![
                "Customer column: customer_name".to_string(),
                "Sales/Revenue column: total_sales".to_string(),
                "Region column: region".to_string(),
                "Date column: order_date".to_string(),
            ]
        );
        assert_eq!(report.columns.len(), 4);
    }

    #[test]
    fn test_suggest_analysis() {
        let out = suggest_analysis(&orders(), &ExplorerConfig::default());
        assert_eq!(
            out.suggestions,
            vec![
                "Top customers by sales/revenue".to_string(),
                "Regional sales analysis".to_string(),
                "Sales trends over time".to_string(),
                "Statistical summary of key metrics like total_sales".to_string(),
                "Distribution analysis of customer_name, region".to_string(),
            ]
        );
    }

    #[test]
    fn test_suggest_analysis_never_empty() {
        let ids: Vec<String> = (0..60).map(|i| format!("id-{i}")).collect();
        let df = df!("opaque" => ids).unwrap();
        let out = suggest_analysis(&df, &ExplorerConfig::default());
        assert_eq!(out.suggestions.len(), 1);
        assert!(out.suggestions[0].contains("describe"));
    }

    #[test]
    fn test_fallback_help_contexts() {
        let help = fallback_help(&orders(), "Column not found while trying to plot", &ExplorerConfig::default());

        assert!(help.alternatives[0].starts_with("Available columns: customer_name"));
        assert!(help.alternatives[1].contains("sales=total_sales"));
        assert!(help.alternatives[2].contains("total_sales"));
        assert_eq!(help.alternatives.len(), 6);
        assert_eq!(help.available_data.shape, "2 rows × 4 columns");
    }

    #[test]
    fn test_fallback_help_generic_only() {
        let help = fallback_help(&orders(), "something odd", &ExplorerConfig::default());
        assert_eq!(help.alternatives.len(), 3);
    }
}
