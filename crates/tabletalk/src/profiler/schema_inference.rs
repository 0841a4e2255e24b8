//! Schema classification: numeric / datetime / categorical buckets.

use crate::config::ExplorerConfig;
use crate::types::Schema;
use crate::utils::{DtypeCategory, get_dtype_category};
use polars::prelude::*;
use tracing::debug;

/// Classify every column of `df` into the schema buckets.
///
/// Numeric and datetime columns are taken from their dtype. Text and boolean
/// columns are categorical only when their distinct non-null count stays
/// within [`ExplorerConfig::categorical_limit`]; anything with more distinct
/// values (free-form ids, comments) is left out of every bucket.
pub fn classify(df: &DataFrame, config: &ExplorerConfig) -> Schema {
    let mut schema = Schema::default();
    let limit = config.categorical_limit(df.height());

    for col in df.get_columns() {
        let name = col.name().to_string();
        match get_dtype_category(col.dtype()) {
            DtypeCategory::Numeric => schema.numeric.push(name),
            DtypeCategory::Datetime => schema.datetime.push(name),
            DtypeCategory::Text | DtypeCategory::Boolean => {
                match distinct_non_null(col.as_materialized_series()) {
                    Ok(distinct) if distinct <= limit => schema.categorical.push(name),
                    Ok(distinct) => {
                        debug!(
                            "Column '{}' left unclassified: {} distinct values > {}",
                            name, distinct, limit
                        );
                    }
                    Err(e) => {
                        debug!("Column '{}' skipped during classification: {}", name, e);
                    }
                }
            }
            DtypeCategory::Other => {
                debug!("Column '{}' has unsupported dtype {:?}", name, col.dtype());
            }
        }
    }

    schema
}

/// Distinct count ignoring nulls.
fn distinct_non_null(series: &Series) -> PolarsResult<usize> {
    series.drop_nulls().n_unique()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_by_dtype() {
        let df = df!(
            "sales" => &[1.0f64, 2.0, 3.0],
            "qty" => &[1i64, 2, 3],
            "region" => &["West", "East", "West"],
        )
        .unwrap();

        let schema = classify(&df, &ExplorerConfig::default());
        assert_eq!(schema.numeric, vec!["sales".to_string(), "qty".to_string()]);
        assert!(schema.datetime.is_empty());
        assert_eq!(schema.categorical, vec!["region".to_string()]);
    }

    #[test]
    fn test_datetime_column_bucket() {
        let series = Series::new("order_date".into(), &[0i64, 86_400_000])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();

        let schema = classify(&df, &ExplorerConfig::default());
        assert_eq!(schema.datetime, vec!["order_date".to_string()]);
    }

    #[test]
    fn test_high_cardinality_text_is_unclassified() {
        // 60 distinct ids over 60 rows: limit is max(50, 12) = 50
        let ids: Vec<String> = (0..60).map(|i| format!("id-{i}")).collect();
        let regions: Vec<&str> = (0..60).map(|i| if i % 2 == 0 { "West" } else { "East" }).collect();
        let df = df!("order_id" => ids, "region" => regions).unwrap();

        let schema = classify(&df, &ExplorerConfig::default());
        assert_eq!(schema.categorical, vec!["region".to_string()]);
        assert!(!schema.numeric.contains(&"order_id".to_string()));
    }

    #[test]
    fn test_cardinality_limit_scales_with_rows() {
        // 300 rows, 60 distinct values: limit is max(50, 60) = 60
        let values: Vec<String> = (0..300).map(|i| format!("city-{}", i % 60)).collect();
        let df = df!("city" => values).unwrap();

        let schema = classify(&df, &ExplorerConfig::default());
        assert_eq!(schema.categorical, vec!["city".to_string()]);
    }

    #[test]
    fn test_nulls_do_not_count_as_distinct() {
        let mut values: Vec<Option<String>> = (0..50).map(|i| Some(format!("v{i}"))).collect();
        values.push(None);
        let df = df!("label" => values).unwrap();

        let schema = classify(&df, &ExplorerConfig::default());
        assert_eq!(schema.categorical, vec!["label".to_string()]);
    }

    #[test]
    fn test_boolean_is_categorical() {
        let df = df!("is_active" => &[true, false, true]).unwrap();
        let schema = classify(&df, &ExplorerConfig::default());
        assert_eq!(schema.categorical, vec!["is_active".to_string()]);
    }
}
