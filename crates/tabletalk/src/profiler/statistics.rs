//! Descriptive statistics for the describe tool.

use crate::types::ColumnDescription;
use crate::utils::{DtypeCategory, get_dtype_category, numeric_values};
use anyhow::Result;
use polars::prelude::*;
use std::collections::HashMap;

/// Describe a single column: counts plus dtype-specific statistics.
pub(crate) fn describe_column(series: &Series) -> Result<ColumnDescription> {
    let null_count = series.null_count();
    let mut description = ColumnDescription {
        name: series.name().to_string(),
        dtype: format!("{}", series.dtype()),
        count: series.len() - null_count,
        null_count,
        ..Default::default()
    };

    match get_dtype_category(series.dtype()) {
        DtypeCategory::Numeric => {
            let mut values = numeric_values(series)?;
            if !values.is_empty() {
                values.sort_by(|a, b| a.total_cmp(b));
                description.mean = Some(mean(&values));
                description.std = Some(calculate_std(&values));
                description.min = values.first().copied();
                description.p25 = Some(quantile(&values, 0.25));
                description.median = Some(quantile(&values, 0.5));
                description.p75 = Some(quantile(&values, 0.75));
                description.max = values.last().copied();
            }
        }
        DtypeCategory::Datetime => {
            let sorted = series.drop_nulls().sort(SortOptions::default())?;
            if !sorted.is_empty() {
                description.earliest = Some(format!("{}", sorted.get(0)?));
                description.latest = Some(format!("{}", sorted.get(sorted.len() - 1)?));
            }
        }
        DtypeCategory::Text | DtypeCategory::Boolean | DtypeCategory::Other => {
            let (unique, top) = value_frequencies(series)?;
            description.unique = Some(unique);
            if let Some((value, freq)) = top {
                description.top = Some(value);
                description.freq = Some(freq);
            }
        }
    }

    Ok(description)
}

/// Distinct non-null count and the most frequent value with its count.
///
/// Ties go to the value seen first.
pub(crate) fn value_frequencies(series: &Series) -> Result<(usize, Option<(String, usize)>)> {
    let as_text = series.drop_nulls().cast(&DataType::String)?;
    let chunked = as_text.str()?;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for value in chunked.into_iter().flatten() {
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            first_seen.push(value);
        }
        *count += 1;
    }

    let mut top: Option<(&str, usize)> = None;
    for value in &first_seen {
        let count = counts[value];
        if top.is_none_or(|(_, best)| count > best) {
            top = Some((value, count));
        }
    }

    Ok((
        first_seen.len(),
        top.map(|(value, count)| (value.to_string(), count)),
    ))
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn calculate_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n <= 1.0 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Linear-interpolated quantile over already sorted values.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_std_basic() {
        // Variance = 10 / 4 = 2.5
        let std = calculate_std(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((std - 2.5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_std_single_value() {
        assert_eq!(calculate_std(&[5.0]), 0.0);
        assert_eq!(calculate_std(&[]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 1.0), 4.0);
    }

    #[test]
    fn test_describe_numeric_column() {
        let series = Series::new("price".into(), &[Some(10.0f64), None, Some(30.0), Some(20.0)]);
        let d = describe_column(&series).unwrap();

        assert_eq!(d.count, 3);
        assert_eq!(d.null_count, 1);
        assert_eq!(d.mean, Some(20.0));
        assert_eq!(d.min, Some(10.0));
        assert_eq!(d.median, Some(20.0));
        assert_eq!(d.max, Some(30.0));
        assert!(d.unique.is_none());
    }

    #[test]
    fn test_describe_text_column() {
        let series = Series::new("region".into(), &["West", "East", "West", "North"]);
        let d = describe_column(&series).unwrap();

        assert_eq!(d.count, 4);
        assert_eq!(d.unique, Some(3));
        assert_eq!(d.top.as_deref(), Some("West"));
        assert_eq!(d.freq, Some(2));
        assert!(d.mean.is_none());
    }

    #[test]
    fn test_value_frequencies_tie_goes_to_first_seen() {
        let series = Series::new("c".into(), &["b", "a", "a", "b"]);
        let (unique, top) = value_frequencies(&series).unwrap();
        assert_eq!(unique, 2);
        assert_eq!(top, Some(("b".to_string(), 2)));
    }

    #[test]
    fn test_describe_datetime_column() {
        let series = Series::new("order_date".into(), &[86_400_000i64, 0])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let d = describe_column(&series).unwrap();

        assert_eq!(d.count, 2);
        assert!(d.earliest.as_deref().unwrap().starts_with("1970-01-01"));
        assert!(d.latest.as_deref().unwrap().starts_with("1970-01-02"));
    }

    #[test]
    fn test_describe_empty_numeric_column() {
        let series: Series = Series::new("v".into(), Vec::<f64>::new());
        let d = describe_column(&series).unwrap();
        assert_eq!(d.count, 0);
        assert!(d.mean.is_none());
    }
}
