//! Configuration for schema inference, column resolution and the analysis tools.
//!
//! Defaults reproduce the heuristics the tools were tuned with; the builder
//! validates ranges before handing out a config.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds for the exploration layer.
///
/// # Example
///
/// ```rust,ignore
/// use tabletalk::ExplorerConfig;
///
/// let config = ExplorerConfig::builder()
///     .resolve_cutoff(0.7)
///     .preview_limit(50)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Text columns with at most this many distinct values are always categorical.
    /// Default: 50
    pub categorical_min_distinct: usize,

    /// Text columns with at most `ratio × rows` distinct values are categorical.
    /// Default: 0.2
    pub categorical_ratio: f64,

    /// A text column is promoted to numeric only when more than this many values parse.
    /// Default: 10
    pub numeric_promotion_min: usize,

    /// ...and more than `ratio × rows` values parse.
    /// Default: 0.5
    pub numeric_promotion_ratio: f64,

    /// Minimum similarity for a fuzzy column match (0.0 - 1.0).
    /// Default: 0.6
    pub resolve_cutoff: f64,

    /// Minimum similarity for a column to be offered as a suggestion (0.0 - 1.0).
    /// Default: 0.4
    pub suggestion_cutoff: f64,

    /// Maximum number of suggested columns.
    /// Default: 5
    pub max_suggestions: usize,

    /// Rows returned by a filter preview when the caller gives no limit.
    /// Default: 20
    pub preview_limit: usize,

    /// Maximum number of points in a plot spec.
    /// Default: 50
    pub plot_max_points: usize,

    /// Groups returned by top-k when the caller gives no k.
    /// Default: 5
    pub default_top_k: usize,

    /// Rows sampled by the CSV reader for dtype inference.
    /// Default: 1000
    pub csv_infer_schema_rows: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            categorical_min_distinct: 50,
            categorical_ratio: 0.2,
            numeric_promotion_min: 10,
            numeric_promotion_ratio: 0.5,
            resolve_cutoff: 0.6,
            suggestion_cutoff: 0.4,
            max_suggestions: 5,
            preview_limit: 20,
            plot_max_points: 50,
            default_top_k: 5,
            csv_infer_schema_rows: 1000,
        }
    }
}

impl ExplorerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ExplorerConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .map_err(|e| crate::error::AnalysisError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Distinct-count ceiling for a categorical column in a table of `rows` rows.
    pub fn categorical_limit(&self, rows: usize) -> usize {
        self.categorical_min_distinct
            .max((rows as f64 * self.categorical_ratio) as usize)
    }

    /// Parsed-value count a text column must exceed to be promoted to numeric.
    pub fn promotion_threshold(&self, rows: usize) -> usize {
        self.numeric_promotion_min
            .max((rows as f64 * self.numeric_promotion_ratio) as usize)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("categorical_ratio", self.categorical_ratio),
            ("numeric_promotion_ratio", self.numeric_promotion_ratio),
            ("resolve_cutoff", self.resolve_cutoff),
            ("suggestion_cutoff", self.suggestion_cutoff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [
            ("max_suggestions", self.max_suggestions),
            ("plot_max_points", self.plot_max_points),
            ("csv_infer_schema_rows", self.csv_infer_schema_rows),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroLimit(field.to_string()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid limit for '{0}': must be at least 1")]
    ZeroLimit(String),
}

/// Builder for [`ExplorerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ExplorerConfigBuilder {
    categorical_min_distinct: Option<usize>,
    categorical_ratio: Option<f64>,
    numeric_promotion_min: Option<usize>,
    numeric_promotion_ratio: Option<f64>,
    resolve_cutoff: Option<f64>,
    suggestion_cutoff: Option<f64>,
    max_suggestions: Option<usize>,
    preview_limit: Option<usize>,
    plot_max_points: Option<usize>,
    default_top_k: Option<usize>,
    csv_infer_schema_rows: Option<usize>,
}

impl ExplorerConfigBuilder {
    pub fn categorical_min_distinct(mut self, n: usize) -> Self {
        self.categorical_min_distinct = Some(n);
        self
    }

    pub fn categorical_ratio(mut self, ratio: f64) -> Self {
        self.categorical_ratio = Some(ratio);
        self
    }

    pub fn numeric_promotion_min(mut self, n: usize) -> Self {
        self.numeric_promotion_min = Some(n);
        self
    }

    pub fn numeric_promotion_ratio(mut self, ratio: f64) -> Self {
        self.numeric_promotion_ratio = Some(ratio);
        self
    }

    /// Set the acceptance threshold for fuzzy column matches.
    ///
    /// # Arguments
    /// * `cutoff` - Value between 0.0 and 1.0 (e.g., 0.6)
    pub fn resolve_cutoff(mut self, cutoff: f64) -> Self {
        self.resolve_cutoff = Some(cutoff);
        self
    }

    /// Set the looser threshold used when listing candidate columns.
    pub fn suggestion_cutoff(mut self, cutoff: f64) -> Self {
        self.suggestion_cutoff = Some(cutoff);
        self
    }

    pub fn max_suggestions(mut self, n: usize) -> Self {
        self.max_suggestions = Some(n);
        self
    }

    pub fn preview_limit(mut self, n: usize) -> Self {
        self.preview_limit = Some(n);
        self
    }

    pub fn plot_max_points(mut self, n: usize) -> Self {
        self.plot_max_points = Some(n);
        self
    }

    pub fn default_top_k(mut self, k: usize) -> Self {
        self.default_top_k = Some(k);
        self
    }

    pub fn csv_infer_schema_rows(mut self, n: usize) -> Self {
        self.csv_infer_schema_rows = Some(n);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ExplorerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ExplorerConfig, ConfigValidationError> {
        let defaults = ExplorerConfig::default();
        let config = ExplorerConfig {
            categorical_min_distinct: self
                .categorical_min_distinct
                .unwrap_or(defaults.categorical_min_distinct),
            categorical_ratio: self.categorical_ratio.unwrap_or(defaults.categorical_ratio),
            numeric_promotion_min: self
                .numeric_promotion_min
                .unwrap_or(defaults.numeric_promotion_min),
            numeric_promotion_ratio: self
                .numeric_promotion_ratio
                .unwrap_or(defaults.numeric_promotion_ratio),
            resolve_cutoff: self.resolve_cutoff.unwrap_or(defaults.resolve_cutoff),
            suggestion_cutoff: self.suggestion_cutoff.unwrap_or(defaults.suggestion_cutoff),
            max_suggestions: self.max_suggestions.unwrap_or(defaults.max_suggestions),
            preview_limit: self.preview_limit.unwrap_or(defaults.preview_limit),
            plot_max_points: self.plot_max_points.unwrap_or(defaults.plot_max_points),
            default_top_k: self.default_top_k.unwrap_or(defaults.default_top_k),
            csv_infer_schema_rows: self
                .csv_infer_schema_rows
                .unwrap_or(defaults.csv_infer_schema_rows),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExplorerConfig::default();
        assert_eq!(config.resolve_cutoff, 0.6);
        assert_eq!(config.suggestion_cutoff, 0.4);
        assert_eq!(config.max_suggestions, 5);
        assert_eq!(config.preview_limit, 20);
        assert_eq!(config.plot_max_points, 50);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = ExplorerConfig::builder().build().unwrap();
        assert_eq!(config, ExplorerConfig::default());
    }

    #[test]
    fn test_categorical_limit() {
        let config = ExplorerConfig::default();
        assert_eq!(config.categorical_limit(100), 50);
        assert_eq!(config.categorical_limit(1000), 200);
        assert_eq!(config.categorical_limit(0), 50);
    }

    #[test]
    fn test_promotion_threshold() {
        let config = ExplorerConfig::default();
        assert_eq!(config.promotion_threshold(10), 10);
        assert_eq!(config.promotion_threshold(20), 10);
        assert_eq!(config.promotion_threshold(100), 50);
        assert_eq!(config.promotion_threshold(101), 50);
    }

    #[test]
    fn test_validation_invalid_cutoff() {
        let result = ExplorerConfig::builder().resolve_cutoff(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_zero_suggestions() {
        let result = ExplorerConfig::builder().max_suggestions(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroLimit(_)
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExplorerConfig =
            serde_json::from_str(r#"{ "preview_limit": 5, "resolve_cutoff": 0.8 }"#).unwrap();
        assert_eq!(config.preview_limit, 5);
        assert_eq!(config.resolve_cutoff, 0.8);
        assert_eq!(config.max_suggestions, 5);
    }
}
