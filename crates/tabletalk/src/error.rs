//! Error types for the data exploration layer.
//!
//! Only ingestion and registry access surface these errors to the caller.
//! The analysis tools convert them into [`ToolFailure`](crate::types::ToolFailure)
//! values carrying user-facing suggestions.
//!
//! Errors are serializable so a host (HTTP layer, agent runtime) can forward
//! them to a client unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Example expression shown whenever a filter cannot be used.
pub const FILTER_EXAMPLE: &str = "col_a > 10 & col_b == 'X'";

/// The main error type for the exploration layer.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The uploaded bytes could not be read as CSV nor as an Excel workbook.
    #[error("Could not read the file as CSV or Excel: {0}")]
    Ingestion(String),

    /// The session registry has no table to operate on.
    #[error("No active dataset. Upload a CSV first.")]
    NoActiveDataset,

    /// A free-text column reference did not resolve to any column.
    #[error("Column '{term}' not found")]
    ColumnNotFound {
        term: String,
        candidates: Vec<String>,
        available: Vec<String>,
    },

    /// An aggregation was requested on a column that is not numeric.
    #[error("Column '{column}' is not numeric")]
    NonNumericColumn {
        column: String,
        numeric_candidates: Vec<String>,
    },

    /// A filter expression was rejected or failed to evaluate.
    #[error("Bad filter: {reason}")]
    InvalidFilterExpression {
        reason: String,
        example: String,
        candidates: Vec<String>,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build an [`AnalysisError::InvalidFilterExpression`] with the stock example.
    pub fn invalid_filter(reason: impl Into<String>, candidates: Vec<String>) -> Self {
        AnalysisError::InvalidFilterExpression {
            reason: reason.into(),
            example: FILTER_EXAMPLE.to_string(),
            candidates,
        }
    }

    /// Get error code for client-side handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ingestion(_) => "INGESTION_ERROR",
            Self::NoActiveDataset => "NO_ACTIVE_DATASET",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::InvalidFilterExpression { .. } => "INVALID_FILTER_EXPRESSION",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Concrete next steps for the user.
    ///
    /// Never empty: every error a user can see names at least one column,
    /// an example expression or a generic recovery step.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Ingestion(_) => vec![
                "Upload a comma-separated text file with a header row".to_string(),
                "Or upload an .xlsx/.xls workbook; only the first sheet is read".to_string(),
            ],
            Self::NoActiveDataset => vec!["Upload a CSV or Excel file first".to_string()],
            Self::ColumnNotFound {
                candidates,
                available,
                ..
            } => {
                if !candidates.is_empty() {
                    vec![format!("Did you mean: {}", candidates.join(", "))]
                } else if !available.is_empty() {
                    vec![format!(
                        "Pick one of the available columns: {}",
                        available.iter().take(10).cloned().collect::<Vec<_>>().join(", ")
                    )]
                } else {
                    vec!["The dataset has no columns; upload a different file".to_string()]
                }
            }
            Self::NonNumericColumn {
                numeric_candidates,
                ..
            } => {
                if numeric_candidates.is_empty() {
                    vec!["The dataset has no numeric columns; try a count or describe instead"
                        .to_string()]
                } else {
                    vec![format!(
                        "Use a numeric column such as: {}",
                        numeric_candidates.join(", ")
                    )]
                }
            }
            Self::InvalidFilterExpression {
                example,
                candidates,
                ..
            } => {
                let mut out = Vec::with_capacity(2);
                if !candidates.is_empty() {
                    out.push(format!(
                        "pick a valid column like: {}",
                        candidates.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
                    ));
                }
                out.push(format!("example: {example}"));
                out
            }
            Self::WithContext { source, .. } => source.suggestions(),
            _ => vec!["Try 'describe the data' to see the data structure".to_string()],
        }
    }

    /// Candidate column names attached to the error, if any.
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Self::ColumnNotFound { candidates, .. } => candidates.clone(),
            Self::NonNumericColumn {
                numeric_candidates, ..
            } => numeric_candidates.clone(),
            Self::InvalidFilterExpression { candidates, .. } => candidates.clone(),
            Self::WithContext { source, .. } => source.candidates(),
            _ => Vec::new(),
        }
    }

    /// Check if this error is recoverable by the user (rephrasing, picking a column, uploading).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Ingestion(_)
            | Self::NoActiveDataset
            | Self::ColumnNotFound { .. }
            | Self::NonNumericColumn { .. }
            | Self::InvalidFilterExpression { .. } => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for exploration operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}
