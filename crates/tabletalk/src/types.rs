//! Serializable data model shared by the profiler, the resolver and the tools.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A JSON record (`column -> value`) as returned by the tools.
pub type Record = Map<String, Value>;

// ============================================================================
// Schema & Roles
// ============================================================================

/// Column names bucketed by how the tools may use them.
///
/// Derived on demand from a table; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub numeric: Vec<String>,
    pub datetime: Vec<String>,
    pub categorical: Vec<String>,
}

impl Schema {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }

    pub fn is_datetime(&self, column: &str) -> bool {
        self.datetime.iter().any(|c| c == column)
    }
}

/// A business concept a column may play.
///
/// Declaration order is the order roles are resolved and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Sales,
    Quantity,
    Region,
    Category,
    Date,
}

impl Role {
    /// All roles in resolution order.
    pub const ALL: [Role; 6] = [
        Role::Customer,
        Role::Sales,
        Role::Quantity,
        Role::Region,
        Role::Category,
        Role::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Sales => "sales",
            Self::Quantity => "quantity",
            Self::Region => "region",
            Self::Category => "category",
            Self::Date => "date",
        }
    }

    /// Label used when listing key columns to a user.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Sales => "Sales/Revenue",
            Self::Quantity => "Quantity",
            Self::Region => "Region",
            Self::Category => "Category",
            Self::Date => "Date",
        }
    }
}

/// Role → column bindings. Unbound roles are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMap(BTreeMap<Role, String>);

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a role unless it is already bound. Returns whether the binding happened.
    pub fn bind(&mut self, role: Role, column: impl Into<String>) -> bool {
        if self.0.contains_key(&role) {
            return false;
        }
        self.0.insert(role, column.into());
        true
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.0.get(&role).map(String::as_str)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains_key(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.0.iter().map(|(role, col)| (*role, col.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Tool outcomes
// ============================================================================

/// Structured failure returned by a tool instead of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub code: String,
    pub error: String,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl From<AnalysisError> for ToolFailure {
    fn from(error: AnalysisError) -> Self {
        Self {
            code: error.error_code().to_string(),
            suggestions: error.suggestions(),
            candidates: error.candidates(),
            error: error.to_string(),
        }
    }
}

/// Result of an analysis tool: either its payload or a failure with next steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutcome<T> {
    Success(T),
    Failure(ToolFailure),
}

impl<T> ToolOutcome<T> {
    /// Wrap a fallible computation, converting the error into a [`ToolFailure`].
    pub fn from_result(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ToolFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

// ============================================================================
// Tool payloads
// ============================================================================

/// Outcome of the per-column retyping pass at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetypeOutcome {
    /// Date-like column parsed as timestamps.
    ParsedDatetime,
    /// Mostly-numeric text column promoted to numeric.
    PromotedNumeric { parsed: usize },
    /// Column was not a candidate for any conversion.
    Ineligible,
    /// Conversion was attempted and abandoned; values are unchanged.
    Rejected { reason: String },
}

/// Retyping decision for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetypeReport {
    pub column: String,
    #[serde(flatten)]
    pub outcome: RetypeOutcome,
}

/// What ingestion reports back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub session_id: String,
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub schema: Schema,
    pub retyped: Vec<RetypeReport>,
}

/// Aggregation used by top-k.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

impl Aggregation {
    /// Anything other than `mean` sums.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("mean") {
            Self::Mean
        } else {
            Self::Sum
        }
    }
}

/// Columns and aggregation a top-k call actually used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKUsed {
    pub metric: String,
    pub group_by: String,
    pub agg: Aggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKResult {
    pub table: Vec<Record>,
    pub used: TopKUsed,
}

/// Descriptive statistics for one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub dtype: String,
    pub count: usize,
    pub null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(rename = "25%", skip_serializing_if = "Option::is_none")]
    pub p25: Option<f64>,
    #[serde(rename = "50%", skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(rename = "75%", skip_serializing_if = "Option::is_none")]
    pub p75: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescribeResult {
    pub table: Vec<ColumnDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterPreview {
    pub rows: Vec<Record>,
    pub count: usize,
}

/// Chart flavour requested by the caller; rendering is external.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Area,
}

impl ChartKind {
    /// Unknown kinds render as a line chart.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Self::Bar,
            "area" => Self::Area,
            _ => Self::Line,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Line => "Line",
            Self::Bar => "Bar",
            Self::Area => "Area",
        }
    }
}

/// Pre-aggregation applied to plot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotAggregation {
    Sum,
    Mean,
    Count,
}

impl PlotAggregation {
    /// Unsupported names mean "no aggregation".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "mean" => Some(Self::Mean),
            "count" => Some(Self::Count),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
        }
    }
}

/// Chart data remembered in the session for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub x: String,
    pub y: String,
    pub kind: ChartKind,
    pub data: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotUsed {
    pub x: String,
    pub y: String,
    pub agg: Option<PlotAggregation>,
    pub kind: ChartKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotResult {
    pub success: String,
    pub table: Vec<Record>,
    pub description: String,
    pub used: PlotUsed,
    pub total_rows: usize,
    #[serde(skip)]
    pub chart: Option<ChartSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExploreReport {
    pub smart_columns: RoleMap,
    pub schema: Schema,
    pub insights: Vec<String>,
    pub key_columns: Vec<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSuggestions {
    pub suggestions: Vec<String>,
    pub smart_columns: RoleMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableData {
    pub columns: Vec<String>,
    pub smart_columns: RoleMap,
    pub shape: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackHelp {
    pub alternatives: Vec<String>,
    pub available_data: AvailableData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_map_serializes_in_role_order() {
        let mut roles = RoleMap::new();
        roles.bind(Role::Date, "order_date");
        roles.bind(Role::Customer, "customer_name");
        let json = serde_json::to_string(&roles).unwrap();
        assert_eq!(
            json,
            r#"{"customer":"customer_name","date":"order_date"}"#
        );
    }

    #[test]
    fn test_role_map_first_binding_wins() {
        let mut roles = RoleMap::new();
        assert!(roles.bind(Role::Sales, "total_sales"));
        assert!(!roles.bind(Role::Sales, "price"));
        assert_eq!(roles.get(Role::Sales), Some("total_sales"));
    }

    #[test]
    fn test_tool_failure_from_error() {
        let failure: ToolFailure = AnalysisError::ColumnNotFound {
            term: "revenue".to_string(),
            candidates: vec!["revenu_total".to_string()],
            available: vec![],
        }
        .into();
        assert_eq!(failure.code, "COLUMN_NOT_FOUND");
        assert_eq!(failure.candidates, vec!["revenu_total".to_string()]);
        assert!(!failure.suggestions.is_empty());
    }

    #[test]
    fn test_tool_outcome_untagged() {
        let outcome: ToolOutcome<FilterPreview> = ToolOutcome::Success(FilterPreview {
            rows: vec![],
            count: 3,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_lenient_parsers() {
        assert_eq!(Aggregation::parse_lenient("MEAN"), Aggregation::Mean);
        assert_eq!(Aggregation::parse_lenient("median"), Aggregation::Sum);
        assert_eq!(ChartKind::parse_lenient("scatter"), ChartKind::Line);
        assert_eq!(ChartKind::parse_lenient("Bar"), ChartKind::Bar);
        assert_eq!(PlotAggregation::parse("count"), Some(PlotAggregation::Count));
        assert_eq!(PlotAggregation::parse("max"), None);
    }

    #[test]
    fn test_retype_report_serialization() {
        let report = RetypeReport {
            column: "amount".to_string(),
            outcome: RetypeOutcome::PromotedNumeric { parsed: 42 },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["column"], "amount");
        assert_eq!(json["outcome"], "promoted_numeric");
        assert_eq!(json["parsed"], 42);
    }
}
