//! The session-aware entry point a chat host calls.
//!
//! [`DataExplorer`] ties the [`SessionStore`] to the analysis tools: it
//! looks up the session, takes its lock, fetches the active table and hands
//! it to the tool. Only ingestion and registry access produce `Err`; tool
//! failures come back as [`ToolOutcome::Failure`].

use crate::analysis;
use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::ingest::{ingest_bytes, is_date_like_name};
use crate::intent::{Intent, detect_intent, remembered_date_column};
use crate::profiler::{classify, map_roles};
use crate::resolver;
use crate::session::{ChatRole, PREF_DATE_COLUMN, PREF_LAST_CHART, SessionStore};
use crate::types::{
    Aggregation, AnalysisSuggestions, ChartKind, ChartSpec, DescribeResult, ExploreReport,
    FallbackHelp, FilterPreview, IngestSummary, PlotAggregation, PlotResult, RoleMap, Schema,
    ToolOutcome, TopKResult,
};
use crate::utils::column_names;
use polars::prelude::DataFrame;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Asked when a chart is requested but no column looks like a date.
pub const X_AXIS_QUESTION: &str = "Which column should be used on the x-axis? (Provide any column name)";

/// Session-aware facade over the analysis tools.
///
/// Use [`DataExplorer::builder()`] to share a store or override the config.
///
/// # Example
///
/// ```rust,ignore
/// use tabletalk::{Aggregation, DataExplorer};
///
/// let explorer = DataExplorer::builder().build()?;
/// let summary = explorer.ingest(None, &std::fs::read("sales.csv")?, "sales")?;
///
/// let top = explorer.top_k(&summary.session_id, "revenue", "customer", None, Aggregation::Sum)?;
/// println!("{}", serde_json::to_string_pretty(&top)?);
/// ```
#[derive(Debug, Clone)]
pub struct DataExplorer {
    store: Arc<SessionStore>,
    config: ExplorerConfig,
}

static_assertions::assert_impl_all!(DataExplorer: Send, Sync);

impl DataExplorer {
    pub fn builder() -> DataExplorerBuilder {
        DataExplorerBuilder::default()
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Parse an upload and make it the session's active table.
    ///
    /// With `session_id` absent (or blank) a new session is created; its id
    /// is returned in the summary. Re-ingesting under the same name
    /// replaces the previous table.
    pub fn ingest(
        &self,
        session_id: Option<&str>,
        bytes: &[u8],
        name: &str,
    ) -> Result<IngestSummary> {
        let session_id = self.store.ensure(session_id);
        let (df, retyped) = ingest_bytes(bytes, &self.config)?;

        let summary = IngestSummary {
            session_id: session_id.clone(),
            name: name.to_string(),
            rows: df.height(),
            columns: column_names(&df),
            schema: classify(&df, &self.config),
            retyped,
        };

        let handle = self.store.get_or_create(&session_id);
        handle.lock().registry.put(name, df);
        info!("Session {}: '{}' is now the active table", session_id, name);
        Ok(summary)
    }

    pub fn smart_explore(&self, session_id: &str) -> Result<ExploreReport> {
        self.with_table(session_id, |df| {
            analysis::smart_explore(df, &self.config)
        })
    }

    pub fn describe(
        &self,
        session_id: &str,
        columns: &[String],
    ) -> Result<ToolOutcome<DescribeResult>> {
        self.with_table(session_id, |df| {
            analysis::describe(df, columns, &self.config)
        })
    }

    /// Top groups of `group_by` by `metric`; `k` defaults to the configured value.
    pub fn top_k(
        &self,
        session_id: &str,
        metric: &str,
        group_by: &str,
        k: Option<usize>,
        agg: Aggregation,
    ) -> Result<ToolOutcome<TopKResult>> {
        let k = k.unwrap_or(self.config.default_top_k);
        self.with_table(session_id, |df| {
            analysis::top_k(df, metric, group_by, k, agg, &self.config)
        })
    }

    pub fn filter_preview(
        &self,
        session_id: &str,
        expression: &str,
        limit: Option<usize>,
    ) -> Result<ToolOutcome<FilterPreview>> {
        let limit = limit.unwrap_or(self.config.preview_limit);
        self.with_table(session_id, |df| {
            analysis::filter_preview(df, expression, limit, &self.config)
        })
    }

    /// Build a chart and remember it as the session's last chart.
    ///
    /// A blank `x` falls back to the date column the user asked to use.
    pub fn plot(
        &self,
        session_id: &str,
        x: &str,
        y: &str,
        kind: ChartKind,
        agg: Option<PlotAggregation>,
    ) -> Result<ToolOutcome<PlotResult>> {
        let handle = self
            .store
            .get(session_id)
            .ok_or(AnalysisError::NoActiveDataset)?;
        let mut session = handle.lock();

        let x = match session.date_column() {
            Some(date_col) if x.trim().is_empty() => {
                debug!("Using remembered date column '{}' for x", date_col);
                date_col.to_string()
            }
            _ => x.to_string(),
        };

        let df = session.registry.get(None)?;
        let outcome = analysis::plot(df, &x, y, kind, agg, &self.config);

        if let ToolOutcome::Success(result) = &outcome
            && let Some(chart) = &result.chart
        {
            session.remember(PREF_LAST_CHART, serde_json::to_value(chart)?);
        }
        Ok(outcome)
    }

    pub fn suggest_analysis(&self, session_id: &str) -> Result<AnalysisSuggestions> {
        self.with_table(session_id, |df| {
            analysis::suggest_analysis(df, &self.config)
        })
    }

    pub fn fallback_help(&self, session_id: &str, error_context: &str) -> Result<FallbackHelp> {
        self.with_table(session_id, |df| {
            analysis::fallback_help(df, error_context, &self.config)
        })
    }

    pub fn schema(&self, session_id: &str) -> Result<Schema> {
        self.with_table(session_id, |df| classify(df, &self.config))
    }

    pub fn roles(&self, session_id: &str) -> Result<RoleMap> {
        self.with_table(session_id, |df| map_roles(&column_names(df), "roles"))
    }

    /// Resolve a user term against the active table's columns.
    pub fn resolve(&self, session_id: &str, term: &str) -> Result<Option<String>> {
        self.with_table(session_id, |df| {
            resolver::resolve(&column_names(df), term, &self.config)
        })
    }

    /// Record a user message and react to the hints it carries.
    ///
    /// Remembers a date column the user names ("use order_date as the
    /// date"). Returns a clarifying question when a chart is requested but
    /// the active table has no date- or time-like column.
    pub fn observe_message(&self, session_id: &str, text: &str) -> Result<Option<String>> {
        let handle = self.store.get_or_create(session_id);
        let mut session = handle.lock();
        session.record(ChatRole::User, text);

        if let Some(date_col) = remembered_date_column(text) {
            debug!("Session {}: remembering date column '{}'", session_id, date_col);
            session.remember(PREF_DATE_COLUMN, Value::String(date_col));
        }

        if detect_intent(text) != Intent::Plot {
            return Ok(None);
        }
        let Ok(df) = session.registry.get(None) else {
            return Ok(None);
        };
        if df
            .get_column_names()
            .iter()
            .any(|name| is_date_like_name(name.as_str()))
        {
            return Ok(None);
        }

        session.record(ChatRole::Assistant, X_AXIS_QUESTION);
        Ok(Some(X_AXIS_QUESTION.to_string()))
    }

    /// Return the last chart built in the session and clear it.
    pub fn take_last_chart(&self, session_id: &str) -> Result<Option<ChartSpec>> {
        let Some(handle) = self.store.get(session_id) else {
            return Ok(None);
        };
        let value = handle.lock().forget(PREF_LAST_CHART);
        value
            .map(serde_json::from_value)
            .transpose()
            .map_err(AnalysisError::from)
    }

    /// Drop every table, preference and message of the session.
    pub fn reset(&self, session_id: &str) {
        self.store.reset(session_id);
    }

    /// Run `f` on the session's active table while holding the session lock.
    fn with_table<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&DataFrame) -> T,
    ) -> Result<T> {
        let handle = self
            .store
            .get(session_id)
            .ok_or(AnalysisError::NoActiveDataset)?;
        let session = handle.lock();
        let df = session.registry.get(None)?;
        Ok(f(df))
    }
}

/// Builder for [`DataExplorer`].
#[derive(Debug, Default)]
pub struct DataExplorerBuilder {
    store: Option<Arc<SessionStore>>,
    config: Option<ExplorerConfig>,
}

impl DataExplorerBuilder {
    /// Share an existing session store, e.g. between several hosts.
    pub fn store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: ExplorerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the config and build the explorer.
    pub fn build(self) -> Result<DataExplorer> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        Ok(DataExplorer {
            store: self.store.unwrap_or_default(),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CSV: &[u8] = b"Customer Name,Total Sales,Region\nAcme,100,West\nGlobex,50,East\nAcme,25,West\n";

    fn explorer_with_data() -> (DataExplorer, String) {
        let explorer = DataExplorer::builder().build().unwrap();
        let summary = explorer.ingest(None, CSV, "sales").unwrap();
        (explorer, summary.session_id)
    }

    #[test]
    fn test_ingest_creates_session() {
        let (explorer, id) = explorer_with_data();
        assert!(explorer.store().contains(&id));
        let schema = explorer.schema(&id).unwrap();
        assert_eq!(schema.numeric, vec!["total_sales".to_string()]);
    }

    #[test]
    fn test_unknown_session_has_no_dataset() {
        let explorer = DataExplorer::builder().build().unwrap();
        let err = explorer.smart_explore("nope").unwrap_err();
        assert!(matches!(err, AnalysisError::NoActiveDataset));
    }

    #[test]
    fn test_plot_remembers_and_take_clears() {
        let (explorer, id) = explorer_with_data();
        let out = explorer
            .plot(&id, "region", "total_sales", ChartKind::Bar, Some(PlotAggregation::Sum))
            .unwrap();
        assert!(out.is_success());

        let chart = explorer.take_last_chart(&id).unwrap().unwrap();
        assert_eq!(chart.x, "region");
        assert_eq!(chart.data.len(), 2);
        assert!(explorer.take_last_chart(&id).unwrap().is_none());
    }

    #[test]
    fn test_blank_x_uses_remembered_date_column() {
        let explorer = DataExplorer::builder().build().unwrap();
        let csv = b"order_date,amount\n2024-01-01,5\n2024-01-02,7\n";
        let id = explorer.ingest(None, csv, "orders").unwrap().session_id;

        explorer.observe_message(&id, "use order_date as the date").unwrap();
        // The remembered token is "date", which resolves through the date role.
        let out = explorer
            .plot(&id, " ", "amount", ChartKind::Line, None)
            .unwrap();
        assert_eq!(out.success().unwrap().used.x, "order_date");
    }

    #[test]
    fn test_observe_message_asks_for_x_axis() {
        let (explorer, id) = explorer_with_data();
        let question = explorer.observe_message(&id, "plot sales").unwrap();
        assert_eq!(question.as_deref(), Some(X_AXIS_QUESTION));

        let session = explorer.store().get(&id).unwrap();
        assert_eq!(session.lock().history().len(), 2);
    }

    #[test]
    fn test_observe_message_no_question_with_date_column() {
        let explorer = DataExplorer::builder().build().unwrap();
        let id = explorer
            .ingest(None, b"order_date,amount\n2024-01-01,5\n", "orders")
            .unwrap()
            .session_id;
        assert_eq!(explorer.observe_message(&id, "plot amount").unwrap(), None);
    }

    #[test]
    fn test_reset_drops_tables() {
        let (explorer, id) = explorer_with_data();
        explorer.reset(&id);
        assert!(matches!(
            explorer.roles(&id).unwrap_err(),
            AnalysisError::NoActiveDataset
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = ExplorerConfig {
            resolve_cutoff: 1.5,
            ..ExplorerConfig::default()
        };
        assert!(DataExplorer::builder().config(config).build().is_err());
    }
}
