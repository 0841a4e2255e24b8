//! Conversational Data Exploration Library
//!
//! The data-facing half of a chat assistant that answers questions about an
//! uploaded spreadsheet, built on Polars.
//!
//! # Overview
//!
//! - **Ingestion**: CSV with an Excel fallback, canonical `snake_case`
//!   headers, opportunistic datetime and numeric retyping
//! - **Schema classification**: numeric / datetime / categorical buckets
//! - **Semantic roles**: which column is the customer, sales, region, ...
//! - **Column resolution**: free-text terms ("revenue", "Cust") to real
//!   columns, exact before role before fuzzy
//! - **Analysis tools**: top-k, describe, filter preview, plot specs,
//!   exploration reports; failures come back with concrete next steps
//! - **Sessions**: per-conversation table registry, preferences and history
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabletalk::{Aggregation, ChartKind, DataExplorer, ToolOutcome};
//!
//! let explorer = DataExplorer::builder().build()?;
//! let summary = explorer.ingest(None, &std::fs::read("sales.csv")?, "sales")?;
//! let session = summary.session_id.as_str();
//!
//! // "top customers by revenue"
//! let top = explorer.top_k(session, "revenue", "customer", None, Aggregation::Sum)?;
//!
//! // "show revenue over time"
//! let chart = explorer.plot(session, "order_date", "revenue", ChartKind::Line, None)?;
//!
//! match top {
//!     ToolOutcome::Success(result) => println!("{:?}", result.table),
//!     ToolOutcome::Failure(failure) => println!("{}: {:?}", failure.error, failure.suggestions),
//! }
//! ```
//!
//! # Using the tools directly
//!
//! Every tool is a plain function over a `DataFrame` and can be used
//! without sessions:
//!
//! ```rust,ignore
//! use tabletalk::{ExplorerConfig, analysis, ingest_bytes};
//!
//! let config = ExplorerConfig::default();
//! let (df, _) = ingest_bytes(&bytes, &config)?;
//! let preview = analysis::filter_preview(&df, "total_sales > 100 & region == 'West'", 20, &config);
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use tabletalk::ExplorerConfig;
//!
//! let config = ExplorerConfig::builder()
//!     .resolve_cutoff(0.7)          // Stricter fuzzy matching
//!     .plot_max_points(100)         // Larger charts
//!     .build()?;
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod explorer;
pub mod ingest;
pub mod intent;
pub mod profiler;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ExplorerConfig, ExplorerConfigBuilder};
pub use error::{AnalysisError, FILTER_EXAMPLE, Result as AnalysisResult, ResultExt};
pub use explorer::{DataExplorer, DataExplorerBuilder, X_AXIS_QUESTION};
pub use ingest::{ingest_bytes, normalize_header};
pub use intent::{Intent, detect_intent, remembered_date_column};
pub use profiler::{classify, map_roles, role_for_term};
pub use registry::DatasetRegistry;
pub use resolver::{closest, resolve, similarity};
pub use session::{ChatRole, ChatTurn, Session, SessionHandle, SessionStore};
pub use types::{
    Aggregation, AnalysisSuggestions, AvailableData, ChartKind, ChartSpec, ColumnDescription,
    DescribeResult, ExploreReport, FallbackHelp, FilterPreview, IngestSummary, PlotAggregation,
    PlotResult, PlotUsed, Record, RetypeOutcome, RetypeReport, Role, RoleMap, Schema, ToolFailure,
    ToolOutcome, TopKResult, TopKUsed,
};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
