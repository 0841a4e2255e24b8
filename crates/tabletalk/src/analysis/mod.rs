//! Analysis tools the agent can call on the active table.
//!
//! Every tool catches its own failures and returns a [`ToolOutcome`]:
//! either its payload or a [`ToolFailure`](crate::types::ToolFailure) with at
//! least one concrete next step. The exploration helpers (`smart_explore`,
//! `suggest_analysis`, `fallback_help`) cannot fail and return their report
//! directly.
//!
//! [`ToolOutcome`]: crate::types::ToolOutcome

mod describe;
mod explore;
mod filter;
mod plot;
mod top_k;

pub use describe::describe;
pub use explore::{fallback_help, smart_explore, suggest_analysis};
pub use filter::filter_preview;
pub use plot::plot;
pub use top_k::top_k;

use crate::config::ExplorerConfig;
use crate::error::{AnalysisError, Result};
use crate::resolver;
use crate::utils::column_names;
use polars::prelude::DataFrame;

/// Map a user term to a column: exact name first, then the resolver.
///
/// Fails with [`AnalysisError::ColumnNotFound`] carrying "did you mean"
/// candidates and the full column list.
pub(crate) fn find_column(df: &DataFrame, term: &str, config: &ExplorerConfig) -> Result<String> {
    let columns = column_names(df);
    if columns.iter().any(|c| c == term) {
        return Ok(term.to_string());
    }
    match resolver::resolve(&columns, term, config) {
        Some(col) => Ok(col),
        None => Err(AnalysisError::ColumnNotFound {
            term: term.to_string(),
            candidates: resolver::closest(&columns, term, config),
            available: columns,
        }),
    }
}
