//! Free-text column resolution.
//!
//! Users (and the agent) refer to columns loosely: `"Revenue"`, `"customers"`,
//! `"totl_sales"`. Resolution tries, in order:
//!
//! 1. Case-insensitive exact match
//! 2. Business synonyms routed through the role mapper
//! 3. Fuzzy match on the similarity ratio
//!
//! Nothing in here fails; an unresolvable term is `None` and the caller
//! decides how to report it, usually with [`closest`] candidates.

use crate::config::ExplorerConfig;
use crate::profiler::{map_roles, role_for_term};
use similar::TextDiff;
use tracing::debug;

/// Similarity of two strings in `[0, 1]`: `2·M / T`, where `M` is the number
/// of matching characters and `T` the total length of both strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Resolve a user term to a column name.
pub fn resolve<S: AsRef<str>>(columns: &[S], term: &str, config: &ExplorerConfig) -> Option<String> {
    if term.trim().is_empty() {
        return None;
    }

    let lower = term.to_lowercase();
    if let Some(col) = columns
        .iter()
        .find(|c| c.as_ref().to_lowercase() == lower)
    {
        return Some(col.as_ref().to_string());
    }

    if let Some(role) = role_for_term(term)
        && let Some(col) = map_roles(columns, term).get(role)
    {
        debug!("Resolved '{}' via {} role to '{}'", term, role.as_str(), col);
        return Some(col.to_string());
    }

    let best = ranked(columns, term, config.resolve_cutoff).into_iter().next();
    if let Some((col, score)) = &best {
        debug!("Fuzzy-resolved '{}' to '{}' (ratio {:.2})", term, col, score);
    }
    best.map(|(col, _)| col)
}

/// Columns that look like `term`, best first, for "did you mean" hints.
///
/// At most `config.max_suggestions` names, each with a ratio of at least
/// `config.suggestion_cutoff`. Equal ratios keep column order rather than
/// preferring the lexically larger name.
pub fn closest<S: AsRef<str>>(columns: &[S], term: &str, config: &ExplorerConfig) -> Vec<String> {
    ranked(columns, term, config.suggestion_cutoff)
        .into_iter()
        .take(config.max_suggestions)
        .map(|(col, _)| col)
        .collect()
}

/// Columns scoring at least `cutoff`, sorted by descending ratio.
/// The sort is stable so equal scores keep column order.
fn ranked<S: AsRef<str>>(columns: &[S], term: &str, cutoff: f64) -> Vec<(String, f64)> {
    let mut scored: Vec<(String, f64)> = columns
        .iter()
        .map(|c| (c.as_ref().to_string(), similarity(term, c.as_ref())))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}
