//! Keyword routing of chat messages.
//!
//! Routing is a fixed-order keyword scan over the lowercased message; the
//! first rule that matches wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Split on anything that is not a lowercase word character.
static TOKEN_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("Invalid regex: TOKEN_SPLIT"));

/// What a chat message is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Upload,
    TopK,
    Plot,
    Describe,
    Filter,
    Chat,
}

const RULES: &[(Intent, &[&str])] = &[
    (Intent::Upload, &["upload", "csv", "excel"]),
    (Intent::TopK, &["top", "largest", "by "]),
    (Intent::Plot, &["plot", "chart", "trend", "graph"]),
    (Intent::Describe, &["describe", "summary", "stats"]),
    (Intent::Filter, &["filter", "where"]),
];

/// Route a message to an intent. Anything unmatched is [`Intent::Chat`].
pub fn detect_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Chat)
}

/// A date column the user asked to use, e.g. "use order_date as the date".
///
/// Only messages containing both `use ` and `date` count. Every token that
/// contains `date` is a candidate; the last one wins.
pub fn remembered_date_column(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if !(lower.contains("use ") && lower.contains("date")) {
        return None;
    }
    TOKEN_SPLIT
        .split(&lower)
        .filter(|token| token.contains("date"))
        .last()
        .map(str::to_string)
}
