//! Data profiling for conversational exploration.
//!
//! This module provides:
//! - Schema classification into numeric, datetime and categorical buckets
//! - Semantic role detection from column names
//! - Descriptive statistics for the describe tool

mod role_inference;
mod schema_inference;
mod statistics;

pub use role_inference::{map_roles, role_for_term};
pub use schema_inference::classify;

pub(crate) use statistics::describe_column;
