//! Command handlers

pub mod cache;
pub mod config;
pub mod data;
pub mod file;
pub mod migrate;
pub mod queue;
pub mod setting;
pub mod status;

use serde_json::Value;

/// Parse a value given on the command line
///
/// Anything that is not valid JSON is taken as a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
