//! Field validation for untrusted TOC objects.
//!
//! LLM output and user-supplied JSON go through the same checks: each array
//! element becomes either a [`TocEntry`] or a [`Rejection`] naming why it
//! was unusable.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{TocEntry, UNRESOLVED_PAGE};

/// Outcome of validating one JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCheck {
    /// The value describes a usable entry.
    Valid(TocEntry),
    /// The value was discarded.
    Rejected(Rejection),
}

/// Why a value was not turned into an entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("element is not an object")]
    NotAnObject,
    #[error("missing title")]
    MissingTitle,
    #[error("title is not text")]
    InvalidTitle,
    #[error("title is blank")]
    BlankTitle,
}

/// Validate a single value.
///
/// - `title`: strings are trimmed; numbers and booleans are stringified.
/// - `page`: integer, truncated float, or numeric string; otherwise `-1`.
/// - `level`: same coercion, default `1`, never below `1`.
pub fn check_value(value: &Value) -> FieldCheck {
    match value {
        Value::Object(object) => check_object(object),
        _ => FieldCheck::Rejected(Rejection::NotAnObject),
    }
}

fn check_object(object: &Map<String, Value>) -> FieldCheck {
    let title = match object.get("title") {
        None | Some(Value::Null) => return FieldCheck::Rejected(Rejection::MissingTitle),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(_) | Value::Object(_)) => {
            return FieldCheck::Rejected(Rejection::InvalidTitle)
        }
    };
    if title.is_empty() {
        return FieldCheck::Rejected(Rejection::BlankTitle);
    }

    let page = object
        .get("page")
        .and_then(coerce_integer)
        .unwrap_or(UNRESOLVED_PAGE);
    let level = object
        .get("level")
        .and_then(coerce_integer)
        .map_or(1, |level| level.clamp(1, i64::from(u32::MAX)) as u32);

    FieldCheck::Valid(TocEntry::new(title, page, level))
}

/// Validate every element of an array, keeping valid entries in order.
pub fn check_array(values: &[Value]) -> Vec<TocEntry> {
    let mut entries = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        match check_value(value) {
            FieldCheck::Valid(entry) => entries.push(entry),
            FieldCheck::Rejected(reason) => {
                log::warn!("Skipping TOC element {}: {} ({})", idx + 1, reason, value);
            }
        }
    }
    entries
}

/// Integer coercion: integers as-is, floats truncated, numeric strings parsed.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(value: f64) -> Option<i64> {
    if value.is_finite() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}
