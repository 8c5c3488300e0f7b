//! Condition template interpolation.
//!
//! Resolves `{{ path }}` placeholders in condition templates against a
//! values object. Templates are long-lived shared configuration; the
//! interpolator always builds a fresh map and never mutates its input, so
//! two concurrent requests cannot observe each other's resolved values.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::types::ConditionMap;

/// Matches `{{ path }}` with optional whitespace inside the braces and a
/// dot-separated identifier path.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\}\}")
        .expect("placeholder pattern is valid")
});

/// Resolve every placeholder in `template` against `values`, returning a
/// fresh condition map.
///
/// - Nested objects are traversed recursively.
/// - A string that is exactly one placeholder resolves to the raw value at
///   the path, so typed comparisons survive interpolation.
/// - A string mixing placeholders with other text resolves each placeholder
///   independently into one combined string.
/// - Unresolvable paths leave the placeholder verbatim, braces included;
///   the condition degrades to one that cannot match real data.
/// - Non-string, non-object leaves pass through unchanged.
pub fn interpolate(template: &ConditionMap, values: &Value) -> ConditionMap {
    template
        .iter()
        .map(|(key, value)| (key.clone(), interpolate_value(value, values)))
        .collect()
}

fn interpolate_value(template: &Value, values: &Value) -> Value {
    match template {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), interpolate_value(value, values)))
                .collect(),
        ),
        Value::String(text) => interpolate_string(text, values),
        other => other.clone(),
    }
}

fn interpolate_string(text: &str, values: &Value) -> Value {
    // A string that is exactly one placeholder keeps the resolved value's type.
    if let Some(captures) = PLACEHOLDER.captures(text) {
        let whole = captures.get(0).map(|m| m.as_str() == text).unwrap_or(false);
        if whole {
            return match resolve_path(values, &captures[1]) {
                Some(resolved) => resolved.clone(),
                None => Value::String(text.to_string()),
            };
        }
    }

    let replaced = PLACEHOLDER.replace_all(text, |captures: &Captures| {
        match resolve_path(values, &captures[1]) {
            Some(resolved) => render(resolved),
            None => captures[0].to_string(),
        }
    });

    Value::String(replaced.into_owned())
}

/// Walk a dot-separated path into `values`. A missing key or an explicit
/// null both count as unresolved.
fn resolve_path<'a>(values: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = values;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
