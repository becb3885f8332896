//! Tolerant extraction of fields from provider response payloads.
//!
//! Provider response shapes are not contractually fixed: job identifiers,
//! status fields, report text, and citation lists move around between API
//! revisions. Each accessor here takes an ordered list of candidate field
//! paths and returns the first structurally valid match, keeping the shape
//! variance out of the control flow.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

use crate::types::Citation;

/// Walk a dotted path ("metadata.status", "choices.0.message") into a JSON
/// value. Numeric segments index into arrays.
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Array(_) => current.get(segment.parse::<usize>().ok()?),
            _ => current.get(segment),
        }?;
    }
    Some(current)
}

/// First non-empty string found under any of the candidate paths.
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    for path in paths {
        if let Some(s) = value_at(value, path).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

/// Status string of an async job response.
///
/// Checked under the field names the providers are known to use.
pub fn status_text(value: &Value) -> Option<String> {
    first_string(value, &["status", "metadata.status", "state"])
}

/// Error message from a failure response, accepting both a bare string and
/// a structured `{message}` record under common field names.
pub fn error_message(value: &Value) -> String {
    for path in ["error", "error.message", "message", "detail"] {
        match value_at(value, path) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Object(map)) => {
                if let Some(msg) = map.get("message").and_then(|v| v.as_str()) {
                    if !msg.is_empty() {
                        return msg.to_string();
                    }
                }
            }
            _ => {}
        }
    }
    "unknown error".to_string()
}

/// Report text from the last element of an output array (`outputs`, `output`),
/// tolerating both bare strings and `{text}`/`{content}` records, with
/// additional flat candidates tried afterwards.
pub fn report_text(value: &Value, array_keys: &[&str], flat_paths: &[&str]) -> Option<String> {
    for key in array_keys {
        if let Some(items) = value.get(*key).and_then(|v| v.as_array()) {
            if let Some(last) = items.last() {
                let text = match last {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(_) => first_string(last, &["text", "content"]),
                    _ => None,
                };
                if let Some(text) = text.filter(|t| !t.is_empty()) {
                    return Some(text);
                }
            }
        }
    }
    first_string(value, flat_paths)
}

/// Normalize a structured source list into citations.
///
/// Each element may be a bare URL string or a record with `url`/`uri` and an
/// optional `title`. Elements without a usable URL are skipped.
pub fn citations_from_sources(sources: &Value) -> Vec<Citation> {
    let Some(items) = sources.as_array() else {
        return Vec::new();
    };
    let mut citations = Vec::new();
    for item in items {
        match item {
            Value::String(url) if !url.is_empty() => citations.push(Citation::new(url.clone())),
            Value::Object(_) => {
                if let Some(url) = first_string(item, &["url", "uri", "link"]) {
                    let citation = match first_string(item, &["title"]) {
                        Some(title) => Citation::new(url).with_title(title),
                        None => Citation::new(url),
                    };
                    citations.push(citation);
                }
            }
            _ => {}
        }
    }
    dedupe_citations(citations)
}

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s)>\]"']+"#).expect("valid URL regex"));

/// Fallback citation pass: scan report text for literal URLs, preserving
/// first-seen order and dropping exact duplicates.
pub fn citations_from_text(report: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    for m in URL_RE.find_iter(report) {
        let url = m.as_str();
        if seen.insert(url.to_string()) {
            citations.push(Citation::new(url));
        }
    }
    citations
}

/// Drop citations whose URL was already seen, keeping first-seen order.
pub fn dedupe_citations(citations: Vec<Citation>) -> Vec<Citation> {
    let mut seen = HashSet::new();
    citations
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}
