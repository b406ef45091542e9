//! Normalizes any [`InputItem`] into a [`ContentDescriptor`].
//!
//! The extractor walks an ordered fallback chain and stops at the first branch
//! that yields content; the branch is recorded as `source_tag`. It never fails:
//! the worst case is an empty descriptor, which the orchestrator reports as
//! "no content found".

use serde_json::Value;
use tracing::debug;

use crate::contract::{ContentDescriptor, ContentKind, InputItem, Record};

/// Keys scanned, in order, when a record has no direct `text`.
const SECONDARY_TEXT_KEYS: &[&str] = &["content", "body", "message", "payload", "value", "result"];

/// Keys that carry an explicit destination path, in order of preference.
const PATH_KEYS: &[&str] = &["file_path", "path"];

/// Stringified items this short carry nothing worth uploading.
const MIN_STRINGIFIED_LEN: usize = 10;

const EMPTY_RENDERINGS: &[&str] = &["{}", "[]", "null", "\"\""];

pub fn extract(item: &InputItem) -> ContentDescriptor {
    let descriptor = match item {
        InputItem::Text(text) => ContentDescriptor::text(text.clone(), ContentKind::Text, "string"),
        InputItem::Message(message) => match message.text().filter(|t| !t.is_empty()) {
            Some(text) => ContentDescriptor::text(text, ContentKind::Text, "message.text"),
            None => match message.fallback_rendering() {
                Some(rendering) => stringified(&rendering),
                None => ContentDescriptor::empty("message"),
            },
        },
        InputItem::Table(table) => {
            let csv = table.to_csv();
            if csv.trim().is_empty() {
                ContentDescriptor::empty("dataframe")
            } else {
                ContentDescriptor::text(csv, ContentKind::Dataframe, "dataframe")
            }
        }
        InputItem::Record(record) => extract_record(record),
        InputItem::Bytes(bytes) => ContentDescriptor {
            binary: Some(bytes.clone()),
            is_binary: true,
            content_type: ContentKind::Binary,
            ..ContentDescriptor::empty("bytes")
        },
        InputItem::Opaque(rendering) => stringified(rendering),
    };
    debug!(
        source = %descriptor.source_tag,
        has_text = descriptor.text.is_some(),
        has_binary = descriptor.binary.is_some(),
        suggested_path = ?descriptor.suggested_path,
        "Extracted content"
    );
    descriptor
}

fn extract_record(record: &Record) -> ContentDescriptor {
    match &record.data {
        Value::Object(map) => {
            if let Some(found) = from_object(map, "record") {
                return found;
            }
            for key in SECONDARY_TEXT_KEYS {
                if let Some(text) = map.get(*key).and_then(value_text) {
                    return ContentDescriptor::text(text, ContentKind::Text, format!("record.{key}"));
                }
            }
        }
        Value::String(s) if !s.trim().is_empty() => {
            return ContentDescriptor::text(s.clone(), ContentKind::Text, "record (string)");
        }
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => {
                if let Some(found) = from_object(first, "record[0]") {
                    return found;
                }
                if let Some(text) = first.get("content").and_then(value_text) {
                    return ContentDescriptor::text(text, ContentKind::Text, "record[0]");
                }
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return ContentDescriptor::text(s.clone(), ContentKind::Text, "record[0] (string)");
            }
            _ => {}
        },
        _ => {}
    }
    match serde_json::to_string_pretty(&record.data) {
        Ok(json) => stringified(&json),
        Err(_) => ContentDescriptor::empty("unknown"),
    }
}

/// The direct `(path, text)` pair of an object, if either half is present.
fn from_object(map: &serde_json::Map<String, Value>, tag: &str) -> Option<ContentDescriptor> {
    let path = PATH_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    let text = map
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if path.is_none() && text.is_none() {
        return None;
    }
    Some(ContentDescriptor {
        text,
        suggested_path: path,
        ..ContentDescriptor::empty(tag)
    })
}

/// Nonempty strings verbatim, other non-null values as compact JSON.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Last resort: keep the string rendering unless it is trivially short or empty.
fn stringified(rendering: &str) -> ContentDescriptor {
    let trimmed = rendering.trim();
    if trimmed.chars().count() <= MIN_STRINGIFIED_LEN || EMPTY_RENDERINGS.contains(&trimmed) {
        return ContentDescriptor::empty("unknown");
    }
    ContentDescriptor::text(rendering, ContentKind::Text, "string_conversion")
}
