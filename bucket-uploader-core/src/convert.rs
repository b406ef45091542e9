//! Best-effort reformatting of text content into the target file format.
//!
//! Conversion never fails. When a step cannot be completed the original text
//! is returned unchanged and the reason is logged.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::FileFormat;
use crate::contract::ContentKind;
use crate::delimited;

/// Reformats `text` for `format`. Binary content and binary formats pass through.
pub fn convert(text: &str, content_type: ContentKind, format: FileFormat, is_binary: bool) -> String {
    if text.is_empty() {
        return String::new();
    }
    if is_binary || content_type == ContentKind::Binary || format.is_binary() {
        debug!(%format, "Skipping text processing for binary content");
        return text.to_string();
    }
    match content_type {
        ContentKind::Dataframe => convert_dataframe(text, format),
        _ => convert_text(text, format),
    }
}

fn convert_dataframe(csv: &str, format: FileFormat) -> String {
    match format {
        FileFormat::Json => match csv_to_json_records(csv) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Could not convert delimited data to JSON, keeping CSV");
                csv.to_string()
            }
        },
        FileFormat::Tsv => match delimited::parse(csv, ',') {
            Ok(rows) => {
                let mut out = String::with_capacity(csv.len());
                for row in &rows {
                    delimited::write_row(&mut out, row, '\t');
                }
                out
            }
            Err(e) => {
                warn!(error = %e, "Could not parse delimited data, replacing commas with tabs");
                csv.lines().map(|l| l.replace(',', "\t")).collect::<Vec<_>>().join("\n")
            }
        },
        _ => csv.to_string(),
    }
}

fn csv_to_json_records(csv: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let rows = delimited::parse(csv, ',')?;
    let (header, body) = rows.split_first().ok_or("no header row")?;
    let records: Vec<Value> = body
        .iter()
        .map(|row| {
            let record: Map<String, Value> = header
                .iter()
                .cloned()
                .zip(row.iter().map(|cell| infer_cell(cell)))
                .collect();
            Value::Object(record)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Integers and floats become numbers, empty cells become null.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

fn convert_text(text: &str, format: FileFormat) -> String {
    match format {
        FileFormat::Json => to_json(text),
        FileFormat::Xml if !text.trim_start().starts_with('<') => format!(
            "<?xml version='1.0' encoding='UTF-8'?>\n<data>\n  <content>{}</content>\n</data>",
            escape_markup(text)
        ),
        FileFormat::Html if !text.trim_start().starts_with('<') => format!(
            "<!DOCTYPE html>\n<html>\n<head><title>Data</title></head>\n<body>\n<pre>{}</pre>\n</body>\n</html>",
            escape_markup(text)
        ),
        FileFormat::Yaml => to_yaml(text),
        _ => text.to_string(),
    }
}

fn to_json(text: &str) -> String {
    let value = serde_json::from_str::<Value>(text)
        .unwrap_or_else(|_| serde_json::json!({ "content": text }));
    match serde_json::to_string_pretty(&value) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Error processing content for format json");
            text.to_string()
        }
    }
}

fn to_yaml(text: &str) -> String {
    let value = serde_json::from_str::<Value>(text)
        .unwrap_or_else(|_| serde_json::json!({ "content": text }));
    match serde_yaml::to_string(&value) {
        Ok(yaml) => yaml,
        Err(e) => {
            warn!(error = %e, "YAML serialization failed, writing block scalar");
            yaml_block_scalar(text)
        }
    }
}

/// `content: |` followed by the text indented two spaces.
fn yaml_block_scalar(text: &str) -> String {
    let mut out = String::from("content: |\n");
    for line in text.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
