//! Turns command-line inputs into a batch of [`InputItem`]s.
//!
//! An input file is either a JSON document (an array is one item per element,
//! anything else is a single item) or JSON Lines (`.jsonl`, one item per
//! non-blank line). Element mapping:
//!
//! - string → text
//! - object with `bytes_base64` → raw bytes
//! - object with `columns` and `rows` → table
//! - any other value → record

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use bucket_uploader_core::contract::{InputItem, Record, Table};
use serde_json::Value;
use tracing::{error, info};

/// Builds the batch: input file elements first, then `--file` paths, then `--text` values.
pub fn collect_inputs(input: Option<&Path>, files: &[PathBuf], texts: &[String]) -> Result<Vec<InputItem>> {
    let mut items = match input {
        Some(path) => load_inputs(path)?,
        None => Vec::new(),
    };
    items.extend(files.iter().map(|f| InputItem::Record(Record::from_path(f))));
    items.extend(texts.iter().cloned().map(InputItem::Text));
    Ok(items)
}

pub fn load_inputs(path: &Path) -> Result<Vec<InputItem>> {
    info!(input_path = ?path, "Loading batch input");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, input_path = ?path, "Failed to read input file");
        anyhow!("Failed to read input file {:?}: {}", path, e)
    })?;

    let is_jsonl = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl"));

    let values = if is_jsonl {
        parse_json_lines(&content)?
    } else {
        match serde_json::from_str(&content).context("Failed to parse input JSON")? {
            Value::Array(values) => values,
            value => vec![value],
        }
    };

    let items = values
        .into_iter()
        .enumerate()
        .map(|(i, v)| item_from_value(v).with_context(|| format!("Invalid input element {}", i + 1)))
        .collect::<Result<Vec<_>>>()?;
    info!(input_path = ?path, items = items.len(), "Batch input loaded");
    Ok(items)
}

fn parse_json_lines(content: &str) -> Result<Vec<Value>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", n + 1)))
        .collect()
}

pub fn item_from_value(value: Value) -> Result<InputItem> {
    match value {
        Value::String(text) => Ok(InputItem::Text(text)),
        Value::Object(map) if map.contains_key("bytes_base64") => {
            let encoded = map
                .get("bytes_base64")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("'bytes_base64' must be a string"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .context("'bytes_base64' is not valid base64")?;
            Ok(InputItem::Bytes(bytes))
        }
        Value::Object(map) if map.contains_key("columns") && map.contains_key("rows") => {
            let columns = cells(&map["columns"]).context("'columns' must be an array")?;
            let rows = map["rows"]
                .as_array()
                .ok_or_else(|| anyhow!("'rows' must be an array"))?
                .iter()
                .map(|row| cells(row).context("each row must be an array"))
                .collect::<Result<Vec<_>>>()?;
            Ok(InputItem::Table(Arc::new(Table { columns, rows })))
        }
        other => Ok(InputItem::Record(Record::new(other))),
    }
}

fn cells(value: &Value) -> Result<Vec<String>> {
    let values = value.as_array().ok_or_else(|| anyhow!("expected an array"))?;
    Ok(values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucket_uploader_core::contract::Tabular;
    use serde_json::json;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn strings_become_text_and_objects_records() {
        assert!(matches!(item_from_value(json!("hi")).unwrap(), InputItem::Text(t) if t == "hi"));
        assert!(matches!(item_from_value(json!({ "path": "a.csv" })).unwrap(), InputItem::Record(_)));
        assert!(matches!(item_from_value(json!(42)).unwrap(), InputItem::Record(_)));
    }

    #[test]
    fn base64_objects_become_bytes() {
        match item_from_value(json!({ "bytes_base64": "aGVsbG8=" })).unwrap() {
            InputItem::Bytes(b) => assert_eq!(b, b"hello"),
            other => panic!("expected bytes, got {other:?}"),
        }
        assert!(item_from_value(json!({ "bytes_base64": "%%%" })).is_err());
    }

    #[test]
    fn tables_render_cells_as_strings() {
        let item = item_from_value(json!({ "columns": ["a", "b"], "rows": [[1, null], ["x", true]] })).unwrap();
        let InputItem::Table(table) = item else {
            panic!("expected a table");
        };
        assert_eq!(table.to_csv(), "a,b\n1,\nx,true\n");
    }

    #[test]
    fn jsonl_files_yield_one_item_per_line() {
        let mut file = Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, "\"one\"\n\n{{\"text\": \"two\"}}").unwrap();
        let items = load_inputs(file.path()).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn json_arrays_are_split_and_extras_appended() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"["a", {{"path": "x.txt"}}]"#).unwrap();
        let items = collect_inputs(
            Some(file.path()),
            &[PathBuf::from("notes.md")],
            &["tail".to_string()],
        )
        .unwrap();
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[3], InputItem::Text(t) if t == "tail"));
    }

    #[test]
    fn malformed_input_is_an_error() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[not json").unwrap();
        assert!(load_inputs(file.path()).is_err());
        assert!(load_inputs(Path::new("/definitely/missing.json")).is_err());
    }
}
