//! # contract: inputs, descriptors and the object store interface
//!
//! This module holds the plain data the pipeline passes between its stages and
//! the single trait ([`ObjectStore`]) it needs from the outside world.
//!
//! ## Inputs
//! A batch is a list of [`InputItem`]s. Each variant is a capability rather than
//! a concrete upstream type: anything that can hand out a text accessor is a
//! [`TextBearing`], anything that can render itself as delimited text is a
//! [`Tabular`]. The extractor dispatches on the variant exactly once.
//!
//! ## Mocking & Testing
//! [`ObjectStore`] is annotated for `mockall`, so `MockObjectStore` is
//! available to tests in this crate and, through the default
//! `test-export-mocks` feature, to dependents.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::delimited;
use crate::error::ObjectStoreError;

/// Something that exposes a text-like accessor (a chat message, a document).
pub trait TextBearing: fmt::Debug + Send + Sync {
    /// The carried text, if any.
    fn text(&self) -> Option<&str>;

    /// Rendering used when there is no text. `None` means the value carries
    /// nothing else worth uploading either.
    fn fallback_rendering(&self) -> Option<String> {
        Some(format!("{self:?}"))
    }
}

/// Something that can render itself as delimited (CSV) text.
pub trait Tabular: fmt::Debug + Send + Sync {
    fn to_csv(&self) -> String;
}

/// A minimal text-bearing message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub text: Option<String>,
    pub sender: Option<String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            sender: None,
        }
    }
}

impl TextBearing for Message {
    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn fallback_rendering(&self) -> Option<String> {
        self.sender.as_ref().map(|_| format!("{self:?}"))
    }
}

/// A column-oriented table whose cells are already rendered as strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Tabular for Table {
    fn to_csv(&self) -> String {
        let mut out = String::new();
        delimited::write_row(&mut out, &self.columns, ',');
        for row in &self.rows {
            delimited::write_row(&mut out, row, ',');
        }
        out
    }
}

/// A structured key/value payload, possibly carrying an explicit destination path.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub data: serde_json::Value,
}

impl Record {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }

    /// A record that points at a local file to upload as-is.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            data: serde_json::json!({ "file_path": path.as_ref().to_string_lossy() }),
        }
    }
}

/// One element of an upload batch.
#[derive(Debug, Clone)]
pub enum InputItem {
    Text(String),
    Message(Arc<dyn TextBearing>),
    Table(Arc<dyn Tabular>),
    Record(Record),
    Bytes(Vec<u8>),
    /// A value of unknown shape, known only through its string rendering.
    Opaque(String),
}

impl From<&str> for InputItem {
    fn from(s: &str) -> Self {
        InputItem::Text(s.to_string())
    }
}

impl From<String> for InputItem {
    fn from(s: String) -> Self {
        InputItem::Text(s)
    }
}

impl From<serde_json::Value> for InputItem {
    fn from(data: serde_json::Value) -> Self {
        InputItem::Record(Record::new(data))
    }
}

impl From<Vec<u8>> for InputItem {
    fn from(bytes: Vec<u8>) -> Self {
        InputItem::Bytes(bytes)
    }
}

impl From<Message> for InputItem {
    fn from(message: Message) -> Self {
        InputItem::Message(Arc::new(message))
    }
}

impl From<Table> for InputItem {
    fn from(table: Table) -> Self {
        InputItem::Table(Arc::new(table))
    }
}

/// How the extracted content should be treated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Dataframe,
    Binary,
}

/// Normalized content of a single item, produced once by the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDescriptor {
    pub text: Option<String>,
    pub binary: Option<Vec<u8>>,
    pub is_binary: bool,
    pub content_type: ContentKind,
    /// Which extraction branch produced the content, for diagnostics.
    pub source_tag: String,
    /// Explicit destination path carried by the item itself.
    pub suggested_path: Option<String>,
}

impl ContentDescriptor {
    /// The "no content found" descriptor.
    pub fn empty(source_tag: impl Into<String>) -> Self {
        Self {
            text: None,
            binary: None,
            is_binary: false,
            content_type: ContentKind::Text,
            source_tag: source_tag.into(),
            suggested_path: None,
        }
    }

    pub fn text(text: impl Into<String>, content_type: ContentKind, source_tag: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            content_type,
            ..Self::empty(source_tag)
        }
    }

    pub fn has_content(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
            || self.binary.as_deref().is_some_and(|b| !b.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_content() && self.suggested_path.is_none()
    }
}

/// Where and how a single item is written.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    pub bucket: String,
    pub key: String,
    pub content_type_header: String,
    /// Set only for items staged locally because they had no explicit path.
    pub local_staging_path: Option<PathBuf>,
}

/// Bucket-addressed blob storage.
///
/// Implementations are shared read-only across every item of a batch, so all
/// methods take `&self`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Checks that the bucket exists and is reachable with the current credentials.
    async fn head_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    /// Writes an in-memory body to `bucket/key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Streams a local file to `bucket/key`.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;
}
