//! Batch orchestration: extract → classify → name → convert → stage → upload → aggregate.
//!
//! [`upload_batch`] is the entrypoint. It validates the configuration, checks
//! bucket access once, then drives every item through the pipeline and folds
//! the outcomes into a [`BatchReport`].
//!
//! # Failure isolation
//! Only configuration and bucket-access problems abort a run ([`BatchError`]).
//! Everything that goes wrong for a single item becomes that item's failure
//! entry and the run moves on. Items may be processed concurrently
//! (`UploadConfig::concurrency`); the report is always in input order.
//!
//! # Staging lifecycle
//! Items without an explicit path are written to staging files (unless the
//! `InMemory` strategy is selected). All staging files of a run are removed
//! after every item has finished, whatever the outcome.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::classify::{classify, Classification, Content};
use crate::config::{FileFormat, UploadConfig, UploadStrategy};
use crate::contract::{ContentDescriptor, InputItem, ObjectStore, UploadTarget};
use crate::convert::convert;
use crate::error::{BatchError, ItemError, ObjectStoreError};
use crate::extract::extract;
use crate::naming::{normalize_key, BatchTimestamp, PathResolver};
use crate::report::{aggregate, BatchReport, UploadFailure, UploadOutcome, UploadRecord};
use crate::staging::StagingArea;

const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Uploads `items` to the configured bucket, naming generated keys from the current time.
pub async fn upload_batch<S>(
    config: &UploadConfig,
    store: &S,
    items: &[InputItem],
) -> Result<BatchReport, BatchError>
where
    S: ObjectStore + ?Sized,
{
    upload_batch_at(config, store, items, BatchTimestamp::now()).await
}

/// Like [`upload_batch`], with the naming timestamp supplied by the caller.
pub async fn upload_batch_at<S>(
    config: &UploadConfig,
    store: &S,
    items: &[InputItem],
    stamp: BatchTimestamp,
) -> Result<BatchReport, BatchError>
where
    S: ObjectStore + ?Sized,
{
    validate(config, items)?;

    info!(bucket = %config.bucket, items = items.len(), "[BATCH] Checking bucket access");
    if let Err(e) = store.head_bucket(&config.bucket).await {
        error!(bucket = %config.bucket, error = %e, "[BATCH][ERROR] Bucket access check failed");
        return Err(BatchError::from_bucket_check(&config.bucket, e));
    }

    if config.debug {
        info!(
            items = items.len(),
            format = %config.effective_format(),
            strategy = ?config.strategy,
            "[BATCH][DEBUG] Starting upload run"
        );
    }

    let run = BatchRun {
        config,
        store,
        resolver: PathResolver::new(config, stamp),
        staging: StagingArea::new(config.staging_dir.as_deref()),
        format: config.effective_format(),
        seen_keys: Mutex::new(HashSet::new()),
    };

    let outcomes: Vec<UploadOutcome> = stream::iter(items.iter().enumerate())
        .map(|(i, item)| run.process_item(i + 1, item))
        .buffered(config.concurrency)
        .collect()
        .await;

    // Every upload has completed at this point, so no staging file is still being read.
    run.staging.cleanup();

    let report = aggregate(outcomes);
    info!(
        uploaded = report.uploaded_count,
        failed = report.failed_count,
        "[BATCH] Upload completed"
    );
    Ok(report)
}

fn validate(config: &UploadConfig, items: &[InputItem]) -> Result<(), BatchError> {
    if config.bucket.trim().is_empty() {
        return Err(BatchError::Configuration("bucket name is required".into()));
    }
    if items.is_empty() {
        return Err(BatchError::Configuration("no content input provided".into()));
    }
    if config.concurrency == 0 {
        return Err(BatchError::Configuration("concurrency must be at least 1".into()));
    }
    Ok(())
}

/// Body handed to the object store.
enum Payload<'p> {
    File(&'p Path),
    Bytes(Vec<u8>),
}

struct BatchRun<'a, S: ?Sized> {
    config: &'a UploadConfig,
    store: &'a S,
    resolver: PathResolver,
    staging: StagingArea,
    format: FileFormat,
    seen_keys: Mutex<HashSet<String>>,
}

impl<'a, S> BatchRun<'a, S>
where
    S: ObjectStore + ?Sized,
{
    async fn process_item(&self, index: usize, item: &InputItem) -> UploadOutcome {
        let descriptor = extract(item);
        if self.config.debug {
            info!(
                index,
                source = %descriptor.source_tag,
                has_text = descriptor.text.is_some(),
                has_binary = descriptor.binary.is_some(),
                suggested_path = ?descriptor.suggested_path,
                "[ITEM][DEBUG] Extracted content"
            );
        }

        if descriptor.is_empty() {
            warn!(index, source = %descriptor.source_tag, "[ITEM] No content found");
            return failure(index, &descriptor, ItemError::NoContent);
        }

        match self.upload_item(index, &descriptor).await {
            Ok(record) => {
                info!(
                    index,
                    key = %record.key,
                    size = record.size_bytes,
                    temporary = record.temporary,
                    "[ITEM] Uploaded to s3://{}/{}",
                    record.bucket,
                    record.key
                );
                UploadOutcome::Uploaded(record)
            }
            Err(e) => {
                error!(index, source = %descriptor.source_tag, error = %e, "[ITEM][ERROR] Upload failed");
                failure(index, &descriptor, e)
            }
        }
    }

    async fn upload_item(&self, index: usize, d: &ContentDescriptor) -> Result<UploadRecord, ItemError> {
        let content = match (&d.binary, &d.text) {
            (Some(bytes), _) => Content::Bytes(bytes),
            (None, Some(text)) => Content::Text(text),
            (None, None) => Content::None,
        };
        let class = classify(d.suggested_path.as_deref(), content, self.format, d.content_type);
        debug!(index, is_binary = class.is_binary, kind = ?class.content_type, "Classified content");

        match &d.suggested_path {
            Some(path) => self.upload_explicit(index, d, path, class).await,
            None => self.upload_generated(index, d, class).await,
        }
    }

    /// The item names its own destination. A local file at that path is
    /// uploaded as-is; otherwise the carried content is sent unchanged.
    async fn upload_explicit(
        &self,
        index: usize,
        d: &ContentDescriptor,
        path: &str,
        class: Classification,
    ) -> Result<UploadRecord, ItemError> {
        let key = normalize_key(path, self.config.key_prefix.as_deref(), self.config.strip_path);
        if key.is_empty() {
            return Err(ItemError::EmptyKey(path.to_string()));
        }
        let local = Path::new(path);

        match std::fs::metadata(local) {
            Ok(meta) if meta.is_file() => {
                let target = self.target(index, key, None);
                self.deliver(&target, Payload::File(local)).await?;
                Ok(self.record(index, target, meta.len(), Some(path.to_string())))
            }
            Ok(_) => Err(ItemError::NotAFile(local.to_path_buf())),
            Err(_) if d.has_content() => {
                let body = raw_body(d, class);
                let size_bytes = body.len() as u64;
                let target = self.target(index, key, None);
                self.deliver(&target, Payload::Bytes(body)).await?;
                Ok(self.record(index, target, size_bytes, None))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ItemError::MissingSource(local.to_path_buf())),
            Err(source) => Err(ItemError::SourceRead {
                path: local.to_path_buf(),
                source,
            }),
        }
    }

    async fn upload_generated(
        &self,
        index: usize,
        d: &ContentDescriptor,
        class: Classification,
    ) -> Result<UploadRecord, ItemError> {
        let key = self.resolver.resolve(index);
        debug!(index, key = %key, "Generated destination key");

        let body = if class.is_binary {
            raw_body(d, class)
        } else {
            let text = d.text.as_deref().unwrap_or_default();
            convert(text, class.content_type, self.format, false).into_bytes()
        };
        let size_bytes = body.len() as u64;

        match self.config.strategy {
            UploadStrategy::Staged => {
                let staged = self.staging.stage(index, &key, body).await.map_err(ItemError::Staging)?;
                let filename = key.rsplit('/').next().unwrap_or(&key).to_string();
                let target = self.target(index, key, Some(staged.clone()));
                self.deliver(&target, Payload::File(&staged)).await?;
                Ok(self.record(index, target, size_bytes, Some(format!("temp:{filename}"))))
            }
            UploadStrategy::InMemory => {
                let target = self.target(index, key, None);
                self.deliver(&target, Payload::Bytes(body)).await?;
                Ok(self.record(index, target, size_bytes, None))
            }
        }
    }

    fn target(&self, index: usize, key: String, local_staging_path: Option<PathBuf>) -> UploadTarget {
        self.note_key(index, &key);
        UploadTarget {
            bucket: self.config.bucket.clone(),
            content_type_header: self.content_type_for(&key).to_string(),
            key,
            local_staging_path,
        }
    }

    /// The configured format decides; without one, the key's extension does.
    fn content_type_for(&self, key: &str) -> &'static str {
        match self.config.file_format {
            Some(format) => format.mime_type(),
            None => Path::new(key)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(FileFormat::from_extension)
                .map(FileFormat::mime_type)
                .unwrap_or(FALLBACK_CONTENT_TYPE),
        }
    }

    fn note_key(&self, index: usize, key: &str) {
        let fresh = match self.seen_keys.lock() {
            Ok(mut seen) => seen.insert(key.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(key.to_string()),
        };
        if !fresh {
            warn!(index, key, "[ITEM] Destination key already used in this batch; the object will be overwritten");
        }
    }

    async fn deliver(&self, target: &UploadTarget, payload: Payload<'_>) -> Result<(), ItemError> {
        debug!(
            bucket = %target.bucket,
            key = %target.key,
            content_type = %target.content_type_header,
            "Uploading object"
        );
        match payload {
            Payload::File(path) => {
                self.with_timeout(self.store.upload_file(&target.bucket, &target.key, path, &target.content_type_header))
                    .await
            }
            Payload::Bytes(body) => {
                self.with_timeout(self.store.put_object(&target.bucket, &target.key, body, &target.content_type_header))
                    .await
            }
        }
    }

    async fn with_timeout<F>(&self, call: F) -> Result<(), ItemError>
    where
        F: Future<Output = Result<(), ObjectStoreError>>,
    {
        match self.config.upload_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ItemError::Timeout(limit))?
                .map_err(ItemError::from),
            None => call.await.map_err(ItemError::from),
        }
    }

    fn record(&self, index: usize, target: UploadTarget, size_bytes: u64, source: Option<String>) -> UploadRecord {
        UploadRecord {
            index,
            key: target.key,
            bucket: target.bucket,
            size_bytes,
            temporary: target.local_staging_path.is_some(),
            source,
            content_type: target.content_type_header,
        }
    }
}

fn failure(index: usize, d: &ContentDescriptor, err: ItemError) -> UploadOutcome {
    UploadOutcome::Failed(UploadFailure {
        index,
        source_tag: d.source_tag.clone(),
        error: err.to_string(),
    })
}

/// Bytes of an item without format conversion.
fn raw_body(d: &ContentDescriptor, class: Classification) -> Vec<u8> {
    match (&d.binary, &d.text) {
        (Some(bytes), _) => bytes.clone(),
        (None, Some(text)) if class.is_binary => decode_binary_text(text),
        (None, Some(text)) => text.clone().into_bytes(),
        (None, None) => Vec::new(),
    }
}

/// Binary content that arrived as a string: base64 if it decodes, otherwise
/// Latin-1 when every character fits a byte, otherwise UTF-8.
pub fn decode_binary_text(text: &str) -> Vec<u8> {
    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(text.trim()) {
        debug!(size = bytes.len(), "Decoded base64 binary content");
        return bytes;
    }
    if text.chars().all(|c| (c as u32) <= 0xFF) {
        return text.chars().map(|c| c as u8).collect();
    }
    text.as_bytes().to_vec()
}
