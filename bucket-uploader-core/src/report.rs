//! Batch results and their aggregation.

use serde::Serialize;

/// A successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRecord {
    /// 1-based position in the input batch.
    pub index: usize,
    pub key: String,
    pub bucket: String,
    pub size_bytes: u64,
    /// Whether the body came from a staging file created for this run.
    pub temporary: bool,
    /// Explicit local path, or `temp:<filename>` for staged content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub content_type: String,
}

/// A failed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub index: usize,
    pub source_tag: String,
    pub error: String,
}

/// Outcome of one item. Exactly one is produced per input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(UploadRecord),
    Failed(UploadFailure),
}

impl UploadOutcome {
    pub fn index(&self) -> usize {
        match self {
            UploadOutcome::Uploaded(r) => r.index,
            UploadOutcome::Failed(f) => f.index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub success: bool,
    pub total: usize,
    pub uploaded_count: usize,
    pub failed_count: usize,
    pub uploads: Vec<UploadRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<UploadFailure>,
}

/// Builds the report from outcomes already in input order.
pub fn aggregate(outcomes: Vec<UploadOutcome>) -> BatchReport {
    let total = outcomes.len();
    let mut uploads = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            UploadOutcome::Uploaded(record) => uploads.push(record),
            UploadOutcome::Failed(failure) => errors.push(failure),
        }
    }
    BatchReport {
        success: errors.is_empty(),
        total,
        uploaded_count: uploads.len(),
        failed_count: errors.len(),
        uploads,
        errors,
    }
}
