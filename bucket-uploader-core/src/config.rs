use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Target serialization for uploaded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Txt,
    Json,
    Csv,
    Xml,
    Html,
    Md,
    Yaml,
    Log,
    Tsv,
    Jsonl,
    Parquet,
    Xlsx,
    Zip,
    Pdf,
    Jpg,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
}

impl FileFormat {
    pub const ALL: [FileFormat; 20] = [
        FileFormat::Txt,
        FileFormat::Json,
        FileFormat::Csv,
        FileFormat::Xml,
        FileFormat::Html,
        FileFormat::Md,
        FileFormat::Yaml,
        FileFormat::Log,
        FileFormat::Tsv,
        FileFormat::Jsonl,
        FileFormat::Parquet,
        FileFormat::Xlsx,
        FileFormat::Zip,
        FileFormat::Pdf,
        FileFormat::Jpg,
        FileFormat::Jpeg,
        FileFormat::Png,
        FileFormat::Gif,
        FileFormat::Bmp,
        FileFormat::Webp,
    ];

    /// File extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Txt => "txt",
            FileFormat::Json => "json",
            FileFormat::Csv => "csv",
            FileFormat::Xml => "xml",
            FileFormat::Html => "html",
            FileFormat::Md => "md",
            FileFormat::Yaml => "yaml",
            FileFormat::Log => "log",
            FileFormat::Tsv => "tsv",
            FileFormat::Jsonl => "jsonl",
            FileFormat::Parquet => "parquet",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Zip => "zip",
            FileFormat::Pdf => "pdf",
            FileFormat::Jpg => "jpg",
            FileFormat::Jpeg => "jpeg",
            FileFormat::Png => "png",
            FileFormat::Gif => "gif",
            FileFormat::Bmp => "bmp",
            FileFormat::Webp => "webp",
        }
    }

    /// MIME type sent as the object's Content-Type.
    pub fn mime_type(self) -> &'static str {
        match self {
            FileFormat::Txt | FileFormat::Log => "text/plain",
            FileFormat::Json => "application/json",
            FileFormat::Csv => "text/csv",
            FileFormat::Xml => "application/xml",
            FileFormat::Html => "text/html",
            FileFormat::Md => "text/markdown",
            FileFormat::Yaml => "application/x-yaml",
            FileFormat::Tsv => "text/tab-separated-values",
            FileFormat::Jsonl => "application/jsonlines",
            FileFormat::Parquet => "application/octet-stream",
            FileFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FileFormat::Zip => "application/zip",
            FileFormat::Pdf => "application/pdf",
            FileFormat::Jpg | FileFormat::Jpeg => "image/jpeg",
            FileFormat::Png => "image/png",
            FileFormat::Gif => "image/gif",
            FileFormat::Bmp => "image/bmp",
            FileFormat::Webp => "image/webp",
        }
    }

    /// Formats whose content is never treated as text.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            FileFormat::Zip
                | FileFormat::Xlsx
                | FileFormat::Parquet
                | FileFormat::Pdf
                | FileFormat::Jpg
                | FileFormat::Jpeg
                | FileFormat::Png
                | FileFormat::Gif
                | FileFormat::Bmp
                | FileFormat::Webp
        )
    }

    /// Looks a format up by file extension (case-insensitive, leading dot allowed).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl Default for FileFormat {
    fn default() -> Self {
        FileFormat::Txt
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|f| f.extension()).collect();
            format!("unsupported file format '{s}', expected one of: {}", known.join(", "))
        })
    }
}

/// How items without an explicit path reach the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStrategy {
    /// Write each item to a local staging file, then upload the file.
    #[default]
    Staged,
    /// Send each item's bytes directly without touching the local disk.
    InMemory,
}

fn default_concurrency() -> usize {
    1
}

fn default_upload_timeout_secs() -> u64 {
    300
}

/// Everything a single batch run needs besides the items and the store client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub bucket: String,
    /// Prepended to every destination key.
    #[serde(default)]
    pub key_prefix: Option<String>,
    #[serde(default)]
    pub filename_template: Option<String>,
    #[serde(default)]
    pub path_template: Option<String>,
    /// Directory used for synthesized keys when no path template is set.
    #[serde(default)]
    pub default_directory: Option<String>,
    /// `None` means "not set explicitly": text is written as `txt` and the
    /// Content-Type is inferred from each key's extension.
    #[serde(default)]
    pub file_format: Option<FileFormat>,
    /// Keep only the final path component of each key.
    #[serde(default)]
    pub strip_path: bool,
    /// Log per-item extraction details at info level.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub strategy: UploadStrategy,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-call timeout for object store writes; `0` disables it.
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
    /// Where staging files are written; defaults to the system temp directory.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

impl UploadConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key_prefix: None,
            filename_template: None,
            path_template: None,
            default_directory: None,
            file_format: None,
            strip_path: false,
            debug: false,
            strategy: UploadStrategy::default(),
            concurrency: default_concurrency(),
            upload_timeout_secs: default_upload_timeout_secs(),
            staging_dir: None,
        }
    }

    /// The format content is converted to and named after.
    pub fn effective_format(&self) -> FileFormat {
        self.file_format.unwrap_or_default()
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        (self.upload_timeout_secs > 0).then(|| Duration::from_secs(self.upload_timeout_secs))
    }

    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            format = %self.effective_format(),
            strategy = ?self.strategy,
            concurrency = self.concurrency,
            "Loaded UploadConfig"
        );
        debug!(?self, "UploadConfig loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_from_extensions() {
        assert_eq!("JSON".parse::<FileFormat>(), Ok(FileFormat::Json));
        assert_eq!(FileFormat::from_extension(".xlsx"), Some(FileFormat::Xlsx));
        assert!("docx".parse::<FileFormat>().is_err());
    }

    #[test]
    fn binary_formats_match_mime_table() {
        assert!(FileFormat::Parquet.is_binary());
        assert!(!FileFormat::Jsonl.is_binary());
        assert_eq!(FileFormat::Log.mime_type(), "text/plain");
        assert_eq!(FileFormat::Tsv.mime_type(), "text/tab-separated-values");
    }

    #[test]
    fn yaml_defaults_fill_optional_fields() {
        let config: UploadConfig = serde_yaml::from_str("bucket: reports\nfile_format: csv\n").unwrap();
        assert_eq!(config.bucket, "reports");
        assert_eq!(config.file_format, Some(FileFormat::Csv));
        assert_eq!(config.strategy, UploadStrategy::Staged);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.upload_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let mut config = UploadConfig::new("b");
        config.upload_timeout_secs = 0;
        assert_eq!(config.upload_timeout(), None);
    }
}
