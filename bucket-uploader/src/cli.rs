//! Command-line surface of bucket-uploader.
//!
//! Parses arguments, loads the YAML config, builds the batch from input files
//! and flags, and hands everything to [`bucket_uploader_core::upload_batch`].
//! Pipeline logic stays in the core crate; this module only wires it to S3 and
//! reports the result on stdout.

use crate::inputs::collect_inputs;
use crate::load_config::load_config;
use crate::s3::S3ObjectStore;
use anyhow::Result;
use bucket_uploader_core::config::{FileFormat, UploadConfig};
use bucket_uploader_core::contract::{InputItem, ObjectStore};
use bucket_uploader_core::report::BatchReport;
use bucket_uploader_core::upload_batch;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for bucket-uploader: push loosely-typed content into an object storage bucket.
#[derive(Parser)]
#[clap(
    name = "bucket-uploader",
    version,
    about = "Upload text, tables, records and files to an S3-compatible bucket"
)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a batch of items using the given config file
    Upload {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,

        /// JSON or JSON Lines file with the items to upload
        #[clap(long)]
        input: Option<PathBuf>,

        /// Local file to upload as-is (repeatable)
        #[clap(long = "file")]
        files: Vec<PathBuf>,

        /// Literal text item (repeatable)
        #[clap(long = "text")]
        texts: Vec<String>,

        /// Override the configured bucket
        #[clap(long)]
        bucket: Option<String>,

        /// Override the configured key prefix
        #[clap(long)]
        prefix: Option<String>,

        /// Override the configured file format
        #[clap(long)]
        format: Option<FileFormat>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Upload {
            config,
            input,
            files,
            texts,
            bucket,
            prefix,
            format,
        } => {
            let mut config = load_config(config)?;
            apply_overrides(&mut config.upload, bucket, prefix, format);
            let items = collect_inputs(input.as_deref(), &files, &texts)?;
            tracing::info!(command = "upload", items = items.len(), bucket = %config.upload.bucket, "Starting upload");

            let store = S3ObjectStore::new(&config.s3).await?;
            let report = execute(&config.upload, &store, &items).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if report.success {
                tracing::info!(command = "upload", uploaded = report.uploaded_count, "Upload complete");
                Ok(())
            } else {
                tracing::error!(command = "upload", failed = report.failed_count, "Upload finished with failures");
                Err(anyhow::anyhow!(
                    "{} of {} items failed to upload",
                    report.failed_count,
                    report.total
                ))
            }
        }
    }
}

/// Runs one batch against `store`, turning a whole-batch failure into an `anyhow::Error`.
pub async fn execute<S>(config: &UploadConfig, store: &S, items: &[InputItem]) -> Result<BatchReport>
where
    S: ObjectStore + ?Sized,
{
    match upload_batch(config, store, items).await {
        Ok(report) => Ok(report),
        Err(e) => {
            tracing::error!(command = "upload", error = %e, "Upload aborted");
            Err(anyhow::Error::new(e))
        }
    }
}

/// Command-line values win over the config file.
pub fn apply_overrides(
    config: &mut UploadConfig,
    bucket: Option<String>,
    prefix: Option<String>,
    format: Option<FileFormat>,
) {
    if let Some(bucket) = bucket {
        config.bucket = bucket;
    }
    if let Some(prefix) = prefix {
        config.key_prefix = Some(prefix);
    }
    if let Some(format) = format {
        config.file_format = Some(format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeatable_items_and_overrides() {
        let cli = Cli::try_parse_from([
            "bucket-uploader",
            "upload",
            "--config",
            "c.yaml",
            "--text",
            "a",
            "--text",
            "b",
            "--file",
            "x.csv",
            "--format",
            "json",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Upload { texts, files, format, .. } = cli.command;
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(files, vec![PathBuf::from("x.csv")]);
        assert_eq!(format, Some(FileFormat::Json));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let parsed = Cli::try_parse_from(["bucket-uploader", "upload", "--config", "c.yaml", "--format", "docx"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = UploadConfig::new("from-file");
        config.key_prefix = Some("old".into());
        apply_overrides(&mut config, Some("from-flag".into()), None, Some(FileFormat::Csv));
        assert_eq!(config.bucket, "from-flag");
        assert_eq!(config.key_prefix.as_deref(), Some("old"));
        assert_eq!(config.file_format, Some(FileFormat::Csv));
    }
}
