//! Loads the static YAML config file into the typed [`CliConfig`].
//!
//! The file has two sections:
//!
//! ```yaml
//! upload:
//!   bucket: my-bucket
//!   key_prefix: exports
//!   file_format: json
//!   filename_template: "report_{date}_{index}"
//! s3:
//!   region: eu-west-1
//!   endpoint_url: http://localhost:9000
//!   force_path_style: true
//! ```
//!
//! No secrets belong here: credentials come from the AWS provider chain, and a
//! `.env` file is loaded by the binary at startup. Every failure is returned as
//! an `anyhow::Error` naming the file.

use anyhow::Result;
use bucket_uploader_core::config::UploadConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::s3::S3Settings;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub upload: UploadConfig,
    pub s3: S3Settings,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        upload: UploadConfig,
        #[serde(default)]
        s3: S3Settings,
    }

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    raw.upload.trace_loaded();

    Ok(CliConfig {
        upload: raw.upload,
        s3: raw.s3,
    })
}
