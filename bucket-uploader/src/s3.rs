//! [`ObjectStore`] implementation over the AWS S3 SDK.
//!
//! Works against AWS itself and S3-compatible services (MinIO, LocalStack) via
//! `endpoint_url` and `force_path_style`. Credentials come from the standard
//! AWS provider chain (environment, profile, instance metadata).

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bucket_uploader_core::contract::ObjectStore;
use bucket_uploader_core::error::ObjectStoreError;
use serde::Deserialize;
use tracing::{debug, info};

/// Connection settings read from the `s3:` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Settings {
    /// Falls back to the provider chain (`AWS_REGION`, profile) when unset.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub async fn new(settings: &S3Settings) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let aws_config = loader.load().await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);
        if let Some(endpoint_url) = &settings.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }
        if settings.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }
        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            region = ?aws_config.region(),
            endpoint_url = ?settings.endpoint_url,
            force_path_style = settings.force_path_style,
            "S3 client initialized"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(map_sdk_error)?;
        debug!(bucket, "Bucket is accessible");
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            ObjectStoreError::Other(format!("failed to read {}: {e}", local_path.display()))
        })?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }
}

/// Sorts an SDK failure into not-found, access-denied or anything else.
/// HEAD responses carry no body, so the HTTP status is checked before the error code.
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> ObjectStoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    match (status, code.as_deref()) {
        (Some(404), _) | (_, Some("NoSuchBucket" | "NotFound")) => ObjectStoreError::NotFound(message),
        (Some(403), _) | (_, Some("AccessDenied" | "Forbidden")) => ObjectStoreError::AccessDenied(message),
        _ => ObjectStoreError::Other(message),
    }
}
