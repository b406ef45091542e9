#![doc = "bucket-uploader-core: content ingestion and object storage upload pipeline."]

//! This crate contains the vendor-neutral pipeline that turns a batch of
//! loosely-typed inputs into objects in a bucket. Concrete object store clients
//! live outside it and plug in through [`contract::ObjectStore`].
//!
//! # Usage
//! Build an [`config::UploadConfig`], collect [`contract::InputItem`]s and call
//! [`upload::upload_batch`] with any `ObjectStore` implementation.

pub mod classify;
pub mod config;
pub mod contract;
pub mod convert;
pub mod delimited;
pub mod error;
pub mod extract;
pub mod naming;
pub mod report;
pub mod staging;
pub mod upload;

pub use config::{FileFormat, UploadConfig, UploadStrategy};
pub use contract::{InputItem, ObjectStore};
pub use error::{BatchError, ItemError, ObjectStoreError};
pub use report::BatchReport;
pub use upload::{upload_batch, upload_batch_at};
