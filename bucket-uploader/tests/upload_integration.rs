//! Drives config loading, input collection and the batch run together, with
//! the object store mocked.

use std::fs::write;
use std::sync::{Arc, Mutex};

use bucket_uploader::cli::{apply_overrides, execute};
use bucket_uploader::inputs::collect_inputs;
use bucket_uploader::load_config::load_config;
use bucket_uploader_core::config::FileFormat;
use bucket_uploader_core::contract::MockObjectStore;
use bucket_uploader_core::error::ObjectStoreError;
use tempfile::{tempdir, NamedTempFile};

#[tokio::test]
async fn input_file_and_flags_upload_in_order() {
    let staging = tempdir().unwrap();
    let config_file = NamedTempFile::new().unwrap();
    write(
        config_file.path(),
        format!(
            "upload:\n  bucket: from-file\n  strategy: in_memory\n  staging_dir: {}\n",
            staging.path().display()
        ),
    )
    .unwrap();

    let source_dir = tempdir().unwrap();
    let local = source_dir.path().join("notes.md");
    write(&local, "# notes").unwrap();

    let input_file = source_dir.path().join("batch.json");
    write(
        &input_file,
        r#"["plain text", {"columns": ["a"], "rows": [["1"]]}, {"path": "data/report.csv", "text": "x,y"}]"#,
    )
    .unwrap();

    let mut config = load_config(config_file.path()).unwrap();
    apply_overrides(&mut config.upload, Some("override-bucket".into()), Some("run-1".into()), None);
    let items = collect_inputs(Some(&input_file), &[local.clone()], &["tail".to_string()]).unwrap();

    let keys = Arc::new(Mutex::new(Vec::new()));
    let put_keys = keys.clone();
    let file_keys = keys.clone();
    let mut store = MockObjectStore::new();
    store
        .expect_head_bucket()
        .withf(|bucket| bucket == "override-bucket")
        .times(1)
        .returning(|_| Ok(()));
    store.expect_put_object().returning(move |_, key: &str, _, _| {
        put_keys.lock().unwrap().push(key.to_string());
        Ok(())
    });
    store.expect_upload_file().returning(move |_, key: &str, _, _| {
        file_keys.lock().unwrap().push(key.to_string());
        Ok(())
    });

    let report = execute(&config.upload, &store, &items).await.unwrap();

    assert!(report.success);
    assert_eq!(report.total, 5);
    let keys: Vec<&str> = report.uploads.iter().map(|u| u.key.as_str()).collect();
    assert!(keys[0].starts_with("run-1/data_") && keys[0].ends_with("_1.txt"));
    assert!(keys[1].ends_with("_2.txt"));
    assert_eq!(keys[2], "run-1/data/report.csv");
    assert!(keys[3].starts_with("run-1/") && keys[3].ends_with("notes.md"));
    assert!(keys[4].ends_with("_5.txt"));
    assert!(report.uploads.iter().all(|u| u.bucket == "override-bucket"));
    assert_eq!(report.uploads[3].source.as_deref(), Some(local.to_string_lossy().as_ref()));
}

#[tokio::test]
async fn failed_items_are_reported_and_serialized() {
    let staging = tempdir().unwrap();
    let mut config = bucket_uploader_core::UploadConfig::new("bucket");
    config.staging_dir = Some(staging.path().to_path_buf());
    config.file_format = Some(FileFormat::Txt);

    let items = collect_inputs(None, &[], &["ok".to_string(), "denied".to_string()]).unwrap();

    let mut store = MockObjectStore::new();
    store.expect_head_bucket().returning(|_| Ok(()));
    store.expect_upload_file().returning(|_, key: &str, _, _| {
        if key.ends_with("_2.txt") {
            Err(ObjectStoreError::AccessDenied("403".into()))
        } else {
            Ok(())
        }
    });

    let report = execute(&config, &store, &items).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["success"], false);
    assert_eq!(json["uploaded_count"], 1);
    assert_eq!(json["failed_count"], 1);
    assert_eq!(json["errors"][0]["index"], 2);
    assert_eq!(json["errors"][0]["source_tag"], "string");
}

#[tokio::test]
async fn bucket_failure_becomes_anyhow_error() {
    let mut store = MockObjectStore::new();
    store
        .expect_head_bucket()
        .returning(|_| Err(ObjectStoreError::NotFound("404".into())));

    let config = bucket_uploader_core::UploadConfig::new("missing");
    let items = collect_inputs(None, &[], &["x".to_string()]).unwrap();

    let err = execute(&config, &store, &items).await.unwrap_err();
    assert!(err.to_string().contains("'missing' does not exist"));
}
