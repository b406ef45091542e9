use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Creates a config file whose bucket is blank, so the run stops before any network call.
fn create_blank_bucket_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), b"upload:\n  bucket: \"\"\n  file_format: txt\n").expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_upload_command() {
    let mut cmd = Command::cargo_bin("bucket-uploader").expect("Binary exists");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"));
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = Command::cargo_bin("bucket-uploader").expect("Binary exists");
    cmd.args(["upload", "--config", "/definitely/not/here.yaml", "--text", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn unknown_format_flag_is_rejected_by_parser() {
    let config = create_blank_bucket_config();
    let mut cmd = Command::cargo_bin("bucket-uploader").expect("Binary exists");
    cmd.arg("upload")
        .arg("--config")
        .arg(config.path())
        .args(["--format", "docx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file format"));
}

#[test]
fn blank_bucket_aborts_without_report() {
    let config = create_blank_bucket_config();
    let mut cmd = Command::cargo_bin("bucket-uploader").expect("Binary exists");
    cmd.arg("upload")
        .arg("--config")
        .arg(config.path())
        .args(["--text", "hello world"])
        .env("AWS_REGION", "us-east-1")
        .assert()
        .failure()
        .stdout(predicate::str::contains("uploaded_count").not())
        .stderr(predicate::str::contains("bucket name is required"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector { events: events.clone() };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use bucket_uploader::cli::{run, Cli, Commands};

    let cli = Cli {
        verbose: false,
        command: Commands::Upload {
            config: std::path::PathBuf::from("dummy.yaml"),
            input: None,
            files: Vec::new(),
            texts: vec!["hello".to_string()],
            bucket: None,
            prefix: None,
            format: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy.yaml does not exist");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("Failed to read config file")),
        "Expected the config read failure to be logged, got: {:?}",
        event_msgs
    );
}
