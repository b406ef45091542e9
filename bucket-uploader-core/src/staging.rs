//! Local staging files for items that have no explicit source path.
//!
//! Every file written through a [`StagingArea`] is held as a
//! [`tempfile::TempPath`], so it is removed by [`StagingArea::cleanup`] or, at
//! the latest, when the area is dropped. Removal failures are logged and
//! otherwise ignored.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::{Builder, TempPath};
use tracing::{debug, error, warn};

pub struct StagingArea {
    dir: PathBuf,
    files: Mutex<Vec<TempPath>>,
}

impl StagingArea {
    /// Staging files go to `dir`, or the system temp directory when `None`.
    pub fn new(dir: Option<&Path>) -> Self {
        Self {
            dir: dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            files: Mutex::new(Vec::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `content` to a fresh file named `<index>_<random>_<filename>`,
    /// where `filename` is the final component of `key`, so the extension is kept.
    ///
    /// The write runs on the blocking pool; items of a batch may be staged concurrently.
    pub async fn stage(&self, index: usize, key: &str, content: Vec<u8>) -> std::io::Result<PathBuf> {
        let filename = key.rsplit('/').next().unwrap_or(key).to_string();
        let dir = self.dir.clone();

        let temp_path = tokio::task::spawn_blocking(move || write_staging_file(&dir, index, &filename, &content))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        let path = temp_path.to_path_buf();
        debug!(path = %path.display(), "Created staging file");
        self.lock_files().push(temp_path);
        Ok(path)
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, Vec<TempPath>> {
        match self.files.lock() {
            Ok(files) => files,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Paths currently held for removal.
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.lock_files().iter().map(|p| p.to_path_buf()).collect()
    }

    /// Removes every held file. Safe to call more than once.
    pub fn cleanup(&self) {
        let files = std::mem::take(&mut *self.lock_files());
        for temp_path in files {
            let path = temp_path.to_path_buf();
            match temp_path.close() {
                Ok(()) => debug!(path = %path.display(), "Cleaned up staging file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to clean up staging file"),
            }
        }
    }
}

/// A file that fails halfway is removed when its `NamedTempFile` drops.
fn write_staging_file(dir: &Path, index: usize, filename: &str, content: &[u8]) -> std::io::Result<TempPath> {
    let mut file = Builder::new()
        .prefix(&format!("{index}_"))
        .suffix(&format!("_{filename}"))
        .tempfile_in(dir)
        .map_err(|e| {
            error!(error = ?e, dir = %dir.display(), "Failed to create staging file");
            e
        })?;
    file.write_all(content)?;
    file.flush()?;
    Ok(file.into_temp_path())
}
