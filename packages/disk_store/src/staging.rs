//! Private scratch files for writes in progress.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

const STAGED_EXTENSION: &str = "part";

/// Content of one write that has not been committed yet.
///
/// The file lives in the staging directory under a random name, so
/// nothing in the namespace can observe it. Dropping a `StagedFile`
/// without calling [`StagedFile::commit`] deletes it; this covers producer
/// failures, I/O errors and writes whose future was dropped mid-stream.
pub(crate) struct StagedFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    committed: bool,
}

impl StagedFile {
    pub async fn create(staging_dir: &Path) -> io::Result<StagedFile> {
        let path = staging_dir.join(format!("{}.{}", Uuid::new_v4(), STAGED_EXTENSION));
        let file = File::create(&path).await?;
        Ok(StagedFile {
            path,
            file: Some(file),
            written: 0,
            committed: false,
        })
    }

    pub async fn append(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("staged file already finished"))?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the file. Returns the number of bytes staged.
    pub async fn finish(&mut self) -> io::Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(self.written)
    }

    /// Move the staged content to `target`, replacing any file there.
    /// The file's mtime is set to `modified` before it becomes visible.
    pub async fn commit(mut self, target: &Path, modified: SystemTime) -> io::Result<()> {
        self.finish().await?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::OpenOptions::new()
                .write(true)
                .open(path)?
                .set_modified(modified)
        })
        .await
        .map_err(io::Error::other)??;
        fs::rename(&self.path, target).await?;
        self.committed = true;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        if let Err(error) = std::fs::remove_file(&self.path) {
            if error.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), %error, "failed to discard staged file");
            }
        }
    }
}

/// Delete staged files left behind by a previous process.
pub(crate) fn discard_stale(staging_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(staging_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == STAGED_EXTENSION) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(error) => warn!(path = %path.display(), %error, "failed to discard stale staged file"),
            }
        }
    }
    Ok(removed)
}
