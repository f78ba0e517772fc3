//! Per-file metadata kept in `<root>/meta`, mirroring `<root>/data`.
//!
//! Each committed file has a JSON sidecar at the same relative path under
//! the meta tree. The sidecar pins the media type chosen at write time and
//! the commit timestamp, so both survive moves. A file without a readable
//! sidecar falls back to its name and mtime.

use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::warn;

use vfiles_core_store::{mime, FilePath};

use crate::staging::StagedFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMeta {
    #[serde(rename = "type")]
    pub mime_type: String,
    pub last_modified: i64,
}

pub(crate) fn timestamp_millis(time: SystemTime) -> i64 {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp_millis()
}

fn resolve_type(path: &FilePath) -> &'static str {
    path.name().map(mime::resolve).unwrap_or(mime::OCTET_STREAM)
}

impl FileMeta {
    /// Metadata for a file committed at `path` at time `at`.
    pub fn committed(path: &FilePath, at: SystemTime) -> FileMeta {
        FileMeta {
            mime_type: resolve_type(path).to_string(),
            last_modified: timestamp_millis(at),
        }
    }

    /// Metadata derived from the content file alone.
    pub fn derived(path: &FilePath, meta: &Metadata) -> io::Result<FileMeta> {
        Ok(FileMeta {
            mime_type: resolve_type(path).to_string(),
            last_modified: timestamp_millis(meta.modified()?),
        })
    }

    pub fn load_blocking(sidecar: &Path) -> Option<FileMeta> {
        decode(sidecar, std::fs::read(sidecar))
    }

    pub async fn load(sidecar: &Path) -> Option<FileMeta> {
        decode(sidecar, tokio::fs::read(sidecar).await)
    }

    /// Write the sidecar through the staging directory so it is replaced
    /// in one rename.
    pub async fn save(&self, staging_dir: &Path, sidecar: &Path, at: SystemTime) -> io::Result<()> {
        let encoded = serde_json::to_vec(self).map_err(io::Error::other)?;
        let mut staged = StagedFile::create(staging_dir).await?;
        staged.append(&encoded).await?;
        staged.commit(sidecar, at).await
    }
}

fn decode(sidecar: &Path, read: io::Result<Vec<u8>>) -> Option<FileMeta> {
    let raw = match read {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
        Err(error) => {
            warn!(path = %sidecar.display(), %error, "unreadable metadata");
            return None;
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(meta) => Some(meta),
        Err(error) => {
            warn!(path = %sidecar.display(), %error, "malformed metadata");
            None
        }
    }
}
