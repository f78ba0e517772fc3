//! Metadata records returned by `stats` and `list`.

use serde::{Deserialize, Serialize};

use crate::path::FilePath;

/// What a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// Read-only projection of a node.
///
/// `size`, `type` and `lastModified` are only present for files and are
/// omitted from the serialized form of directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: FilePath,
    pub name: String,
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Commit time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl FileInfo {
    pub fn directory(path: FilePath) -> Self {
        FileInfo {
            name: path.name().unwrap_or_default().to_string(),
            path,
            kind: FileKind::Directory,
            size: None,
            mime_type: None,
            last_modified: None,
        }
    }

    pub fn file(
        path: FilePath,
        size: u64,
        mime_type: impl Into<String>,
        last_modified: i64,
    ) -> Self {
        FileInfo {
            name: path.name().unwrap_or_default().to_string(),
            path,
            kind: FileKind::File,
            size: Some(size),
            mime_type: Some(mime_type.into()),
            last_modified: Some(last_modified),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }
}
