//! Store configuration shared by every backing medium.

use serde::{Deserialize, Serialize};

/// Default upper bound on the size of chunks handed out by `read`.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest accepted chunk size. Stores allocate a buffer of this size per
/// chunk, so larger requests are clamped.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Tunables for a file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Upper bound on the size of chunks produced by `read`. Between one
    /// byte and [`MAX_CHUNK_SIZE`].
    pub chunk_size: usize,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read chunk size, clamped to `1..=MAX_CHUNK_SIZE`.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = clamp_chunk_size(chunk_size);
        self
    }
}

/// Clamp a requested chunk size to `1..=MAX_CHUNK_SIZE`.
pub fn clamp_chunk_size(chunk_size: usize) -> usize {
    chunk_size.clamp(1, MAX_CHUNK_SIZE)
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Options for `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl ListOptions {
    pub fn recursive() -> Self {
        ListOptions { recursive: true }
    }

    /// Immediate children only.
    pub fn shallow() -> Self {
        ListOptions { recursive: false }
    }
}
