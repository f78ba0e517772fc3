//! Core vfiles: the file store contract
//!
//! This crate defines what every backing medium agrees on:
//! - `FilePath`: validated, canonical `/`-delimited paths
//! - `FileInfo`: the metadata projection returned by `stats` and `list`
//! - `ChunkSource` / `ChunkStream`: lazy byte-chunk streams for writes and reads
//! - `FilesApi`: the async write/read/stats/list/move/remove interface
//! - `mime`: file name to content-type lookup
//!
//! Enable the `test-utils` feature to get `files_api_test_suite`, the
//! behavioural checks shared by every implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use vfiles_core_store::{chunks, FilesApi, ListOptions};
//!
//! async fn demo(store: &dyn FilesApi) -> vfiles_core_store::Result<()> {
//!     store.write("/a/b/c.txt", chunks::once("Hello, wonderful world!")).await?;
//!     for info in store.list_all("/", ListOptions::recursive()).await? {
//!         println!("{} {:?}", info.path, info.kind);
//!     }
//!     Ok(())
//! }
//! ```

pub use bytes::Bytes;

pub mod chunks;
mod error;
mod info;
pub mod mime;
mod options;
mod path;
mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod files_api_test_suite;

pub use chunks::{ChunkSource, ChunkStream, InfoStream};
pub use error::{Error, ProducerError, Result};
pub use info::{FileInfo, FileKind};
pub use options::{
    clamp_chunk_size, ListOptions, StoreOptions, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};
pub use path::{FilePath, PathError};
pub use traits::FilesApi;
