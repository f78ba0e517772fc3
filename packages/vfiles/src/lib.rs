//! vfiles: a virtual hierarchical file store.
//!
//! Files are addressed by `/`-delimited paths, written from and read as
//! lazy byte-chunk streams, and committed atomically. Directories are
//! implicit: they exist while something is stored beneath them.
//!
//! Two backing media implement the same [`FilesApi`]:
//! - [`MemoryStore`] keeps everything in memory
//! - [`DiskStore`] persists to a local directory
//!
//! # Example
//!
//! ```rust
//! use vfiles::{chunks, FilesApi, ListOptions, MemoryStore};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = MemoryStore::new();
//! store
//!     .write("/a/b/c.txt", chunks::from_iter(["Hello, ", "wonderful world!"]))
//!     .await?;
//!
//! let paths: Vec<String> = store
//!     .list_all("/", ListOptions::recursive())
//!     .await?
//!     .into_iter()
//!     .map(|info| info.path.to_string())
//!     .collect();
//! assert_eq!(paths, ["/a", "/a/b", "/a/b/c.txt"]);
//!
//! store.move_path("/a/b/c.txt", "/c.txt").await?;
//! assert!(!store.exists("/a").await?);
//! # Ok::<(), vfiles::Error>(())
//! # }).unwrap();
//! ```

pub use vfiles_core_store::*;
pub use vfiles_disk_store::{DiskStore, DiskStoreError};
pub use vfiles_memory_store::MemoryStore;

/// The in-memory node tree, for callers that want to drive it directly.
pub use vfiles_memory_store::tree;
