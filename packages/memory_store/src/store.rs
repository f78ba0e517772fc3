//! `FilesApi` over the in-memory node tree.

use async_trait::async_trait;
use bytes::BytesMut;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use vfiles_core_store::{
    chunks, mime, ChunkSource, ChunkStream, Error, FileInfo, FilePath, FilesApi, InfoStream,
    ListOptions, Result, StoreOptions,
};

use crate::tree::{Directory, FileNode, NodeRef};

/// A file store that keeps everything in memory.
///
/// One `RwLock` guards the whole tree. Producers and readers are driven
/// outside of it: a write buffers its chunks privately and only takes the
/// write guard to commit, and a read hands out a snapshot of the committed
/// bytes.
///
/// # Example
///
/// ```rust
/// use vfiles_core_store::{chunks, FilesApi, ListOptions};
/// use vfiles_memory_store::MemoryStore;
///
/// # tokio_test_block_on(async {
/// let store = MemoryStore::new();
/// store.write("/a/b/c.txt", chunks::once("Hello")).await.unwrap();
///
/// let listing = store.list_all("/", ListOptions::recursive()).await.unwrap();
/// assert_eq!(listing.len(), 3);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct MemoryStore {
    root: RwLock<Directory>,
    options: StoreOptions,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        let chunk_size = options.chunk_size;
        Self {
            root: RwLock::new(Directory::new()),
            options: options.with_chunk_size(chunk_size),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilesApi for MemoryStore {
    async fn write(&self, path: &str, mut chunks: ChunkSource) -> Result<()> {
        let path = FilePath::parse(path)?;
        self.root.read().await.check_file_slot(&path)?;

        let mut staged = BytesMut::new();
        let mut received = 0usize;
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    received += 1;
                    trace!(path = %path, len = chunk.len(), "received chunk");
                    staged.extend_from_slice(&chunk);
                }
                Err(e) => {
                    warn!(path = %path, staged = staged.len(), error = %e, "write aborted");
                    return Err(e.into());
                }
            }
        }

        let mime_type = path.name().map(mime::resolve).unwrap_or(mime::OCTET_STREAM);
        let data = staged.freeze();

        let mut root = self.root.write().await;
        // Stamped once the guard is held, so the time is the commit time.
        let file = FileNode::new(data, mime_type, chrono::Utc::now().timestamp_millis());
        let size = file.size();
        let replaced = root.put_file(&path, file)?;
        debug!(
            path = %path,
            size,
            chunks = received,
            replaced = replaced.is_some(),
            "committed file"
        );
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<ChunkStream> {
        let path = FilePath::parse(path)?;
        let root = self.root.read().await;
        match root.resolve(&path) {
            Some(NodeRef::File(file)) => Ok(chunks::split(file.data.clone(), self.options.chunk_size)),
            Some(NodeRef::Directory(_)) => Err(Error::NotAFile { path }),
            None => Err(Error::NotFound { path }),
        }
    }

    async fn stats(&self, path: &str) -> Result<FileInfo> {
        let path = FilePath::parse(path)?;
        let root = self.root.read().await;
        match root.resolve(&path) {
            Some(node) => Ok(node.info(path)),
            None => Err(Error::NotFound { path }),
        }
    }

    async fn list(&self, path: &str, options: ListOptions) -> Result<InfoStream> {
        let path = FilePath::parse(path)?;
        let entries = {
            let root = self.root.read().await;
            match root.resolve(&path) {
                Some(NodeRef::Directory(dir)) => dir.entries(&path, options.recursive)?,
                Some(NodeRef::File(_)) => return Err(Error::NotADirectory { path }),
                None => return Err(Error::NotFound { path }),
            }
        };
        Ok(stream::iter(entries.into_iter().map(Ok)).boxed())
    }

    async fn move_path(&self, from: &str, to: &str) -> Result<()> {
        let from = FilePath::parse(from)?;
        let to = FilePath::parse(to)?;
        self.root.write().await.move_subtree(&from, &to)?;
        debug!(from = %from, to = %to, "moved");
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = FilePath::parse(path)?;
        let removed = self.root.write().await.remove_subtree(&path);
        debug!(path = %path, found = removed.is_some(), "removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn read_uses_configured_chunk_size() {
        let store = MemoryStore::with_options(StoreOptions::new().with_chunk_size(4));
        store
            .write("/n.txt", chunks::once("0123456789"))
            .await
            .unwrap();

        let sizes: Vec<usize> = store
            .read("/n.txt")
            .await
            .unwrap()
            .map(|c| c.unwrap().len())
            .collect()
            .await;
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn write_sets_type_and_timestamp() {
        let store = MemoryStore::new();
        let before = chrono::Utc::now().timestamp_millis();
        store
            .write_bytes("/img/logo.PNG", Bytes::from_static(&[0x89, b'P', b'N', b'G']))
            .await
            .unwrap();

        let info = store.stats("/img/logo.PNG").await.unwrap();
        assert_eq!(info.mime_type.as_deref(), Some("image/png"));
        assert_eq!(info.size, Some(4));
        assert!(info.last_modified.unwrap() >= before);
    }

    #[tokio::test]
    async fn invalid_paths_rejected_everywhere() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.write("/a//b", chunks::once("x")).await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(store.read("/a/..").await, Err(Error::InvalidPath { .. })));
        assert!(matches!(
            store.list("//", ListOptions::default()).await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            store.move_path("/a", "/./b").await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(store.remove("/a//").await, Err(Error::InvalidPath { .. })));
    }

    #[tokio::test]
    async fn producer_is_not_consumed_when_target_is_blocked() {
        let store = MemoryStore::new();
        store.write("/f", chunks::once("x")).await.unwrap();

        let consumed = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = consumed.clone();
        let source = stream::once(async move {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(Bytes::from_static(b"y"))
        })
        .boxed();

        assert!(matches!(
            store.write("/f/g", source).await,
            Err(Error::NotADirectory { .. })
        ));
        assert!(!consumed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn listing_is_a_snapshot() {
        let store = MemoryStore::new();
        store.write("/a.txt", chunks::once("a")).await.unwrap();
        let listing = store.list("/", ListOptions::recursive()).await.unwrap();

        store.write("/b.txt", chunks::once("b")).await.unwrap();
        let infos = chunks::collect_infos(listing).await.unwrap();
        assert_eq!(infos.len(), 1);
    }
}
