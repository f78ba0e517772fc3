//! The `FilesApi` trait: a uniform async interface over a file store.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::chunks::{self, ChunkSource, ChunkStream, InfoStream};
use crate::error::{Error, Result};
use crate::info::FileInfo;
use crate::options::ListOptions;

/// A hierarchical, path-addressed file store.
///
/// Paths are given in their external `/`-delimited form and normalized by
/// the store; malformed paths fail with [`Error::InvalidPath`].
///
/// Directories are implicit: they exist while they contain at least one
/// file and disappear with their last descendant. The root always exists.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn FilesApi>`.
///
/// # Example
///
/// ```rust,ignore
/// use vfiles_core_store::{chunks, FilesApi, ListOptions};
///
/// async fn copy(store: &dyn FilesApi, from: &str, to: &str) -> vfiles_core_store::Result<()> {
///     let data = store.read(from).await?;
///     store.write(to, chunks::pipe(data)).await
/// }
/// ```
#[async_trait]
pub trait FilesApi: Send + Sync {
    /// Consume `chunks` to exhaustion and commit them as the file at `path`.
    ///
    /// The commit is atomic: until the producer is exhausted nothing at
    /// `path` changes, and if the producer fails (or the returned future is
    /// dropped) the previous state is kept.
    async fn write(&self, path: &str, chunks: ChunkSource) -> Result<()>;

    /// Stream the committed content of the file at `path`.
    async fn read(&self, path: &str) -> Result<ChunkStream>;

    /// Metadata for the node at `path`.
    async fn stats(&self, path: &str) -> Result<FileInfo>;

    /// Pre-order listing of the directory at `path`, siblings ordered by
    /// name. The directory itself is not included.
    async fn list(&self, path: &str, options: ListOptions) -> Result<InfoStream>;

    /// Relocate the file or directory at `from` to `to`.
    async fn move_path(&self, from: &str, to: &str) -> Result<()>;

    /// Delete the node at `path` and everything below it. Removing a
    /// missing path succeeds; removing `/` empties the store.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Write `data` as a single chunk.
    async fn write_bytes(&self, path: &str, data: Bytes) -> Result<()> {
        self.write(path, chunks::once(data)).await
    }

    /// Read the whole file into memory.
    async fn read_to_bytes(&self, path: &str) -> Result<Bytes> {
        chunks::collect(self.read(path).await?).await
    }

    /// Collect a listing.
    async fn list_all(&self, path: &str, options: ListOptions) -> Result<Vec<FileInfo>> {
        chunks::collect_infos(self.list(path, options).await?).await
    }

    /// Check whether anything exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool> {
        match self.stats(path).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementations for shared and boxed stores

#[async_trait]
impl<T: FilesApi + ?Sized> FilesApi for Arc<T> {
    async fn write(&self, path: &str, chunks: ChunkSource) -> Result<()> {
        self.as_ref().write(path, chunks).await
    }

    async fn read(&self, path: &str) -> Result<ChunkStream> {
        self.as_ref().read(path).await
    }

    async fn stats(&self, path: &str) -> Result<FileInfo> {
        self.as_ref().stats(path).await
    }

    async fn list(&self, path: &str, options: ListOptions) -> Result<InfoStream> {
        self.as_ref().list(path, options).await
    }

    async fn move_path(&self, from: &str, to: &str) -> Result<()> {
        self.as_ref().move_path(from, to).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.as_ref().remove(path).await
    }
}

#[async_trait]
impl<T: FilesApi + ?Sized> FilesApi for Box<T> {
    async fn write(&self, path: &str, chunks: ChunkSource) -> Result<()> {
        self.as_ref().write(path, chunks).await
    }

    async fn read(&self, path: &str) -> Result<ChunkStream> {
        self.as_ref().read(path).await
    }

    async fn stats(&self, path: &str) -> Result<FileInfo> {
        self.as_ref().stats(path).await
    }

    async fn list(&self, path: &str, options: ListOptions) -> Result<InfoStream> {
        self.as_ref().list(path, options).await
    }

    async fn move_path(&self, from: &str, to: &str) -> Result<()> {
        self.as_ref().move_path(from, to).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.as_ref().remove(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file_path, FilePath};
    use futures::stream::{self, StreamExt};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Flat map of files; good enough to exercise the provided methods.
    struct TestStore {
        files: Mutex<BTreeMap<FilePath, Bytes>>,
    }

    impl TestStore {
        fn new() -> Self {
            Self {
                files: Mutex::new(BTreeMap::new()),
            }
        }
    }

    #[async_trait]
    impl FilesApi for TestStore {
        async fn write(&self, path: &str, mut chunks: ChunkSource) -> Result<()> {
            let path = FilePath::parse(path)?;
            let mut data = Vec::new();
            while let Some(chunk) = chunks.next().await {
                data.extend_from_slice(&chunk?);
            }
            self.files.lock().unwrap().insert(path, Bytes::from(data));
            Ok(())
        }

        async fn read(&self, path: &str) -> Result<ChunkStream> {
            let path = FilePath::parse(path)?;
            let data = self.files.lock().unwrap().get(&path).cloned();
            data.map(|d| chunks::split(d, 4))
                .ok_or(Error::NotFound { path })
        }

        async fn stats(&self, path: &str) -> Result<FileInfo> {
            let path = FilePath::parse(path)?;
            let size = self.files.lock().unwrap().get(&path).map(|d| d.len());
            size.map(|size| FileInfo::file(path.clone(), size as u64, "text/plain", 0))
                .ok_or(Error::NotFound { path })
        }

        async fn list(&self, _path: &str, _options: ListOptions) -> Result<InfoStream> {
            let infos: Vec<Result<FileInfo>> = self
                .files
                .lock()
                .unwrap()
                .iter()
                .map(|(path, data)| Ok(FileInfo::file(path.clone(), data.len() as u64, "", 0)))
                .collect();
            Ok(stream::iter(infos).boxed())
        }

        async fn move_path(&self, _from: &str, _to: &str) -> Result<()> {
            Ok(())
        }

        async fn remove(&self, path: &str) -> Result<()> {
            let path = FilePath::parse(path)?;
            self.files.lock().unwrap().remove(&path);
            Ok(())
        }
    }

    #[tokio::test]
    async fn provided_methods_work() {
        let store = TestStore::new();
        store
            .write_bytes("/a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert_eq!(&store.read_to_bytes("/a.txt").await.unwrap()[..], b"hello");
        assert!(store.exists("a.txt").await.unwrap());
        assert!(!store.exists("/b.txt").await.unwrap());
        assert!(store.exists("/a//b").await.is_err());

        let all = store.list_all("/", ListOptions::recursive()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, file_path!("/a.txt"));
    }

    #[tokio::test]
    async fn object_safety_works() {
        let store: Arc<dyn FilesApi> = Arc::new(TestStore::new());
        store
            .write("/x", chunks::from_iter(vec!["ab", "cd"]))
            .await
            .unwrap();
        assert_eq!(&store.read_to_bytes("/x").await.unwrap()[..], b"abcd");

        let boxed: Box<dyn FilesApi> = Box::new(TestStore::new());
        assert!(boxed.read("/x").await.err().unwrap().is_not_found());
    }
}
