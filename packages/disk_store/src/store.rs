use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use vfiles_core_store::{
    ChunkSource, ChunkStream, Error, FileInfo, FilePath, FilesApi, InfoStream, ListOptions,
    Result, StoreOptions,
};

use crate::error::DiskStoreError;
use crate::metadata::FileMeta;
use crate::staging::{self, StagedFile};

const DATA_DIR: &str = "data";
const META_DIR: &str = "meta";
const STAGING_DIR: &str = "staging";

/// A file store rooted in a local directory.
///
/// Files and directories under `<root>/data` are the namespace. Like the
/// in-memory store, directories exist only while they have descendants.
/// `<root>/meta` follows the same shape with one sidecar per file.
pub struct DiskStore {
    root: PathBuf,
    data: PathBuf,
    meta: PathBuf,
    staging: PathBuf,
    // Serializes structural changes against each other and against
    // lookups. Never held while a producer is pending.
    lock: RwLock<()>,
    options: StoreOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Directory,
}

impl DiskStore {
    pub fn open(root: impl Into<PathBuf>) -> std::result::Result<DiskStore, DiskStoreError> {
        Self::open_with_options(root, StoreOptions::default())
    }

    pub fn open_with_options(
        root: impl Into<PathBuf>,
        options: StoreOptions,
    ) -> std::result::Result<DiskStore, DiskStoreError> {
        let root = root.into();
        let attr = std::fs::metadata(&root).map_err(|error| DiskStoreError::RootPathInvalid {
            path: root.clone(),
            error,
        })?;

        if !attr.is_dir() {
            return Err(DiskStoreError::RootPathInvalid {
                path: root,
                error: io::Error::other("Root path must be a directory."),
            });
        }

        if attr.permissions().readonly() {
            return Err(DiskStoreError::RootPathInvalid {
                path: root,
                error: io::Error::other("Root directory must be writable"),
            });
        }

        let root = root
            .canonicalize()
            .map_err(|error| DiskStoreError::RootPathInvalid { path: root, error })?;

        let data = root.join(DATA_DIR);
        let meta = root.join(META_DIR);
        let staging = root.join(STAGING_DIR);
        for dir in [&data, &meta, &staging] {
            std::fs::create_dir_all(dir).map_err(|error| DiskStoreError::Layout {
                path: dir.clone(),
                error,
            })?;
        }
        let discarded =
            staging::discard_stale(&staging).map_err(|error| DiskStoreError::Layout {
                path: staging.clone(),
                error,
            })?;
        if discarded > 0 {
            warn!(count = discarded, "discarded unfinished writes from a previous run");
        }

        debug!(root = %root.display(), "opened disk store");
        let chunk_size = options.chunk_size;
        Ok(DiskStore {
            root,
            data,
            meta,
            staging,
            lock: RwLock::new(()),
            options: options.with_chunk_size(chunk_size),
        })
    }

    /// The canonicalized directory the store was opened on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    fn disk_path(&self, path: &FilePath) -> PathBuf {
        tree_path(&self.data, path)
    }

    fn sidecar_path(&self, path: &FilePath) -> PathBuf {
        tree_path(&self.meta, path)
    }

    /// Metadata for `path`, or `None` if nothing is there. Descending into a
    /// file counts as nothing being there.
    async fn probe(&self, path: &FilePath) -> Result<Option<(Kind, Metadata)>> {
        match fs::symlink_metadata(self.disk_path(path)).await {
            Ok(meta) if meta.is_dir() => Ok(Some((Kind::Directory, meta))),
            Ok(meta) => Ok(Some((Kind::File, meta))),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn kind(&self, path: &FilePath) -> Result<Option<Kind>> {
        Ok(self.probe(path).await?.map(|(kind, _)| kind))
    }

    /// Check that a file could be committed at `path`.
    async fn check_file_slot(&self, path: &FilePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::invalid_path(path, "the root is always a directory"));
        }
        for depth in 1..path.len() {
            let ancestor = path.slice(0, depth);
            match self.kind(&ancestor).await? {
                None => return Ok(()),
                Some(Kind::File) => return Err(Error::NotADirectory { path: ancestor }),
                Some(Kind::Directory) => {}
            }
        }
        match self.kind(path).await? {
            Some(Kind::Directory) => Err(Error::NotADirectory { path: path.clone() }),
            _ => Ok(()),
        }
    }

    async fn ensure_parent(&self, path: &FilePath) -> Result<()> {
        Ok(create_parent(&self.data, path).await?)
    }

    async fn prune_empty_ancestors(&self, path: &FilePath) {
        prune_empty_ancestors(&self.data, path).await;
        prune_empty_ancestors(&self.meta, path).await;
    }

    /// Record the sidecar of a file committed at `at`. On failure the old
    /// sidecar is dropped and the file falls back to derived metadata.
    async fn record_metadata(&self, path: &FilePath, at: SystemTime) {
        let sidecar = self.sidecar_path(path);
        let saved = match create_parent(&self.meta, path).await {
            Ok(()) => FileMeta::committed(path, at).save(&self.staging, &sidecar, at).await,
            Err(e) => Err(e),
        };
        if let Err(error) = saved {
            warn!(path = %path, %error, "failed to record file metadata");
            discard_sidecar(&sidecar).await;
        }
    }

    /// Carry the sidecars of `from` over to `to` after the content moved.
    async fn move_metadata(&self, from: &FilePath, to: &FilePath) {
        let source = self.sidecar_path(from);
        let target = self.sidecar_path(to);
        let moved = match create_parent(&self.meta, to).await {
            Ok(()) => fs::rename(&source, &target).await,
            Err(e) => Err(e),
        };
        match moved {
            Ok(()) => {}
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(from = %from, to = %to, %error, "failed to move file metadata");
                    discard_sidecar(&source).await;
                }
                discard_sidecar(&target).await;
                prune_empty_ancestors(&self.meta, to).await;
            }
        }
        prune_empty_ancestors(&self.meta, from).await;
    }

    async fn clear(&self) -> Result<usize> {
        clear_dir(&self.meta).await?;
        Ok(clear_dir(&self.data).await?)
    }
}

fn tree_path(tree: &Path, path: &FilePath) -> PathBuf {
    let mut disk = tree.to_path_buf();
    disk.extend(path.segments());
    disk
}

async fn create_parent(tree: &Path, path: &FilePath) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(tree_path(tree, &parent)).await?;
    }
    Ok(())
}

/// Remove ancestors of `path` inside `tree` that are left without
/// children, deepest first, stopping at the first one that still has some.
async fn prune_empty_ancestors(tree: &Path, path: &FilePath) {
    for ancestor in path.ancestors() {
        if fs::remove_dir(tree_path(tree, &ancestor)).await.is_err() {
            break;
        }
        trace!(path = %ancestor, tree = %tree.display(), "pruned empty directory");
    }
}

async fn remove_entry(disk: &Path) -> io::Result<()> {
    if fs::symlink_metadata(disk).await?.is_dir() {
        fs::remove_dir_all(disk).await
    } else {
        fs::remove_file(disk).await
    }
}

async fn discard_sidecar(sidecar: &Path) {
    match remove_entry(sidecar).await {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => warn!(path = %sidecar.display(), %error, "failed to discard file metadata"),
    }
}

async fn clear_dir(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        remove_entry(&entry.path()).await?;
        removed += 1;
    }
    Ok(removed)
}

fn store_path(data: &Path, disk: &Path) -> Result<FilePath> {
    let relative = disk.strip_prefix(data).map_err(|_| {
        Error::Io(io::Error::other(format!(
            "{} is outside of the store",
            disk.display()
        )))
    })?;
    let segments = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        });
    Ok(FilePath::try_from_segments(segments)?)
}

fn file_info(
    path: FilePath,
    kind: Kind,
    meta: &Metadata,
    sidecar: Option<FileMeta>,
) -> Result<FileInfo> {
    match kind {
        Kind::Directory => Ok(FileInfo::directory(path)),
        Kind::File => {
            let file_meta = match sidecar {
                Some(file_meta) => file_meta,
                None => FileMeta::derived(&path, meta)?,
            };
            Ok(FileInfo::file(
                path,
                meta.len(),
                file_meta.mime_type,
                file_meta.last_modified,
            ))
        }
    }
}

/// Pre-order walk of the directory `base` inside `data`, siblings in name
/// order. File sidecars are looked up under `meta`.
fn walk(data: &Path, meta: &Path, base: &Path, recursive: bool) -> Result<Vec<FileInfo>> {
    let mut walker = walkdir::WalkDir::new(base)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut infos = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let path = store_path(data, entry.path())?;
        let kind = if entry.file_type().is_dir() {
            Kind::Directory
        } else {
            Kind::File
        };
        let sidecar = match kind {
            Kind::File => FileMeta::load_blocking(&tree_path(meta, &path)),
            Kind::Directory => None,
        };
        let attr = entry.metadata().map_err(io::Error::from)?;
        infos.push(file_info(path, kind, &attr, sidecar)?);
    }
    Ok(infos)
}

async fn next_chunk(mut file: File, chunk_size: usize) -> Result<Option<(Bytes, File)>> {
    let mut buffer = vec![0u8; chunk_size];
    let read = file.read(&mut buffer).await?;
    if read == 0 {
        return Ok(None);
    }
    buffer.truncate(read);
    trace!(len = read, "read chunk");
    Ok(Some((Bytes::from(buffer), file)))
}

#[async_trait]
impl FilesApi for DiskStore {
    async fn write(&self, path: &str, mut chunks: ChunkSource) -> Result<()> {
        let path = FilePath::parse(path)?;
        {
            let _guard = self.lock.read().await;
            self.check_file_slot(&path).await?;
        }

        let mut staged = StagedFile::create(&self.staging).await?;
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    trace!(path = %path, len = chunk.len(), "received chunk");
                    staged.append(&chunk).await?;
                }
                Err(e) => {
                    warn!(path = %path, staged = staged.written(), error = %e, "write aborted");
                    return Err(e.into());
                }
            }
        }
        let size = staged.finish().await?;

        let _guard = self.lock.write().await;
        self.check_file_slot(&path).await?;
        // Taken under the guard, so the time is the commit time.
        let committed_at = SystemTime::now();
        let target = self.disk_path(&path);
        let committed = match self.ensure_parent(&path).await {
            Ok(()) => staged.commit(&target, committed_at).await.map_err(Error::from),
            Err(e) => Err(e),
        };
        if let Err(e) = committed {
            prune_empty_ancestors(&self.data, &path).await;
            return Err(e);
        }
        self.record_metadata(&path, committed_at).await;
        debug!(path = %path, size, "committed file");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<ChunkStream> {
        let path = FilePath::parse(path)?;
        let _guard = self.lock.read().await;
        match self.kind(&path).await? {
            Some(Kind::File) => {
                let file = File::open(self.disk_path(&path)).await?;
                let chunk_size = self.options.chunk_size;
                Ok(stream::try_unfold(file, move |file| next_chunk(file, chunk_size)).boxed())
            }
            Some(Kind::Directory) => Err(Error::NotAFile { path }),
            None => Err(Error::NotFound { path }),
        }
    }

    async fn stats(&self, path: &str) -> Result<FileInfo> {
        let path = FilePath::parse(path)?;
        let _guard = self.lock.read().await;
        match self.probe(&path).await? {
            Some((Kind::File, attr)) => {
                let sidecar = FileMeta::load(&self.sidecar_path(&path)).await;
                file_info(path, Kind::File, &attr, sidecar)
            }
            Some((kind, attr)) => file_info(path, kind, &attr, None),
            None => Err(Error::NotFound { path }),
        }
    }

    async fn list(&self, path: &str, options: ListOptions) -> Result<InfoStream> {
        let path = FilePath::parse(path)?;
        let entries = {
            let _guard = self.lock.read().await;
            match self.kind(&path).await? {
                Some(Kind::Directory) => {}
                Some(Kind::File) => return Err(Error::NotADirectory { path }),
                None => return Err(Error::NotFound { path }),
            }
            let data = self.data.clone();
            let meta = self.meta.clone();
            let base = self.disk_path(&path);
            tokio::task::spawn_blocking(move || walk(&data, &meta, &base, options.recursive))
                .await
                .map_err(io::Error::other)??
        };
        Ok(stream::iter(entries.into_iter().map(Ok)).boxed())
    }

    async fn move_path(&self, from: &str, to: &str) -> Result<()> {
        let from = FilePath::parse(from)?;
        let to = FilePath::parse(to)?;
        let _guard = self.lock.write().await;

        if from.is_root() {
            return Err(Error::invalid_path(&from, "the root cannot be moved"));
        }
        let source = match self.kind(&from).await? {
            Some(kind) => kind,
            None => return Err(Error::NotFound { path: from }),
        };
        if from == to {
            return Ok(());
        }
        if to.starts_with(&from) {
            return Err(Error::invalid_path(
                &to,
                format!("cannot move {} inside itself", from),
            ));
        }
        match (self.kind(&to).await?, source) {
            (Some(Kind::Directory), _) => {
                return Err(Error::invalid_path(&to, "destination is a directory"));
            }
            (Some(Kind::File), Kind::Directory) => {
                return Err(Error::invalid_path(
                    &to,
                    "cannot replace a file with a directory",
                ));
            }
            _ => {}
        }
        self.check_file_slot(&to).await.map_err(|e| match e {
            Error::NotADirectory { path } => {
                Error::invalid_path(&to, format!("parent {} is a file", path))
            }
            other => other,
        })?;

        let moved = match self.ensure_parent(&to).await {
            Ok(()) => fs::rename(self.disk_path(&from), self.disk_path(&to))
                .await
                .map_err(Error::from),
            Err(e) => Err(e),
        };
        if let Err(e) = moved {
            prune_empty_ancestors(&self.data, &to).await;
            return Err(e);
        }
        prune_empty_ancestors(&self.data, &from).await;
        self.move_metadata(&from, &to).await;
        debug!(from = %from, to = %to, "moved");
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = FilePath::parse(path)?;
        let _guard = self.lock.write().await;

        if path.is_root() {
            let removed = self.clear().await?;
            debug!(entries = removed, "cleared store");
            return Ok(());
        }

        let found = match self.kind(&path).await? {
            Some(Kind::Directory) => {
                fs::remove_dir_all(self.disk_path(&path)).await?;
                true
            }
            Some(Kind::File) => {
                fs::remove_file(self.disk_path(&path)).await?;
                true
            }
            None => false,
        };
        if found {
            discard_sidecar(&self.sidecar_path(&path)).await;
            self.prune_empty_ancestors(&path).await;
        }
        debug!(path = %path, found, "removed");
        Ok(())
    }
}
