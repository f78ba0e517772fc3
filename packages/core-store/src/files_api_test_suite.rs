//! Behavioural checks every [`FilesApi`] implementation must pass.
//!
//! Each check empties the store first and panics on failure, so a backend
//! runs them from its own `#[tokio::test]` functions:
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn rename_folder() {
//!     files_api_test_suite::rename_folder(&MyStore::new()).await;
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures::channel::mpsc;
use futures::StreamExt;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

use crate::{chunks, file_path, Error, FileInfo, FileKind, FilesApi, ListOptions, ProducerError};

const MESSAGE: &str = "Hello, wonderful world!";

/// Expected listing entry; `lastModified` is not compared.
struct Expected {
    path: &'static str,
    kind: FileKind,
    size: Option<u64>,
    mime_type: Option<&'static str>,
}

fn dir(path: &'static str) -> Expected {
    Expected {
        path,
        kind: FileKind::Directory,
        size: None,
        mime_type: None,
    }
}

fn file(path: &'static str, size: u64, mime_type: &'static str) -> Expected {
    Expected {
        path,
        kind: FileKind::File,
        size: Some(size),
        mime_type: Some(mime_type),
    }
}

fn assert_infos(actual: &[FileInfo], expected: &[Expected]) {
    let render = |infos: &[FileInfo]| {
        infos
            .iter()
            .map(|i| format!("{} ({:?})", i.path, i.kind))
            .collect::<Vec<_>>()
            .join(", ")
    };
    assert_eq!(
        actual.len(),
        expected.len(),
        "unexpected listing: [{}]",
        render(actual)
    );
    for (a, e) in actual.iter().zip(expected) {
        let path = file_path!(e.path);
        assert_eq!(a.path, path, "listing: [{}]", render(actual));
        assert_eq!(a.name, path.name().unwrap_or_default());
        assert_eq!(a.kind, e.kind, "kind of {}", e.path);
        assert_eq!(a.size, e.size, "size of {}", e.path);
        assert_eq!(a.mime_type.as_deref(), e.mime_type, "type of {}", e.path);
        assert_eq!(a.last_modified.is_some(), e.kind == FileKind::File);
    }
}

async fn reset<S: FilesApi + ?Sized>(store: &S) {
    store.remove("/").await.expect("clearing the store");
}

async fn write_text<S: FilesApi + ?Sized>(store: &S, path: &str, text: &str) {
    store
        .write(path, chunks::once(text.to_string()))
        .await
        .expect("writing text");
}

async fn read_text<S: FilesApi + ?Sized>(store: &S, path: &str) -> String {
    let data = store.read_to_bytes(path).await.expect("reading text");
    String::from_utf8(data.to_vec()).expect("utf-8 content")
}

async fn list_recursive<S: FilesApi + ?Sized>(store: &S, path: &str) -> Vec<FileInfo> {
    store
        .list_all(path, ListOptions::recursive())
        .await
        .expect("listing")
}

pub async fn read_empty_root<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    assert_infos(&list_recursive(store, "/").await, &[]);
    assert_infos(
        &store.list_all("/", ListOptions::shallow()).await.unwrap(),
        &[],
    );

    let root = store.stats("/").await.unwrap();
    assert_eq!(root.kind, FileKind::Directory);
    assert_eq!(root.path.to_string(), "/");
}

pub async fn create_file_and_read_info<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b/c.txt", MESSAGE).await;

    assert_infos(&[store.stats("/a/b/").await.unwrap()], &[dir("/a/b")]);
    assert_infos(
        &[store.stats("/a/b/c.txt").await.unwrap()],
        &[file("/a/b/c.txt", 23, "text/plain")],
    );

    assert_infos(
        &list_recursive(store, "/").await,
        &[dir("/a"), dir("/a/b"), file("/a/b/c.txt", 23, "text/plain")],
    );
}

pub async fn stats_path_is_canonical<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/x/y.txt", "y").await;

    for input in ["/x/y.txt", "x/y.txt", "x/y.txt/"] {
        assert_eq!(store.stats(input).await.unwrap().path.to_string(), "/x/y.txt");
    }
    for input in ["/x", "x", "/x/"] {
        assert_eq!(store.stats(input).await.unwrap().path.to_string(), "/x");
    }
    assert!(matches!(
        store.stats("/x//y.txt").await,
        Err(Error::InvalidPath { .. })
    ));
    assert!(matches!(
        store.stats("/x/../x/y.txt").await,
        Err(Error::InvalidPath { .. })
    ));
}

pub async fn read_file_content<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    store
        .write("/a/message.txt", chunks::once(MESSAGE))
        .await
        .unwrap();

    let mut result = String::new();
    let mut stream = store.read("/a/message.txt").await.unwrap();
    while let Some(chunk) = stream.next().await {
        result.push_str(std::str::from_utf8(&chunk.unwrap()).unwrap());
    }
    assert_eq!(result, MESSAGE);
}

pub async fn overwrite_replaces_content<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/doc.txt", "first version, quite long").await;
    write_text(store, "/doc.txt", "second").await;

    assert_eq!(read_text(store, "/doc.txt").await, "second");
    assert_eq!(store.stats("/doc.txt").await.unwrap().size, Some(6));
}

pub async fn empty_file<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    store.write("/empty", chunks::from_iter(Vec::<Bytes>::new())).await.unwrap();

    let info = store.stats("/empty").await.unwrap();
    assert_eq!(info.size, Some(0));
    assert_eq!(info.mime_type.as_deref(), Some("application/octet-stream"));
    assert!(store.read_to_bytes("/empty").await.unwrap().is_empty());
}

pub async fn rename_file<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/message.txt", MESSAGE).await;
    store
        .move_path("/a/message.txt", "/a/MyNewMessage.txt")
        .await
        .unwrap();

    assert_infos(
        &list_recursive(store, "/").await,
        &[dir("/a"), file("/a/MyNewMessage.txt", 23, "text/plain")],
    );
    assert_eq!(read_text(store, "/a/MyNewMessage.txt").await, MESSAGE);
}

pub async fn rename_folder<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b/c/message.txt", MESSAGE).await;
    store.move_path("/a", "/B").await.unwrap();

    assert_infos(
        &list_recursive(store, "/").await,
        &[
            dir("/B"),
            dir("/B/b"),
            dir("/B/b/c"),
            file("/B/b/c/message.txt", 23, "text/plain"),
        ],
    );
    assert_eq!(read_text(store, "/B/b/c/message.txt").await, MESSAGE);
}

pub async fn move_collapses_source_ancestors<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b/c/deep.txt", "deep").await;
    write_text(store, "/keep.txt", "keep").await;
    store.move_path("/a/b/c/deep.txt", "/x/y/deep.txt").await.unwrap();

    assert_infos(
        &list_recursive(store, "/").await,
        &[
            file("/keep.txt", 4, "text/plain"),
            dir("/x"),
            dir("/x/y"),
            file("/x/y/deep.txt", 4, "text/plain"),
        ],
    );
}

pub async fn move_errors_leave_store_unchanged<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b/c.txt", MESSAGE).await;
    write_text(store, "/f.txt", "f").await;
    let before = list_recursive(store, "/").await;

    assert!(matches!(
        store.move_path("/missing", "/elsewhere").await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        store.move_path("/a", "/a/b/inside").await,
        Err(Error::InvalidPath { .. })
    ));
    assert!(matches!(
        store.move_path("/a/b/c.txt", "/f.txt/c.txt").await,
        Err(Error::InvalidPath { .. })
    ));
    assert!(matches!(
        store.move_path("/f.txt", "/a").await,
        Err(Error::InvalidPath { .. })
    ));
    assert!(matches!(
        store.move_path("/", "/root").await,
        Err(Error::InvalidPath { .. })
    ));

    assert_eq!(list_recursive(store, "/").await, before);
}

pub async fn move_onto_existing_file_replaces_it<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/old.txt", "old").await;
    write_text(store, "/new.txt", "brand new").await;
    store.move_path("/new.txt", "/old.txt").await.unwrap();

    assert_infos(
        &list_recursive(store, "/").await,
        &[file("/old.txt", 9, "text/plain")],
    );
    assert_eq!(read_text(store, "/old.txt").await, "brand new");
}

pub async fn remove_collapses_empty_ancestors<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b/c/only.txt", "x").await;
    write_text(store, "/z.txt", "z").await;

    store.remove("/a/b/c/only.txt").await.unwrap();
    assert_infos(&list_recursive(store, "/").await, &[file("/z.txt", 1, "text/plain")]);
    assert!(store.stats("/a").await.unwrap_err().is_not_found());

    store.remove("/z.txt").await.unwrap();
    assert_infos(&list_recursive(store, "/").await, &[]);
    assert_eq!(store.stats("/").await.unwrap().kind, FileKind::Directory);
}

pub async fn remove_directory_subtree<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b/1.txt", "1").await;
    write_text(store, "/a/b/2.txt", "2").await;
    write_text(store, "/a/3.txt", "3").await;

    store.remove("/a/b").await.unwrap();
    assert_infos(
        &list_recursive(store, "/").await,
        &[dir("/a"), file("/a/3.txt", 1, "text/plain")],
    );

    // Idempotent.
    store.remove("/a/b").await.unwrap();
    store.remove("/nothing/here").await.unwrap();
}

pub async fn write_under_file_fails<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/file.txt", MESSAGE).await;
    let before = list_recursive(store, "/").await;

    match store.write("/a/file.txt/child.txt", chunks::once("x")).await {
        Err(Error::NotADirectory { path }) => assert_eq!(path.to_string(), "/a/file.txt"),
        other => panic!("expected NotADirectory, got {other:?}"),
    }
    assert!(matches!(
        store.write("/a/file.txt/deeper/child.txt", chunks::once("x")).await,
        Err(Error::NotADirectory { .. })
    ));
    assert!(matches!(
        store.write("/a", chunks::once("x")).await,
        Err(Error::NotADirectory { .. })
    ));
    assert!(matches!(
        store.write("/", chunks::once("x")).await,
        Err(Error::InvalidPath { .. })
    ));

    assert_eq!(list_recursive(store, "/").await, before);
}

pub async fn kind_mismatches<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/a/b.txt", "b").await;

    assert!(matches!(store.read("/a").await, Err(Error::NotAFile { .. })));
    assert!(matches!(store.read("/").await, Err(Error::NotAFile { .. })));
    assert!(matches!(store.read("/nope").await, Err(Error::NotFound { .. })));
    assert!(matches!(
        store.read("/a/b.txt/c").await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        store.list("/a/b.txt", ListOptions::shallow()).await,
        Err(Error::NotADirectory { .. })
    ));
    assert!(matches!(
        store.list("/nope", ListOptions::shallow()).await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(store.stats("/nope").await, Err(Error::NotFound { .. })));
}

pub async fn shallow_and_nested_listing<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    for path in ["/b/z.txt", "/b/a/1.txt", "/a.txt", "/c/d/e.json"] {
        write_text(store, path, "..").await;
    }

    assert_infos(
        &store.list_all("/", ListOptions::shallow()).await.unwrap(),
        &[file("/a.txt", 2, "text/plain"), dir("/b"), dir("/c")],
    );
    assert_infos(
        &list_recursive(store, "/").await,
        &[
            file("/a.txt", 2, "text/plain"),
            dir("/b"),
            dir("/b/a"),
            file("/b/a/1.txt", 2, "text/plain"),
            file("/b/z.txt", 2, "text/plain"),
            dir("/c"),
            dir("/c/d"),
            file("/c/d/e.json", 2, "application/json"),
        ],
    );
    assert_infos(
        &list_recursive(store, "/b").await,
        &[
            dir("/b/a"),
            file("/b/a/1.txt", 2, "text/plain"),
            file("/b/z.txt", 2, "text/plain"),
        ],
    );

    // Stable across calls.
    assert_eq!(list_recursive(store, "/").await, list_recursive(store, "/").await);
}

pub async fn failed_producer_keeps_prior_state<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;

    let failing = || {
        chunks::from_results(vec![
            Ok(Bytes::from_static(b"partial ")),
            Ok(Bytes::from_static(b"content")),
            Err(ProducerError::msg("producer gave up")),
        ])
    };

    // Nothing existed: nothing exists afterwards, not even the parents.
    assert!(matches!(
        store.write("/fresh/dir/file.txt", failing()).await,
        Err(Error::Producer(_))
    ));
    assert!(store.stats("/fresh").await.unwrap_err().is_not_found());
    assert_infos(&list_recursive(store, "/").await, &[]);

    // Prior content survives untouched.
    write_text(store, "/kept.txt", MESSAGE).await;
    let before = store.stats("/kept.txt").await.unwrap();
    assert!(matches!(
        store.write("/kept.txt", failing()).await,
        Err(Error::Producer(_))
    ));
    assert_eq!(read_text(store, "/kept.txt").await, MESSAGE);
    assert_eq!(store.stats("/kept.txt").await.unwrap(), before);
}

/// A write whose future is dropped mid-stream never lands.
pub async fn dropped_write_keeps_prior_state<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/kept.txt", MESSAGE).await;
    let before = store.stats("/kept.txt").await.unwrap();

    for path in ["/kept.txt", "/fresh/dir/file.txt"] {
        let (sender, receiver) = mpsc::unbounded::<Result<Bytes, ProducerError>>();
        sender
            .unbounded_send(Ok(Bytes::from_static(b"partial")))
            .unwrap();
        let mut write = store.write(path, receiver.boxed());
        // The first chunk is taken, then the write waits on the producer.
        for _ in 0..5 {
            let polled = tokio::time::timeout(Duration::from_millis(10), &mut write).await;
            assert!(polled.is_err(), "write to {} finished early", path);
        }
        drop(write);
        drop(sender);
    }

    assert_eq!(read_text(store, "/kept.txt").await, MESSAGE);
    assert_eq!(store.stats("/kept.txt").await.unwrap(), before);
    assert!(store.stats("/fresh").await.unwrap_err().is_not_found());
    assert_infos(
        &list_recursive(store, "/").await,
        &[file("/kept.txt", MESSAGE.len() as u64, "text/plain")],
    );

    // The abandoned paths are still writable.
    write_text(store, "/fresh/dir/file.txt", "later").await;
    assert_eq!(read_text(store, "/fresh/dir/file.txt").await, "later");
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// `lastModified` is taken when the write commits, not when its last
/// chunk arrived.
pub async fn last_modified_is_commit_time<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;

    let (sender, receiver) = mpsc::unbounded::<Result<Bytes, ProducerError>>();
    let producer = async move {
        sender
            .unbounded_send(Ok(Bytes::from_static(b"slow ")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.unbounded_send(Ok(Bytes::new())).unwrap();
        let ended = now_millis();
        drop(sender);
        ended
    };
    let (written, ended) = futures::join!(store.write("/slow.txt", receiver.boxed()), producer);
    written.unwrap();

    let info = store.stats("/slow.txt").await.unwrap();
    let last_modified = info.last_modified.unwrap();
    assert!(
        last_modified >= ended,
        "lastModified {} predates the end of the producer at {}",
        last_modified,
        ended
    );
}

/// A move keeps the media type and timestamp a file got when written,
/// even when the new name suggests another type.
pub async fn move_keeps_file_metadata<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/notes.txt", MESSAGE).await;
    let written = store.stats("/notes.txt").await.unwrap();
    assert_eq!(written.mime_type.as_deref(), Some("text/plain"));

    let assert_kept = |info: &FileInfo| {
        assert_eq!(info.mime_type, written.mime_type, "type of {}", info.path);
        assert_eq!(
            info.last_modified, written.last_modified,
            "lastModified of {}",
            info.path
        );
        assert_eq!(info.size, written.size, "size of {}", info.path);
    };

    store
        .move_path("/notes.txt", "/archive/notes.bin")
        .await
        .unwrap();
    assert_kept(&store.stats("/archive/notes.bin").await.unwrap());

    store.move_path("/archive", "/old/stuff").await.unwrap();
    assert_kept(&store.stats("/old/stuff/notes.bin").await.unwrap());

    // Replacing a file replaces its metadata as well.
    write_text(store, "/logo.png", "png").await;
    store
        .move_path("/old/stuff/notes.bin", "/logo.png")
        .await
        .unwrap();
    assert_kept(&store.stats("/logo.png").await.unwrap());

    let listing = list_recursive(store, "/").await;
    assert_infos(
        &listing,
        &[file("/logo.png", MESSAGE.len() as u64, "text/plain")],
    );
    assert_kept(&listing[0]);
}

fn random_chunks(full_size: usize, min_chunk: usize, max_chunk: usize) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut rng = rand::thread_rng();
    let mut digest = Sha256::new();
    let mut produced = Vec::new();
    let mut size = 0;
    while size < full_size {
        let chunk_size = rng.gen_range(min_chunk..=max_chunk).min(full_size - size);
        let mut chunk = vec![0u8; chunk_size];
        rng.fill_bytes(&mut chunk);
        digest.update(&chunk);
        produced.push(chunk);
        size += chunk_size;
    }
    (produced, digest.finalize().to_vec())
}

/// Write 16 MiB in random 16 B to 32 KiB chunks and compare digests of
/// what went in and what comes back.
pub async fn write_and_read_big_file<S: FilesApi + ?Sized>(store: &S) {
    const FULL_SIZE: usize = 16 * 1024 * 1024;

    reset(store).await;

    let (produced, source_digest) = random_chunks(FULL_SIZE, 16, 32 * 1024);
    store
        .write("/a/b/my-data.bin", chunks::from_iter(produced))
        .await
        .unwrap();

    let mut result_digest = Sha256::new();
    let mut read_size = 0;
    let mut stream = store.read("/a/b/my-data.bin").await.unwrap();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        read_size += chunk.len();
        result_digest.update(&chunk);
    }

    assert_eq!(read_size, FULL_SIZE);
    assert_eq!(result_digest.finalize().to_vec(), source_digest);
    assert_eq!(
        store.stats("/a/b/my-data.bin").await.unwrap().size,
        Some(FULL_SIZE as u64)
    );
}

/// Readers never see a write before its producer is exhausted.
pub async fn in_flight_write_is_invisible<S: FilesApi + 'static>(store: Arc<S>) {
    reset(store.as_ref()).await;
    write_text(store.as_ref(), "/doc.txt", "old").await;

    let (sender, receiver) = mpsc::unbounded::<Result<Bytes, ProducerError>>();
    let writer = {
        let store = store.clone();
        tokio::spawn(async move { store.write("/doc.txt", receiver.boxed()).await })
    };
    // The structural lock is not held while the producer is pending.
    let other = {
        let store = store.clone();
        tokio::spawn(async move { store.write("/other/unrelated.txt", chunks::once("other")).await })
    };
    other.await.unwrap().unwrap();

    sender
        .unbounded_send(Ok(Bytes::from_static(b"new ")))
        .unwrap();
    tokio::task::yield_now().await;
    assert_eq!(read_text(store.as_ref(), "/doc.txt").await, "old");
    assert_eq!(store.stats("/doc.txt").await.unwrap().size, Some(3));

    sender
        .unbounded_send(Ok(Bytes::from_static(b"content")))
        .unwrap();
    drop(sender);
    writer.await.unwrap().unwrap();
    assert_eq!(read_text(store.as_ref(), "/doc.txt").await, "new content");
}

/// A read started before an overwrite keeps streaming the old content.
pub async fn read_is_a_snapshot<S: FilesApi + ?Sized>(store: &S) {
    reset(store).await;
    write_text(store, "/snap.txt", "before").await;

    let stream = store.read("/snap.txt").await.unwrap();
    write_text(store, "/snap.txt", "after!").await;

    let data = chunks::collect(stream).await.unwrap();
    assert_eq!(&data[..], b"before");
    assert_eq!(read_text(store, "/snap.txt").await, "after!");
}
