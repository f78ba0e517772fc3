use std::sync::Arc;

use vfiles::{chunks, DiskStore, FileKind, FilesApi, ListOptions, MemoryStore};

async fn copy_tree(from: &dyn FilesApi, to: &dyn FilesApi) -> vfiles::Result<()> {
    for info in from.list_all("/", ListOptions::recursive()).await? {
        if info.kind == FileKind::File {
            let content = from.read(&info.path.to_string()).await?;
            to.write(&info.path.to_string(), chunks::pipe(content)).await?;
        }
    }
    Ok(())
}

#[tokio::test]
async fn stores_agree_on_listings() {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskStore::open(dir.path()).unwrap();
    let memory = MemoryStore::new();

    for store in [&disk as &dyn FilesApi, &memory] {
        store.write("/b/z.txt", chunks::once("zz")).await.unwrap();
        store.write("/a/y.json", chunks::once("{}")).await.unwrap();
        store.write("/a/x/w.bin", chunks::once("w")).await.unwrap();
        store.move_path("/a/x", "/c").await.unwrap();
        store.move_path("/b/z.txt", "/b/z.bin").await.unwrap();
    }

    let strip = |infos: Vec<vfiles::FileInfo>| {
        infos
            .into_iter()
            .map(|i| (i.path, i.kind, i.size, i.mime_type))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        strip(disk.list_all("/", ListOptions::recursive()).await.unwrap()),
        strip(memory.list_all("/", ListOptions::recursive()).await.unwrap()),
    );
}

#[tokio::test]
async fn content_streams_between_stores() {
    let dir = tempfile::tempdir().unwrap();
    let disk: Arc<dyn FilesApi> = Arc::new(DiskStore::open(dir.path()).unwrap());
    let memory: Arc<dyn FilesApi> = Arc::new(MemoryStore::new());

    memory
        .write("/docs/readme.md", chunks::once("# vfiles"))
        .await
        .unwrap();
    memory
        .write("/docs/img/logo.svg", chunks::once("<svg/>"))
        .await
        .unwrap();

    copy_tree(memory.as_ref(), disk.as_ref()).await.unwrap();

    let info = disk.stats("/docs/img/logo.svg").await.unwrap();
    assert_eq!(info.mime_type.as_deref(), Some("image/svg+xml"));
    assert_eq!(
        &disk.read_to_bytes("/docs/readme.md").await.unwrap()[..],
        b"# vfiles"
    );
}
