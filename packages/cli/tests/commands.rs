use vfiles::{DiskStore, FilesApi};
use vfiles_cli::commands::{execute, CliError, Command};

#[tokio::test]
async fn write_from_file_then_move_and_remove() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let local = scratch.path().join("report.csv");
    std::fs::write(&local, "a,b\n1,2\n").unwrap();

    let store = DiskStore::open(root.path()).unwrap();
    let mut out = Vec::new();

    let write = Command::Write {
        path: "/reports/2024/q1.csv".into(),
        from: Some(local),
    };
    execute(&store, write, 3, &mut out).await.unwrap();

    let stats = Command::Stats {
        path: "/reports/2024/q1.csv".into(),
    };
    execute(&store, stats, 3, &mut out).await.unwrap();
    let info: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(info["type"], "text/csv");
    assert_eq!(info["size"], 8);
    out.clear();

    let mv = Command::Mv {
        from: "/reports/2024".into(),
        to: "/archive".into(),
    };
    execute(&store, mv, 3, &mut out).await.unwrap();
    assert!(!store.exists("/reports").await.unwrap());

    let read = Command::Read {
        path: "/archive/q1.csv".into(),
    };
    execute(&store, read, 3, &mut out).await.unwrap();
    assert_eq!(out, b"a,b\n1,2\n");

    let rm = Command::Rm {
        path: "/archive/q1.csv".into(),
    };
    execute(&store, rm, 3, &mut out).await.unwrap();
    assert!(!store.exists("/archive").await.unwrap());
}

#[tokio::test]
async fn missing_source_file_is_an_io_error() {
    let root = tempfile::tempdir().unwrap();
    let store = DiskStore::open(root.path()).unwrap();
    let mut out = Vec::new();

    let write = Command::Write {
        path: "/a.txt".into(),
        from: Some(root.path().join("does-not-exist")),
    };
    let err = execute(&store, write, 16, &mut out).await.unwrap_err();
    assert!(matches!(err, CliError::Io(_)));
    assert!(!store.exists("/a.txt").await.unwrap());
}
