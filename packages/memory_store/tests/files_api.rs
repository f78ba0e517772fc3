use std::sync::Arc;

use vfiles_core_store::files_api_test_suite as suite;
use vfiles_core_store::{chunks, FilesApi, StoreOptions};
use vfiles_memory_store::MemoryStore;

#[tokio::test]
async fn read_empty_root() {
    suite::read_empty_root(&MemoryStore::new()).await;
}

#[tokio::test]
async fn create_file_and_read_info() {
    suite::create_file_and_read_info(&MemoryStore::new()).await;
}

#[tokio::test]
async fn stats_path_is_canonical() {
    suite::stats_path_is_canonical(&MemoryStore::new()).await;
}

#[tokio::test]
async fn read_file_content() {
    suite::read_file_content(&MemoryStore::new()).await;
}

#[tokio::test]
async fn overwrite_replaces_content() {
    suite::overwrite_replaces_content(&MemoryStore::new()).await;
}

#[tokio::test]
async fn empty_file() {
    suite::empty_file(&MemoryStore::new()).await;
}

#[tokio::test]
async fn rename_file() {
    suite::rename_file(&MemoryStore::new()).await;
}

#[tokio::test]
async fn rename_folder() {
    suite::rename_folder(&MemoryStore::new()).await;
}

#[tokio::test]
async fn move_collapses_source_ancestors() {
    suite::move_collapses_source_ancestors(&MemoryStore::new()).await;
}

#[tokio::test]
async fn move_errors_leave_store_unchanged() {
    suite::move_errors_leave_store_unchanged(&MemoryStore::new()).await;
}

#[tokio::test]
async fn move_onto_existing_file_replaces_it() {
    suite::move_onto_existing_file_replaces_it(&MemoryStore::new()).await;
}

#[tokio::test]
async fn remove_collapses_empty_ancestors() {
    suite::remove_collapses_empty_ancestors(&MemoryStore::new()).await;
}

#[tokio::test]
async fn remove_directory_subtree() {
    suite::remove_directory_subtree(&MemoryStore::new()).await;
}

#[tokio::test]
async fn write_under_file_fails() {
    suite::write_under_file_fails(&MemoryStore::new()).await;
}

#[tokio::test]
async fn kind_mismatches() {
    suite::kind_mismatches(&MemoryStore::new()).await;
}

#[tokio::test]
async fn shallow_and_nested_listing() {
    suite::shallow_and_nested_listing(&MemoryStore::new()).await;
}

#[tokio::test]
async fn failed_producer_keeps_prior_state() {
    suite::failed_producer_keeps_prior_state(&MemoryStore::new()).await;
}

#[tokio::test]
async fn write_and_read_big_file() {
    suite::write_and_read_big_file(&MemoryStore::new()).await;
}

#[tokio::test]
async fn in_flight_write_is_invisible() {
    suite::in_flight_write_is_invisible(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn read_is_a_snapshot() {
    suite::read_is_a_snapshot(&MemoryStore::new()).await;
}

#[tokio::test]
async fn move_keeps_file_metadata() {
    suite::move_keeps_file_metadata(&MemoryStore::new()).await;
}

#[tokio::test]
async fn last_modified_is_commit_time() {
    suite::last_modified_is_commit_time(&MemoryStore::new()).await;
}

#[tokio::test]
async fn dropped_write_keeps_prior_state() {
    suite::dropped_write_keeps_prior_state(&MemoryStore::new()).await;
}

#[tokio::test]
async fn suite_passes_with_tiny_chunks() {
    let store = MemoryStore::with_options(StoreOptions::new().with_chunk_size(3));
    suite::read_file_content(&store).await;
    suite::rename_folder(&store).await;
    suite::read_is_a_snapshot(&store).await;
}

#[tokio::test]
async fn usable_as_trait_object() {
    let store: Box<dyn FilesApi> = Box::new(MemoryStore::new());
    store
        .write("/a/b/c.txt", chunks::once("Hello"))
        .await
        .unwrap();
    assert!(store.exists("/a/b").await.unwrap());
    suite::rename_file(&store).await;
}
