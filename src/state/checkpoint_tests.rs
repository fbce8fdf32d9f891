//! Tests for CheckpointStore

use super::*;
use crate::range::FeedRange;
use tempfile::tempdir;

fn sample_cursor() -> ChangeFeedCrossFeedRangeState {
    ChangeFeedCrossFeedRangeState::new(vec![
        FeedRangeState::new(FeedRange::epk("", "7F"), ChangeFeedState::continuation("lsn:4")),
        FeedRangeState::new(FeedRange::epk("7F", "FF"), ChangeFeedState::beginning()),
    ])
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_checkpoint_store_new() {
    let store = CheckpointStore::new("/tmp/test-checkpoint.json");
    assert!(!store.is_in_memory());
    assert_eq!(store.path().to_str().unwrap(), "/tmp/test-checkpoint.json");
}

#[test]
fn test_checkpoint_store_in_memory() {
    let store = CheckpointStore::in_memory();
    assert!(store.is_in_memory());
}

#[test]
fn test_from_file_missing_starts_empty() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::from_file(dir.path().join("missing.json")).unwrap();
    assert!(!store.is_in_memory());
}

#[test]
fn test_from_file_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = CheckpointStore::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse checkpoint file"));
}

// ============================================================================
// Update Tests
// ============================================================================

#[tokio::test]
async fn test_in_memory_update() {
    let store = CheckpointStore::in_memory();
    assert!(store.checkpoint().await.is_none());

    store.update(sample_cursor()).await.unwrap();
    assert_eq!(store.checkpoint().await, Some(sample_cursor()));
}

#[tokio::test]
async fn test_update_auto_saves() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");

    let store = CheckpointStore::new(&path);
    store.update(sample_cursor()).await.unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reloaded = CheckpointStore::from_file(&path).unwrap();
    assert_eq!(reloaded.checkpoint().await, Some(sample_cursor()));
}

#[tokio::test]
async fn test_without_auto_save_needs_explicit_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");

    let store = CheckpointStore::without_auto_save(&path);
    store.update(sample_cursor()).await.unwrap();
    assert!(!path.exists());

    store.save().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_load_replaces_cached_cursor() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");

    let writer = CheckpointStore::new(&path);
    writer.update(sample_cursor()).await.unwrap();

    let reader = CheckpointStore::without_auto_save(&path);
    assert!(reader.checkpoint().await.is_none());
    reader.load().await.unwrap();
    assert_eq!(reader.checkpoint().await, Some(sample_cursor()));
}

#[tokio::test]
async fn test_clear_removes_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");

    let store = CheckpointStore::new(&path);
    store.update(sample_cursor()).await.unwrap();
    store.clear().await.unwrap();

    assert!(store.checkpoint().await.is_none());
    assert!(!path.exists());
}
