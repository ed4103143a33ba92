use tempfile::tempdir;

use super::*;
use crate::models::FileNode;

fn tree(content: &str) -> FolderNode {
    FolderNode::with_items(
        "root",
        vec![FileNode::new("main", "py", content)
            .with_origin("repo/main.py")
            .into()],
    )
}

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    assert_eq!(store.load("w1").await.unwrap(), None);

    let saved = tree("print(1)");
    store.save("w1", &saved).await.unwrap();

    assert_eq!(store.load("w1").await.unwrap(), Some(saved.clone()));
    assert_eq!(store.saved_trees(), vec![("w1".to_string(), saved)]);
}

#[tokio::test]
async fn test_memory_store_repeated_save_writes_once() {
    let store = MemoryStore::new();
    let saved = tree("print(1)");
    store.save("w1", &saved).await.unwrap();
    store.save("w1", &saved).await.unwrap();

    assert_eq!(store.save_calls(), 2);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_memory_store_failure_switches() {
    let store = MemoryStore::new();
    store.set_fail_saves(true);
    assert!(matches!(
        store.save("w1", &tree("x")).await,
        Err(PersistenceError::Backend(_))
    ));
    assert_eq!(store.tree("w1"), None);

    store.set_fail_loads(true);
    assert!(store.load("w1").await.is_err());
}

#[tokio::test]
async fn test_json_dir_store_roundtrip() {
    let dir = tempdir().unwrap();
    let store = JsonDirStore::new(dir.path());
    assert_eq!(store.load("w1").await.unwrap(), None);

    let saved = tree("print(2)");
    store.save("w1", &saved).await.unwrap();

    let raw = std::fs::read_to_string(store.path_for("w1")).unwrap();
    assert!(raw.contains("\"folderName\":\"root\""));
    assert!(raw.contains("\"originSource\":\"repo/main.py\""));
    assert_eq!(store.load("w1").await.unwrap(), Some(saved));
}

#[tokio::test]
async fn test_json_dir_store_hashes_unsafe_ids() {
    let dir = tempdir().unwrap();
    let store = JsonDirStore::new(dir.path());
    let path = store.path_for("../../etc");
    assert_eq!(path.parent(), Some(dir.path()));

    store.save("../../etc", &tree("x")).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_json_dir_store_rejects_corrupt_file() {
    let dir = tempdir().unwrap();
    let store = JsonDirStore::new(dir.path());
    std::fs::write(store.path_for("w1"), "{not json").unwrap();

    assert!(matches!(
        store.load("w1").await,
        Err(PersistenceError::Decode(_))
    ));
}
