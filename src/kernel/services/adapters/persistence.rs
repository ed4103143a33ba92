use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::kernel::services::ports::{PersistenceError, PersistenceGateway};
use crate::models::FolderNode;

use super::paths::file_stem_for;

#[derive(Default)]
struct MemoryStoreInner {
    trees: Mutex<FxHashMap<String, String>>,
    saved: Mutex<Vec<(String, FolderNode)>>,
    save_calls: AtomicUsize,
    writes: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

/// In-memory persistence. Trees are held in their JSON form so every round trip goes through
/// serialization.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, workspace_id: &str, tree: &FolderNode) -> Result<(), PersistenceError> {
        let raw = tree
            .to_json()
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;
        self.inner.trees.lock().insert(workspace_id.to_string(), raw);
        Ok(())
    }

    pub fn tree(&self, workspace_id: &str) -> Option<FolderNode> {
        let raw = self.inner.trees.lock().get(workspace_id).cloned()?;
        FolderNode::from_json(&raw).ok()
    }

    /// Trees passed to `save`, oldest first.
    pub fn saved_trees(&self) -> Vec<(String, FolderNode)> {
        self.inner.saved.lock().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.inner.save_calls.load(Ordering::SeqCst)
    }

    /// Saves that changed the stored tree.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn load(&self, workspace_id: &str) -> Result<Option<FolderNode>, PersistenceError> {
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend("injected load failure".into()));
        }
        let raw = self.inner.trees.lock().get(workspace_id).cloned();
        raw.map(|raw| FolderNode::from_json(&raw))
            .transpose()
            .map_err(|e| PersistenceError::Decode(e.to_string()))
    }

    async fn save(&self, workspace_id: &str, tree: &FolderNode) -> Result<(), PersistenceError> {
        self.inner.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend("injected save failure".into()));
        }
        let raw = tree
            .to_json()
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;
        self.inner
            .saved
            .lock()
            .push((workspace_id.to_string(), tree.clone()));

        let mut trees = self.inner.trees.lock();
        if trees.get(workspace_id) != Some(&raw) {
            trees.insert(workspace_id.to_string(), raw);
            self.inner.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// One JSON file per workspace under `root`.
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, workspace_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem_for(workspace_id)))
    }
}

fn io_error(err: std::io::Error) -> PersistenceError {
    PersistenceError::Io(err.to_string())
}

#[async_trait]
impl PersistenceGateway for JsonDirStore {
    async fn load(&self, workspace_id: &str) -> Result<Option<FolderNode>, PersistenceError> {
        let path = self.path_for(workspace_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };
        FolderNode::from_json(&raw)
            .map(Some)
            .map_err(|e| PersistenceError::Decode(e.to_string()))
    }

    async fn save(&self, workspace_id: &str, tree: &FolderNode) -> Result<(), PersistenceError> {
        let path = self.path_for(workspace_id);
        let raw = tree
            .to_json()
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;

        if let Ok(existing) = tokio::fs::read_to_string(&path).await {
            if existing == raw {
                return Ok(());
            }
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw.as_bytes())
            .await
            .map_err(io_error)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error)?;
        tracing::debug!(workspace_id, path = %path.display(), "workspace tree written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/persistence.rs"]
mod tests;
