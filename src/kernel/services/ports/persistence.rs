use async_trait::async_trait;

use crate::models::FolderNode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("persistence io error: {0}")]
    Io(String),
    #[error("stored tree is malformed: {0}")]
    Decode(String),
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// Durable store of workspace trees, keyed by workspace id.
///
/// `save` is idempotent: writing the same tree twice leaves the store unchanged.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn load(&self, workspace_id: &str) -> Result<Option<FolderNode>, PersistenceError>;
    async fn save(&self, workspace_id: &str, tree: &FolderNode) -> Result<(), PersistenceError>;
}
