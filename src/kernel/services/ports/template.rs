use async_trait::async_trait;

use crate::models::FolderNode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template `{0}`")]
    Unknown(String),
    #[error("template generation failed: {0}")]
    Generation(String),
}

/// Starter content for a workspace that has nothing persisted yet.
///
/// `Ok(None)` means the workspace has no template; it then starts empty.
#[async_trait]
pub trait TemplateProvider: Send + Sync {
    async fn template_for(&self, workspace_id: &str) -> Result<Option<FolderNode>, TemplateError>;
}
