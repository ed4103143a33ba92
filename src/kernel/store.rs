use std::sync::Arc;

use crate::kernel::services::ports::{PersistenceError, TemplateError};
use crate::models::{FileId, FolderNode, TreeError};

use super::{Action, Effect, WorkspaceSession};

mod buffers;
mod save;
mod tree;

pub use save::PendingSave;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("file `{0}` is not open")]
    FileNotOpen(FileId),
    #[error("buffer of `{0}` is still loading")]
    BufferNotReady(FileId),
    #[error("no workspace is loaded")]
    NoWorkspace,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl StoreError {
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, StoreError::Tree(TreeError::PathNotFound(_)))
    }
}

#[derive(Debug)]
pub struct DispatchResult {
    pub effects: Vec<Effect>,
    pub state_changed: bool,
}

/// Synchronous workspace state machine.
///
/// Every transition runs to completion under `&mut self` and describes its IO as `Effect`s for
/// the caller to execute, so a transition never observes a half-applied sink write.
pub struct Store {
    state: WorkspaceSession,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(WorkspaceSession::new())
    }
}

impl Store {
    pub fn new(state: WorkspaceSession) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WorkspaceSession {
        &self.state
    }

    /// `true` once `workspace_id` has a non-empty tree; loading it again is then a no-op.
    pub fn is_loaded(&self, workspace_id: &str) -> bool {
        self.state.workspace_id() == Some(workspace_id)
            && self.state.tree().is_some_and(|tree| !tree.is_empty())
    }

    pub fn dispatch(&mut self, action: Action) -> Result<DispatchResult, StoreError> {
        match action {
            Action::InstallTree {
                workspace_id,
                tree,
                persist,
            } => Ok(self.install_tree(workspace_id, tree, persist)),
            Action::Reset => {
                let state_changed = self.state.workspace_id().is_some();
                self.state = WorkspaceSession::new();
                Ok(DispatchResult {
                    effects: Vec::new(),
                    state_changed,
                })
            }
            action @ (Action::OpenFile { .. }
            | Action::SetActiveFile(_)
            | Action::UpdateBufferContent { .. }
            | Action::HydrationFinished { .. }
            | Action::CloseFile(_)
            | Action::CloseAllFiles) => self.reduce_buffer_action(action),
            action @ (Action::AddFile { .. }
            | Action::AddFolder { .. }
            | Action::DeleteFile { .. }
            | Action::DeleteFolder { .. }
            | Action::RenameFile { .. }
            | Action::RenameFolder { .. }) => self.reduce_tree_action(action),
        }
    }

    fn install_tree(
        &mut self,
        workspace_id: String,
        tree: Option<FolderNode>,
        persist: bool,
    ) -> DispatchResult {
        self.state.begin(&workspace_id);

        let tree = tree.map(Arc::new);
        let mut effects = Vec::new();
        if let Some(tree) = &tree {
            if persist {
                effects.push(Effect::Persist {
                    workspace_id,
                    tree: Arc::clone(tree),
                });
            }
            effects.push(Effect::SeedRuntime {
                tree: Arc::clone(tree),
            });
        }
        self.state.replace_tree(tree);

        DispatchResult {
            effects,
            state_changed: true,
        }
    }

    fn loaded_tree(&self) -> Result<(String, Arc<FolderNode>), StoreError> {
        match (self.state.workspace_id(), self.state.tree()) {
            (Some(id), Some(tree)) => Ok((id.to_string(), Arc::clone(tree))),
            _ => Err(StoreError::NoWorkspace),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/store.rs"]
mod tests;
