use std::sync::Arc;

use crate::kernel::effect::RuntimeOp;
use crate::kernel::hydration::is_transient;
use crate::kernel::Effect;
use crate::models::{FileId, TreeError};

use super::StoreError;

/// A save whose tree update is applied and whose sink writes are still to run.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub file_id: FileId,
    pub path: String,
    /// Buffer content at the time the save began.
    pub content: String,
    pub effects: Vec<Effect>,
}

impl super::Store {
    /// Writes the buffer of `file_id` into the tree and returns the sink writes to perform.
    pub fn begin_save(&mut self, file_id: &FileId) -> Result<PendingSave, StoreError> {
        let buffer = self
            .state
            .open_file(file_id)
            .ok_or_else(|| StoreError::FileNotOpen(file_id.clone()))?;
        if is_transient(buffer.content()) {
            return Err(StoreError::BufferNotReady(file_id.clone()));
        }
        let content = buffer.content().to_string();
        let display = buffer.display_name();

        let (workspace_id, tree) = self.loaded_tree()?;
        let path = tree
            .find_path(file_id)
            .ok_or(TreeError::PathNotFound(display))?;
        let next = Arc::new(tree.with_file_content(file_id, &content)?);
        self.state.replace_tree(Some(Arc::clone(&next)));

        Ok(PendingSave {
            file_id: file_id.clone(),
            effects: vec![
                Effect::Runtime(RuntimeOp::WriteFile {
                    path: path.clone(),
                    content: content.clone(),
                }),
                Effect::Persist {
                    workspace_id,
                    tree: next,
                },
            ],
            path,
            content,
        })
    }

    /// Settles a save once its sink writes ran. Returns whether the buffer was marked saved.
    ///
    /// The unsaved flag is only touched when persistence succeeded and the file is still in
    /// the tree.
    pub fn finish_save(
        &mut self,
        pending: &PendingSave,
        persisted: bool,
    ) -> Result<bool, StoreError> {
        let in_tree = self
            .state
            .tree()
            .is_some_and(|tree| tree.find_file(&pending.file_id).is_some());
        if !in_tree {
            return Err(TreeError::PathNotFound(pending.path.clone()).into());
        }
        if !persisted {
            return Ok(false);
        }
        match self.state.open_file_mut(&pending.file_id) {
            Some(buffer) => {
                buffer.mark_saved(pending.content.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Begins a save for every buffer with unsaved changes.
    ///
    /// All saves persist the tree holding every buffer's content, so the order in which their
    /// writes land does not matter.
    pub fn begin_save_all(&mut self) -> (Vec<PendingSave>, Vec<(FileId, StoreError)>) {
        let mut pending = Vec::new();
        let mut failed = Vec::new();
        for file_id in self.state.dirty_file_ids() {
            match self.begin_save(&file_id) {
                Ok(save) => pending.push(save),
                Err(err) => failed.push((file_id, err)),
            }
        }

        if let Some(final_tree) = self.state.tree().cloned() {
            for save in &mut pending {
                for effect in &mut save.effects {
                    if let Effect::Persist { tree, .. } = effect {
                        *tree = Arc::clone(&final_tree);
                    }
                }
            }
        }
        (pending, failed)
    }
}
