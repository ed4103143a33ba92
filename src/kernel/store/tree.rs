use std::sync::Arc;

use crate::kernel::effect::RuntimeOp;
use crate::kernel::{Action, Effect};
use crate::models::file_tree::display_name;
use crate::models::{FolderNode, TreeError};

use super::{DispatchResult, StoreError};

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

impl super::Store {
    /// Structural mutations. A failing tree operation leaves the session untouched and emits no
    /// effects; a successful one replaces the tree before any sink runs.
    pub(super) fn reduce_tree_action(
        &mut self,
        action: Action,
    ) -> Result<DispatchResult, StoreError> {
        let (workspace_id, tree) = self.loaded_tree()?;

        let (next, op): (FolderNode, Option<RuntimeOp>) = match action {
            Action::AddFile { parent_path, file } => {
                let parent = tree.canonical_folder_path(&parent_path)?;
                let op = RuntimeOp::WriteFile {
                    path: join(&parent, &file.display_name()),
                    content: file.content.clone(),
                };
                (tree.insert_file(&parent_path, file)?, Some(op))
            }
            Action::AddFolder {
                parent_path,
                folder,
            } => {
                let parent = tree.canonical_folder_path(&parent_path)?;
                let op = RuntimeOp::Mkdir {
                    path: join(&parent, &folder.folder_name),
                };
                (tree.insert_folder(&parent_path, folder)?, Some(op))
            }
            Action::DeleteFile { parent_path, file } => {
                let parent = tree.canonical_folder_path(&parent_path)?;
                let current = tree
                    .matching_file(&parent_path, &file)
                    .ok_or_else(|| TreeError::NotFound(file.display_name()))?;
                let op = RuntimeOp::Remove {
                    path: join(&parent, &current.display_name()),
                    recursive: false,
                };
                (tree.remove_file(&parent_path, &file)?, Some(op))
            }
            Action::DeleteFolder {
                parent_path,
                folder_name,
            } => {
                let parent = tree.canonical_folder_path(&parent_path)?;
                let next = tree.remove_folder(&parent_path, &folder_name)?;
                let op = RuntimeOp::Remove {
                    path: join(&parent, &folder_name),
                    recursive: true,
                };
                (next, Some(op))
            }
            Action::RenameFile {
                parent_path,
                file,
                new_name,
                new_extension,
            } => {
                let parent = tree.canonical_folder_path(&parent_path)?;
                let current = tree
                    .matching_file(&parent_path, &file)
                    .cloned()
                    .ok_or_else(|| TreeError::NotFound(file.display_name()))?;
                let next = tree.rename_file(&parent_path, &file, &new_name, &new_extension)?;

                if let Some(buffer) = self.state.open_file_mut(&current.id) {
                    buffer.rename(&new_name, &new_extension);
                }

                let from = current.display_name();
                let to = display_name(&new_name, &new_extension);
                let op = (from != to).then(|| RuntimeOp::Rename {
                    from: join(&parent, &from),
                    to: join(&parent, &to),
                });
                (next, op)
            }
            Action::RenameFolder {
                parent_path,
                folder_name,
                new_name,
            } => {
                let parent = tree.canonical_folder_path(&parent_path)?;
                let next = tree.rename_folder(&parent_path, &folder_name, &new_name)?;
                let op = (folder_name != new_name).then(|| RuntimeOp::Rename {
                    from: join(&parent, &folder_name),
                    to: join(&parent, &new_name),
                });
                (next, op)
            }
            _ => {
                return Ok(DispatchResult {
                    effects: Vec::new(),
                    state_changed: false,
                })
            }
        };

        // renaming a node to its own name
        let Some(op) = op else {
            return Ok(DispatchResult {
                effects: Vec::new(),
                state_changed: false,
            });
        };

        let next = Arc::new(next);
        self.state.replace_tree(Some(Arc::clone(&next)));
        Ok(DispatchResult {
            effects: vec![
                Effect::Persist {
                    workspace_id,
                    tree: next,
                },
                Effect::Runtime(op),
            ],
            state_changed: true,
        })
    }
}
