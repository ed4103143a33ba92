use crate::kernel::hydration::{is_real_content, is_transient, ERROR_PLACEHOLDER, LOADING_PLACEHOLDER};
use crate::kernel::services::ports::HydrationError;
use crate::kernel::{Action, Effect};
use crate::models::{is_placeholder, FileId, FileNode, OpenFile};

use super::{DispatchResult, StoreError};

impl super::Store {
    pub(super) fn reduce_buffer_action(
        &mut self,
        action: Action,
    ) -> Result<DispatchResult, StoreError> {
        match action {
            Action::OpenFile { file, cached } => Ok(self.open_file(file, cached)),
            Action::SetActiveFile(file_id) => {
                if !self.state.is_open(&file_id) {
                    return Err(StoreError::FileNotOpen(file_id));
                }
                Ok(DispatchResult {
                    effects: Vec::new(),
                    state_changed: self.state.set_active(Some(file_id)),
                })
            }
            Action::UpdateBufferContent { file_id, content } => {
                self.update_buffer_content(file_id, content)
            }
            Action::HydrationFinished { file_id, result } => {
                Ok(self.finish_hydration(file_id, result))
            }
            Action::CloseFile(file_id) => Ok(DispatchResult {
                effects: Vec::new(),
                state_changed: self.state.remove_open_file(&file_id).is_some(),
            }),
            Action::CloseAllFiles => Ok(DispatchResult {
                effects: Vec::new(),
                state_changed: self.state.clear_open_files() > 0,
            }),
            _ => Ok(DispatchResult {
                effects: Vec::new(),
                state_changed: false,
            }),
        }
    }

    fn open_file(&mut self, file: FileNode, cached: Option<String>) -> DispatchResult {
        if self.state.is_open(&file.id) {
            return DispatchResult {
                effects: Vec::new(),
                state_changed: self.state.set_active(Some(file.id)),
            };
        }

        // the tree's copy is authoritative; the caller may hold a node from before a save
        let node = self
            .state
            .tree()
            .and_then(|tree| tree.find_file(&file.id))
            .map(|node| FileNode::clone(node))
            .unwrap_or(file);

        let mut effects = Vec::new();
        let content = if !is_placeholder(&node.content) {
            node.content.clone()
        } else if let Some(cached) = cached.filter(|c| is_real_content(c)) {
            cached
        } else if let Some(locator) = node.origin_source.clone() {
            effects.push(Effect::Hydrate {
                file_id: node.id.clone(),
                locator,
            });
            LOADING_PLACEHOLDER.to_string()
        } else {
            tracing::warn!(file_id = %node.id, "placeholder file has no origin to hydrate from");
            node.content.clone()
        };

        self.state.push_open_file(OpenFile::from_node(&node, content));
        DispatchResult {
            effects,
            state_changed: true,
        }
    }

    fn update_buffer_content(
        &mut self,
        file_id: FileId,
        content: String,
    ) -> Result<DispatchResult, StoreError> {
        let Some(buffer) = self.state.open_file_mut(&file_id) else {
            return Err(StoreError::FileNotOpen(file_id));
        };
        if !buffer.set_content(content) {
            return Ok(DispatchResult {
                effects: Vec::new(),
                state_changed: false,
            });
        }

        let mut effects = Vec::new();
        if !is_transient(buffer.content()) {
            effects.push(Effect::CacheWrite {
                content: buffer.content().to_string(),
                file_id,
            });
        }
        Ok(DispatchResult {
            effects,
            state_changed: true,
        })
    }

    /// Applies a fetch result, unless the buffer was closed or edited since the fetch started.
    fn finish_hydration(
        &mut self,
        file_id: FileId,
        result: Result<String, HydrationError>,
    ) -> DispatchResult {
        let unchanged = DispatchResult {
            effects: Vec::new(),
            state_changed: false,
        };
        let Some(buffer) = self.state.open_file_mut(&file_id) else {
            tracing::debug!(file_id = %file_id, "hydration finished for a closed buffer");
            return unchanged;
        };
        if buffer.content() != LOADING_PLACEHOLDER {
            tracing::debug!(file_id = %file_id, "buffer changed during hydration, result dropped");
            return unchanged;
        }

        match result {
            Ok(content) => {
                buffer.reset_baseline(content.clone());
                DispatchResult {
                    effects: vec![Effect::CacheWrite { file_id, content }],
                    state_changed: true,
                }
            }
            Err(err) => {
                tracing::warn!(file_id = %file_id, error = %err, "hydration failed");
                buffer.reset_baseline(ERROR_PLACEHOLDER.to_string());
                DispatchResult {
                    effects: Vec::new(),
                    state_changed: true,
                }
            }
        }
    }
}
