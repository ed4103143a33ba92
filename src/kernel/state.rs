use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::models::{FileId, FolderNode, OpenFile};

/// State of the workspace currently shown: its tree plus the open buffers in tab order.
#[derive(Debug, Default)]
pub struct WorkspaceSession {
    workspace_id: Option<String>,
    tree: Option<Arc<FolderNode>>,
    open_files: Vec<OpenFile>,
    index: FxHashMap<FileId, usize>,
    active_file_id: Option<FileId>,
}

impl WorkspaceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    pub fn tree(&self) -> Option<&Arc<FolderNode>> {
        self.tree.as_ref()
    }

    pub fn open_files(&self) -> &[OpenFile] {
        &self.open_files
    }

    pub fn open_file(&self, id: &FileId) -> Option<&OpenFile> {
        self.index.get(id).and_then(|idx| self.open_files.get(*idx))
    }

    pub fn is_open(&self, id: &FileId) -> bool {
        self.index.contains_key(id)
    }

    pub fn active_file_id(&self) -> Option<&FileId> {
        self.active_file_id.as_ref()
    }

    pub fn dirty_file_ids(&self) -> Vec<FileId> {
        self.open_files
            .iter()
            .filter(|f| f.has_unsaved_changes())
            .map(|f| f.id.clone())
            .collect()
    }

    pub(crate) fn open_file_mut(&mut self, id: &FileId) -> Option<&mut OpenFile> {
        let idx = *self.index.get(id)?;
        self.open_files.get_mut(idx)
    }

    pub(crate) fn begin(&mut self, workspace_id: &str) {
        if self.workspace_id.as_deref() != Some(workspace_id) {
            *self = Self {
                workspace_id: Some(workspace_id.to_string()),
                ..Self::default()
            };
        }
    }

    pub(crate) fn replace_tree(&mut self, tree: Option<Arc<FolderNode>>) {
        self.tree = tree;
    }

    pub(crate) fn push_open_file(&mut self, file: OpenFile) {
        self.index.insert(file.id.clone(), self.open_files.len());
        self.active_file_id = Some(file.id.clone());
        self.open_files.push(file);
    }

    pub(crate) fn set_active(&mut self, id: Option<FileId>) -> bool {
        if let Some(id) = &id {
            if !self.is_open(id) {
                return false;
            }
        }
        if self.active_file_id == id {
            return false;
        }
        self.active_file_id = id;
        true
    }

    /// Removes a buffer. If it was active, activation moves to the buffer that took its tab
    /// position, else to the new last buffer, else nowhere.
    pub(crate) fn remove_open_file(&mut self, id: &FileId) -> Option<OpenFile> {
        let idx = self.index.remove(id)?;
        let removed = self.open_files.remove(idx);
        self.rebuild_index();

        if self.active_file_id.as_ref() == Some(id) {
            self.active_file_id = self
                .open_files
                .get(idx)
                .or_else(|| self.open_files.last())
                .map(|f| f.id.clone());
        }
        Some(removed)
    }

    pub(crate) fn clear_open_files(&mut self) -> usize {
        let closed = self.open_files.len();
        self.open_files.clear();
        self.index.clear();
        self.active_file_id = None;
        closed
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .open_files
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.id.clone(), idx))
            .collect();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/state.rs"]
mod tests;
