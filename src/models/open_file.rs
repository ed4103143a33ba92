use super::file_tree::{display_name, FileId, FileNode};

/// Live editing state of one file.
///
/// Created from a `FileNode` when the file is opened and independent from the tree afterwards;
/// the two meet again only through a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub id: FileId,
    pub filename: String,
    pub file_extension: String,
    pub origin_source: Option<String>,
    content: String,
    original_content: String,
    dirty: bool,
    edit_version: u64,
}

impl OpenFile {
    pub fn from_node(node: &FileNode, content: String) -> Self {
        Self {
            id: node.id.clone(),
            filename: node.filename.clone(),
            file_extension: node.file_extension.clone(),
            origin_source: node.origin_source.clone(),
            original_content: content.clone(),
            content,
            dirty: false,
            edit_version: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn original_content(&self) -> &str {
        &self.original_content
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn edit_version(&self) -> u64 {
        self.edit_version
    }

    pub fn display_name(&self) -> String {
        display_name(&self.filename, &self.file_extension)
    }

    /// Replaces the live content. Returns `false` when nothing changed.
    pub fn set_content(&mut self, content: String) -> bool {
        if content == self.content {
            return false;
        }
        self.content = content;
        self.edit_version += 1;
        self.dirty = self.content != self.original_content;
        true
    }

    /// Replaces both the live content and the saved snapshot (hydration, reload).
    pub fn reset_baseline(&mut self, content: String) {
        self.original_content = content.clone();
        self.content = content;
        self.edit_version += 1;
        self.dirty = false;
    }

    /// Records `snapshot` as the saved content. A buffer edited after the snapshot was taken
    /// stays dirty.
    pub fn mark_saved(&mut self, snapshot: String) {
        self.original_content = snapshot;
        self.dirty = self.content != self.original_content;
    }

    pub fn rename(&mut self, filename: &str, file_extension: &str) {
        self.filename = filename.to_string();
        self.file_extension = file_extension.to_string();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/open_file.rs"]
mod tests;
