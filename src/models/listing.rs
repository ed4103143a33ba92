//! Builds a workspace tree from a flat remote listing.
//!
//! Files imported this way carry a fixed placeholder as content and their remote locator in
//! `origin_source`; the real content is fetched the first time the file is opened.

use super::file_tree::{FileNode, FolderNode, TreeNode};

/// Fixed text embedded in every un-hydrated file.
pub const PLACEHOLDER_MARKER: &str = "Content will load when you open the file.";

const DEFAULT_EXTENSION: &str = "txt";
const UNTITLED: &str = "untitled";

pub fn placeholder_content(path: &str) -> String {
    format!("// File imported from remote: {path}\n// {PLACEHOLDER_MARKER}")
}

pub fn is_placeholder(content: &str) -> bool {
    content.contains(PLACEHOLDER_MARKER)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: String,
    pub locator: String,
}

impl ListingEntry {
    pub fn new(path: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            locator: locator.into(),
        }
    }
}

/// Splits `name.ext` at the last dot. Names without a dot, or whose only dot is leading
/// (`.gitignore`), get the `txt` extension.
pub fn split_file_name(full: &str) -> (String, String) {
    match full.rfind('.') {
        Some(idx) if idx > 0 => (full[..idx].to_string(), full[idx + 1..].to_string()),
        _ => (full.to_string(), DEFAULT_EXTENSION.to_string()),
    }
}

#[derive(Default)]
struct FolderBuilder {
    name: String,
    folders: Vec<FolderBuilder>,
    files: Vec<FileNode>,
    order: Vec<Slot>,
}

enum Slot {
    Folder(usize),
    File(usize),
}

impl FolderBuilder {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn child(&mut self, name: &str) -> &mut FolderBuilder {
        let idx = match self.folders.iter().position(|f| f.name == name) {
            Some(idx) => idx,
            None => {
                self.folders.push(FolderBuilder::named(name));
                self.order.push(Slot::Folder(self.folders.len() - 1));
                self.folders.len() - 1
            }
        };
        &mut self.folders[idx]
    }

    fn push_file(&mut self, file: FileNode) -> bool {
        let exists = self
            .files
            .iter()
            .any(|f| f.filename == file.filename && f.file_extension == file.file_extension);
        if exists {
            return false;
        }
        self.files.push(file);
        self.order.push(Slot::File(self.files.len() - 1));
        true
    }

    fn build(mut self) -> FolderNode {
        let mut folders: Vec<Option<FolderBuilder>> =
            std::mem::take(&mut self.folders).into_iter().map(Some).collect();
        let mut files: Vec<Option<FileNode>> =
            std::mem::take(&mut self.files).into_iter().map(Some).collect();

        let items = self
            .order
            .iter()
            .filter_map(|slot| match slot {
                Slot::Folder(idx) => folders[*idx]
                    .take()
                    .map(|f| TreeNode::from(f.build())),
                Slot::File(idx) => files[*idx].take().map(TreeNode::from),
            })
            .collect();

        FolderNode::with_items(self.name, items)
    }
}

pub fn build_tree_from_listing(root_name: &str, entries: &[ListingEntry]) -> FolderNode {
    let mut root = FolderBuilder::named(root_name);

    for entry in entries {
        let mut segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let full_name = segments.pop().unwrap_or(UNTITLED);

        let mut folder = &mut root;
        for seg in segments {
            folder = folder.child(seg);
        }

        let (filename, extension) = split_file_name(full_name);
        let file = FileNode::new(filename, extension, placeholder_content(&entry.path))
            .with_origin(entry.locator.clone());
        if !folder.push_file(file) {
            tracing::debug!(path = %entry.path, "duplicate listing entry skipped");
        }
    }

    root.build()
}

#[cfg(test)]
#[path = "../../tests/unit/models/listing.rs"]
mod tests;
