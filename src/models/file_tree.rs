//! Workspace file tree: a persistent folder/file structure.
//!
//! Every operation returns a new root and leaves the receiver untouched. Children are shared
//! through `Arc`, so an update copies only the folders on the path to the changed node.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("`{name}` already exists in `{parent}`")]
    DuplicateName { parent: String, name: String },
    #[error("path not found: `{0}`")]
    PathNotFound(String),
    #[error("not found: `{0}`")]
    NotFound(String),
    #[error("invalid name: `{0}`")]
    InvalidName(String),
    #[error("malformed tree: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    #[serde(default)]
    pub id: FileId,
    pub filename: String,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub content: String,
    /// Locator the real content can be fetched from while `content` is still a placeholder.
    #[serde(default, alias = "githubUrl", skip_serializing_if = "Option::is_none")]
    pub origin_source: Option<String>,
}

impl FileNode {
    pub fn new(
        filename: impl Into<String>,
        file_extension: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: FileId::new(),
            filename: filename.into(),
            file_extension: file_extension.into(),
            content: content.into(),
            origin_source: None,
        }
    }

    pub fn with_origin(mut self, locator: impl Into<String>) -> Self {
        self.origin_source = Some(locator.into());
        self
    }

    /// `filename.ext`, or the bare filename when there is no extension.
    pub fn display_name(&self) -> String {
        display_name(&self.filename, &self.file_extension)
    }

    fn same_identity(&self, filename: &str, file_extension: &str) -> bool {
        self.filename == filename && self.file_extension == file_extension
    }

    fn matches(&self, other: &FileNode) -> bool {
        self.id == other.id || self.same_identity(&other.filename, &other.file_extension)
    }
}

pub(crate) fn display_name(filename: &str, file_extension: &str) -> String {
    if file_extension.is_empty() {
        filename.to_string()
    } else {
        format!("{filename}.{file_extension}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub folder_name: String,
    #[serde(default)]
    pub items: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Folder(Arc<FolderNode>),
    File(Arc<FileNode>),
}

impl TreeNode {
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            TreeNode::File(file) => Some(file),
            TreeNode::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            TreeNode::Folder(folder) => Some(folder),
            TreeNode::File(_) => None,
        }
    }
}

impl From<FileNode> for TreeNode {
    fn from(file: FileNode) -> Self {
        TreeNode::File(Arc::new(file))
    }
}

impl From<FolderNode> for TreeNode {
    fn from(folder: FolderNode) -> Self {
        TreeNode::Folder(Arc::new(folder))
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect()
}

fn join_path(parent: &[&str], name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.join("/"), name)
    }
}

fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn validate_extension(ext: &str) -> Result<(), TreeError> {
    if ext.contains('/') {
        return Err(TreeError::InvalidName(ext.to_string()));
    }
    Ok(())
}

impl FolderNode {
    pub fn new(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(folder_name: impl Into<String>, items: Vec<TreeNode>) -> Self {
        Self {
            folder_name: folder_name.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn file(&self, filename: &str, file_extension: &str) -> Option<&Arc<FileNode>> {
        self.items.iter().find_map(|node| match node {
            TreeNode::File(file) if file.same_identity(filename, file_extension) => Some(file),
            _ => None,
        })
    }

    pub fn folder(&self, folder_name: &str) -> Option<&Arc<FolderNode>> {
        self.items.iter().find_map(|node| match node {
            TreeNode::Folder(folder) if folder.folder_name == folder_name => Some(folder),
            _ => None,
        })
    }

    fn folder_at_segments(&self, segments: &[&str]) -> Option<&FolderNode> {
        let mut current = self;
        for seg in segments {
            current = current.folder(seg)?;
        }
        Some(current)
    }

    /// Resolves a parent path to root-relative segments.
    ///
    /// `""` is the root. A path starting with the root's own name is accepted when it does not
    /// resolve as a child path.
    fn resolve_folder<'a>(&self, path: &'a str) -> Result<Vec<&'a str>, TreeError> {
        let segments = split_path(path);
        if self.folder_at_segments(&segments).is_some() {
            return Ok(segments);
        }
        if let Some((first, rest)) = segments.split_first() {
            if *first == self.folder_name && self.folder_at_segments(rest).is_some() {
                return Ok(rest.to_vec());
            }
        }
        Err(TreeError::PathNotFound(path.to_string()))
    }

    /// Canonical root-relative form of a folder path (`""` for the root).
    pub fn canonical_folder_path(&self, path: &str) -> Result<String, TreeError> {
        Ok(self.resolve_folder(path)?.join("/"))
    }

    /// The file in `parent_path` that `file` refers to, by id or by name and extension.
    pub fn matching_file(&self, parent_path: &str, file: &FileNode) -> Option<&Arc<FileNode>> {
        self.folder_at(parent_path)?
            .items
            .iter()
            .find_map(|node| match node {
                TreeNode::File(f) if f.matches(file) => Some(f),
                _ => None,
            })
    }

    pub fn folder_at(&self, path: &str) -> Option<&FolderNode> {
        let segments = self.resolve_folder(path).ok()?;
        self.folder_at_segments(&segments)
    }

    pub fn file_at(&self, path: &str) -> Option<&Arc<FileNode>> {
        let segments = split_path(path);
        let (name, parent) = segments.split_last()?;
        let folder = self.folder_at_segments(parent)?;
        folder.items.iter().find_map(|node| match node {
            TreeNode::File(file) if file.display_name() == *name => Some(file),
            _ => None,
        })
    }

    /// Rebuilds the folders along `segments`, handing the innermost one to `update`.
    fn update_at<F>(&self, segments: &[&str], update: F) -> Result<FolderNode, TreeError>
    where
        F: FnOnce(&FolderNode) -> Result<FolderNode, TreeError>,
    {
        let Some((head, rest)) = segments.split_first() else {
            return update(self);
        };
        let (idx, child) = self
            .items
            .iter()
            .enumerate()
            .find_map(|(idx, node)| match node {
                TreeNode::Folder(folder) if folder.folder_name == *head => Some((idx, folder)),
                _ => None,
            })
            .ok_or_else(|| TreeError::PathNotFound(segments.join("/")))?;

        let updated = child.update_at(rest, update)?;
        let mut items = self.items.clone();
        items[idx] = TreeNode::Folder(Arc::new(updated));
        Ok(FolderNode {
            folder_name: self.folder_name.clone(),
            items,
        })
    }

    fn replace_items(&self, items: Vec<TreeNode>) -> FolderNode {
        FolderNode {
            folder_name: self.folder_name.clone(),
            items,
        }
    }

    pub fn insert_file(&self, parent_path: &str, file: FileNode) -> Result<FolderNode, TreeError> {
        validate_name(&file.filename)?;
        validate_extension(&file.file_extension)?;
        let segments = self.resolve_folder(parent_path)?;
        let mut file = file;
        if self.find_file(&file.id).is_some() {
            file.id = FileId::new();
        }
        self.update_at(&segments, |folder| {
            if folder.file(&file.filename, &file.file_extension).is_some() {
                return Err(TreeError::DuplicateName {
                    parent: parent_path.to_string(),
                    name: file.display_name(),
                });
            }
            let mut items = folder.items.clone();
            items.push(file.into());
            Ok(folder.replace_items(items))
        })
    }

    pub fn insert_folder(
        &self,
        parent_path: &str,
        folder: FolderNode,
    ) -> Result<FolderNode, TreeError> {
        validate_name(&folder.folder_name)?;
        let segments = self.resolve_folder(parent_path)?;
        self.update_at(&segments, |parent| {
            if parent.folder(&folder.folder_name).is_some() {
                return Err(TreeError::DuplicateName {
                    parent: parent_path.to_string(),
                    name: folder.folder_name.clone(),
                });
            }
            let mut items = parent.items.clone();
            items.push(folder.into());
            Ok(parent.replace_items(items))
        })
    }

    /// Removes `file` from `parent_path`, matching it by id or by its name and extension.
    pub fn remove_file(&self, parent_path: &str, file: &FileNode) -> Result<FolderNode, TreeError> {
        let segments = self.resolve_folder(parent_path)?;
        self.update_at(&segments, |folder| {
            let idx = folder
                .items
                .iter()
                .position(|node| matches!(node, TreeNode::File(f) if f.matches(file)))
                .ok_or_else(|| TreeError::NotFound(file.display_name()))?;
            let mut items = folder.items.clone();
            items.remove(idx);
            Ok(folder.replace_items(items))
        })
    }

    pub fn remove_folder(
        &self,
        parent_path: &str,
        folder_name: &str,
    ) -> Result<FolderNode, TreeError> {
        let segments = self.resolve_folder(parent_path)?;
        self.update_at(&segments, |parent| {
            let idx = parent
                .items
                .iter()
                .position(|node| matches!(node, TreeNode::Folder(f) if f.folder_name == folder_name))
                .ok_or_else(|| TreeError::NotFound(folder_name.to_string()))?;
            let mut items = parent.items.clone();
            items.remove(idx);
            Ok(parent.replace_items(items))
        })
    }

    pub fn rename_file(
        &self,
        parent_path: &str,
        file: &FileNode,
        new_name: &str,
        new_extension: &str,
    ) -> Result<FolderNode, TreeError> {
        validate_name(new_name)?;
        validate_extension(new_extension)?;
        let segments = self.resolve_folder(parent_path)?;
        self.update_at(&segments, |folder| {
            let (idx, current) = folder
                .items
                .iter()
                .enumerate()
                .find_map(|(idx, node)| match node {
                    TreeNode::File(f) if f.matches(file) => Some((idx, f)),
                    _ => None,
                })
                .ok_or_else(|| TreeError::NotFound(file.display_name()))?;

            let collides = folder.items.iter().enumerate().any(|(i, node)| {
                i != idx
                    && matches!(node, TreeNode::File(f) if f.same_identity(new_name, new_extension))
            });
            if collides {
                return Err(TreeError::DuplicateName {
                    parent: parent_path.to_string(),
                    name: display_name(new_name, new_extension),
                });
            }

            let mut renamed = FileNode::clone(current);
            renamed.filename = new_name.to_string();
            renamed.file_extension = new_extension.to_string();
            let mut items = folder.items.clone();
            items[idx] = renamed.into();
            Ok(folder.replace_items(items))
        })
    }

    pub fn rename_folder(
        &self,
        parent_path: &str,
        folder_name: &str,
        new_name: &str,
    ) -> Result<FolderNode, TreeError> {
        validate_name(new_name)?;
        let segments = self.resolve_folder(parent_path)?;
        self.update_at(&segments, |parent| {
            let (idx, current) = parent
                .items
                .iter()
                .enumerate()
                .find_map(|(idx, node)| match node {
                    TreeNode::Folder(f) if f.folder_name == folder_name => Some((idx, f)),
                    _ => None,
                })
                .ok_or_else(|| TreeError::NotFound(folder_name.to_string()))?;

            if folder_name == new_name {
                return Ok(parent.clone());
            }
            if parent.folder(new_name).is_some() {
                return Err(TreeError::DuplicateName {
                    parent: parent_path.to_string(),
                    name: new_name.to_string(),
                });
            }

            let mut items = parent.items.clone();
            items[idx] = FolderNode {
                folder_name: new_name.to_string(),
                items: current.items.clone(),
            }
            .into();
            Ok(parent.replace_items(items))
        })
    }

    /// Index chain from this folder down to the file with `id`.
    fn locate(&self, id: &FileId) -> Option<Vec<usize>> {
        let mut stack: Vec<(&FolderNode, Vec<usize>)> = vec![(self, Vec::new())];
        while let Some((folder, chain)) = stack.pop() {
            for (idx, node) in folder.items.iter().enumerate() {
                match node {
                    TreeNode::File(file) if file.id == *id => {
                        let mut found = chain.clone();
                        found.push(idx);
                        return Some(found);
                    }
                    TreeNode::Folder(child) => {
                        let mut next = chain.clone();
                        next.push(idx);
                        stack.push((child, next));
                    }
                    TreeNode::File(_) => {}
                }
            }
        }
        None
    }

    pub fn find_file(&self, id: &FileId) -> Option<&Arc<FileNode>> {
        let chain = self.locate(id)?;
        let (last, folders) = chain.split_last()?;
        let mut current = self;
        for idx in folders {
            current = current.items.get(*idx)?.as_folder()?;
        }
        match current.items.get(*last)? {
            TreeNode::File(file) => Some(file),
            TreeNode::Folder(_) => None,
        }
    }

    /// Slash-joined path of the file below the root, e.g. `src/main.py`.
    pub fn find_path(&self, id: &FileId) -> Option<String> {
        let chain = self.locate(id)?;
        let (last, folders) = chain.split_last()?;
        let mut segments = Vec::with_capacity(chain.len());
        let mut current = self;
        for idx in folders {
            current = current.items.get(*idx)?.as_folder()?;
            segments.push(current.folder_name.clone());
        }
        let file = current.items.get(*last)?.as_file()?;
        segments.push(file.display_name());
        Some(segments.join("/"))
    }

    /// Path of the folder containing the file with `id` (`""` for the root).
    pub fn parent_path_of(&self, id: &FileId) -> Option<String> {
        let path = self.find_path(id)?;
        Some(match path.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        })
    }

    pub fn with_file_content(&self, id: &FileId, content: &str) -> Result<FolderNode, TreeError> {
        let chain = self
            .locate(id)
            .ok_or_else(|| TreeError::PathNotFound(id.to_string()))?;
        Ok(self.replace_file_at(&chain, |file| {
            let mut updated = file.clone();
            updated.content = content.to_string();
            updated
        }))
    }

    fn replace_file_at<F>(&self, chain: &[usize], update: F) -> FolderNode
    where
        F: FnOnce(&FileNode) -> FileNode,
    {
        let mut items = self.items.clone();
        match chain {
            [idx] => {
                if let Some(TreeNode::File(file)) = items.get(*idx) {
                    let updated = update(file);
                    items[*idx] = updated.into();
                }
            }
            [idx, rest @ ..] => {
                if let Some(TreeNode::Folder(folder)) = items.get(*idx) {
                    let updated = folder.replace_file_at(rest, update);
                    items[*idx] = updated.into();
                }
            }
            [] => {}
        }
        self.replace_items(items)
    }

    /// All files below this folder with their root-relative paths, depth first.
    pub fn files(&self) -> Vec<(String, Arc<FileNode>)> {
        let mut out = Vec::new();
        collect_files(self, &mut Vec::new(), &mut out);
        out
    }

    pub fn file_ids(&self) -> FxHashSet<FileId> {
        self.files().into_iter().map(|(_, f)| f.id.clone()).collect()
    }

    pub fn to_value(&self) -> Result<serde_json::Value, TreeError> {
        serde_json::to_value(self).map_err(|e| TreeError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        serde_json::to_string(self).map_err(|e| TreeError::Malformed(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, TreeError> {
        let folder: FolderNode =
            serde_json::from_value(value).map_err(|e| TreeError::Malformed(e.to_string()))?;
        folder.normalized()
    }

    pub fn from_json(raw: &str) -> Result<Self, TreeError> {
        let folder: FolderNode =
            serde_json::from_str(raw).map_err(|e| TreeError::Malformed(e.to_string()))?;
        folder.normalized()
    }

    /// Rejects sibling name collisions and gives repeated file ids a fresh id.
    fn normalized(self) -> Result<Self, TreeError> {
        let mut seen = FxHashSet::default();
        normalize_folder(&self, "", &mut seen)
    }
}

fn collect_files(
    folder: &FolderNode,
    prefix: &mut Vec<String>,
    out: &mut Vec<(String, Arc<FileNode>)>,
) {
    for node in &folder.items {
        match node {
            TreeNode::File(file) => {
                let mut path = prefix.clone();
                path.push(file.display_name());
                out.push((path.join("/"), Arc::clone(file)));
            }
            TreeNode::Folder(child) => {
                prefix.push(child.folder_name.clone());
                collect_files(child, prefix, out);
                prefix.pop();
            }
        }
    }
}

fn normalize_folder(
    folder: &FolderNode,
    path: &str,
    seen_ids: &mut FxHashSet<FileId>,
) -> Result<FolderNode, TreeError> {
    let mut file_names = FxHashSet::default();
    let mut folder_names = FxHashSet::default();
    let mut items = Vec::with_capacity(folder.items.len());

    for node in &folder.items {
        match node {
            TreeNode::File(file) => {
                if !file_names.insert((file.filename.clone(), file.file_extension.clone())) {
                    return Err(TreeError::DuplicateName {
                        parent: path.to_string(),
                        name: file.display_name(),
                    });
                }
                if seen_ids.insert(file.id.clone()) {
                    items.push(node.clone());
                } else {
                    let mut file = FileNode::clone(file);
                    file.id = FileId::new();
                    seen_ids.insert(file.id.clone());
                    items.push(file.into());
                }
            }
            TreeNode::Folder(child) => {
                if !folder_names.insert(child.folder_name.clone()) {
                    return Err(TreeError::DuplicateName {
                        parent: path.to_string(),
                        name: child.folder_name.clone(),
                    });
                }
                let child_path = join_path(&split_path(path), &child.folder_name);
                items.push(normalize_folder(child, &child_path, seen_ids)?.into());
            }
        }
    }

    Ok(folder.replace_items(items))
}

#[cfg(test)]
#[path = "../../tests/unit/models/file_tree.rs"]
mod tests;
