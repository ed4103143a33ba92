use crate::kernel::services::ports::HydrationError;
use crate::models::{FileId, FileNode, FolderNode};

#[derive(Debug, Clone)]
pub enum Action {
    /// Installs the initial tree of `workspace_id`. `persist` marks a freshly generated tree.
    InstallTree {
        workspace_id: String,
        tree: Option<FolderNode>,
        persist: bool,
    },
    Reset,
    OpenFile {
        file: FileNode,
        cached: Option<String>,
    },
    SetActiveFile(FileId),
    UpdateBufferContent {
        file_id: FileId,
        content: String,
    },
    HydrationFinished {
        file_id: FileId,
        result: Result<String, HydrationError>,
    },
    CloseFile(FileId),
    CloseAllFiles,
    AddFile {
        parent_path: String,
        file: FileNode,
    },
    AddFolder {
        parent_path: String,
        folder: FolderNode,
    },
    DeleteFile {
        parent_path: String,
        file: FileNode,
    },
    DeleteFolder {
        parent_path: String,
        folder_name: String,
    },
    RenameFile {
        parent_path: String,
        file: FileNode,
        new_name: String,
        new_extension: String,
    },
    RenameFolder {
        parent_path: String,
        folder_name: String,
        new_name: String,
    },
}
