use std::sync::Arc;

use crate::models::{FileId, FolderNode};

/// Path-addressed change to the sandbox filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeOp {
    WriteFile { path: String, content: String },
    Mkdir { path: String },
    Rename { from: String, to: String },
    Remove { path: String, recursive: bool },
}

impl RuntimeOp {
    pub fn path(&self) -> &str {
        match self {
            RuntimeOp::WriteFile { path, .. }
            | RuntimeOp::Mkdir { path }
            | RuntimeOp::Remove { path, .. } => path,
            RuntimeOp::Rename { to, .. } => to,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    Persist {
        workspace_id: String,
        tree: Arc<FolderNode>,
    },
    Runtime(RuntimeOp),
    SeedRuntime {
        tree: Arc<FolderNode>,
    },
    CacheWrite {
        file_id: FileId,
        content: String,
    },
    Hydrate {
        file_id: FileId,
        locator: String,
    },
}
