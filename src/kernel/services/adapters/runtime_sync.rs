//! Process-wide handle on the sandboxed runtime.
//!
//! `RuntimeSync` boots at most one sandbox at a time. Concurrent `acquire` calls share a single
//! in-flight boot; a failed boot clears the slot so the next call retries. `release` tears the
//! instance down, and a boot that completes after a release is torn down instead of installed.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::kernel::effect::RuntimeOp;
use crate::kernel::services::ports::{
    MountEntry, MountTree, SandboxBooter, SandboxError, SandboxInstance,
};
use crate::models::{FolderNode, TreeNode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeSyncError {
    #[error("sandbox runtime is not available")]
    Unavailable,
    #[error("sandbox write to `{path}` failed: {message}")]
    Write { path: String, message: String },
    #[error("sandbox boot failed: {0}")]
    Boot(String),
    #[error("sandbox teardown failed: {0}")]
    Teardown(String),
}

type BootResult = Result<Arc<dyn SandboxInstance>, RuntimeSyncError>;
type BootFuture = Shared<BoxFuture<'static, BootResult>>;

enum Slot {
    Idle,
    Booting {
        generation: u64,
        boot: BootFuture,
    },
    Ready {
        generation: u64,
        instance: Arc<dyn SandboxInstance>,
    },
}

struct SlotState {
    slot: Slot,
    next_generation: u64,
}

enum Settled {
    Installed(Arc<dyn SandboxInstance>),
    Orphaned(Arc<dyn SandboxInstance>),
    Failed(RuntimeSyncError),
}

pub struct RuntimeSync {
    booter: Arc<dyn SandboxBooter>,
    state: Mutex<SlotState>,
}

impl RuntimeSync {
    pub fn new(booter: Arc<dyn SandboxBooter>) -> Self {
        Self {
            booter,
            state: Mutex::new(SlotState {
                slot: Slot::Idle,
                next_generation: 0,
            }),
        }
    }

    /// The booted instance, if any. Never starts a boot.
    pub fn instance(&self) -> Option<Arc<dyn SandboxInstance>> {
        match &self.state.lock().slot {
            Slot::Ready { instance, .. } => Some(Arc::clone(instance)),
            Slot::Idle | Slot::Booting { .. } => None,
        }
    }

    pub fn is_booting(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Booting { .. })
    }

    pub async fn acquire(&self) -> BootResult {
        let (generation, boot) = {
            let mut state = self.state.lock();
            match &state.slot {
                Slot::Ready { instance, .. } => return Ok(Arc::clone(instance)),
                Slot::Booting { generation, boot } => (*generation, boot.clone()),
                Slot::Idle => {
                    state.next_generation += 1;
                    let generation = state.next_generation;
                    let booter = Arc::clone(&self.booter);
                    let boot = async move {
                        booter
                            .boot()
                            .await
                            .map_err(|e| RuntimeSyncError::Boot(e.to_string()))
                    }
                    .boxed()
                    .shared();
                    state.slot = Slot::Booting {
                        generation,
                        boot: boot.clone(),
                    };
                    tracing::info!(generation, "booting sandbox");
                    (generation, boot)
                }
            }
        };

        let result = boot.await;

        let settled = {
            let mut state = self.state.lock();
            let current = match &state.slot {
                Slot::Booting { generation: g, .. } | Slot::Ready { generation: g, .. } => {
                    *g == generation
                }
                Slot::Idle => false,
            };
            match result {
                Ok(instance) if current => {
                    if matches!(state.slot, Slot::Booting { .. }) {
                        state.slot = Slot::Ready {
                            generation,
                            instance: Arc::clone(&instance),
                        };
                        tracing::info!(generation, "sandbox ready");
                    }
                    Settled::Installed(instance)
                }
                Ok(instance) => Settled::Orphaned(instance),
                Err(err) => {
                    if current {
                        state.slot = Slot::Idle;
                    }
                    Settled::Failed(err)
                }
            }
        };

        match settled {
            Settled::Installed(instance) => Ok(instance),
            Settled::Orphaned(instance) => {
                tracing::debug!(generation, "sandbox booted after release, tearing down");
                if let Err(err) = instance.teardown().await {
                    tracing::warn!(error = %err, "teardown of orphaned sandbox failed");
                }
                Err(RuntimeSyncError::Unavailable)
            }
            Settled::Failed(err) => {
                tracing::warn!(generation, error = %err, "sandbox boot failed");
                Err(err)
            }
        }
    }

    /// Tears the instance down and forgets it. A no-op when nothing was booted.
    pub async fn release(&self) -> Result<(), RuntimeSyncError> {
        let previous = std::mem::replace(&mut self.state.lock().slot, Slot::Idle);
        match previous {
            Slot::Ready { instance, .. } => {
                tracing::info!("releasing sandbox");
                instance
                    .teardown()
                    .await
                    .map_err(|e| RuntimeSyncError::Teardown(e.to_string()))
            }
            // the in-flight boot tears itself down when it settles
            Slot::Booting { .. } | Slot::Idle => Ok(()),
        }
    }

    /// Boots if needed and mounts the whole tree.
    pub async fn seed(&self, tree: &FolderNode) -> Result<(), RuntimeSyncError> {
        let instance = self.acquire().await?;
        instance
            .mount(&materialize(tree))
            .await
            .map_err(|e| write_error("", e))
    }

    /// Writes `content` at `path`, creating missing parent directories first.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), RuntimeSyncError> {
        let instance = self.instance().ok_or(RuntimeSyncError::Unavailable)?;
        let path = sandbox_path(path)?;
        ensure_parent(instance.as_ref(), &path).await?;
        instance
            .write_file(&path, content)
            .await
            .map_err(|e| write_error(&path, e))
    }

    pub async fn apply(&self, op: &RuntimeOp) -> Result<(), RuntimeSyncError> {
        match op {
            RuntimeOp::WriteFile { path, content } => self.write_file(path, content).await,
            RuntimeOp::Mkdir { path } => {
                let instance = self.instance().ok_or(RuntimeSyncError::Unavailable)?;
                let path = sandbox_path(path)?;
                instance
                    .mkdir(&path, true)
                    .await
                    .map_err(|e| write_error(&path, e))
            }
            RuntimeOp::Rename { from, to } => {
                let instance = self.instance().ok_or(RuntimeSyncError::Unavailable)?;
                let from = sandbox_path(from)?;
                let to = sandbox_path(to)?;
                ensure_parent(instance.as_ref(), &to).await?;
                instance
                    .rename(&from, &to)
                    .await
                    .map_err(|e| write_error(&from, e))
            }
            RuntimeOp::Remove { path, recursive } => {
                let instance = self.instance().ok_or(RuntimeSyncError::Unavailable)?;
                let path = sandbox_path(path)?;
                instance
                    .remove(&path, *recursive)
                    .await
                    .map_err(|e| write_error(&path, e))
            }
        }
    }
}

/// Converts the tree into the sandbox's nested mount shape. The root folder itself is the
/// sandbox root and does not appear as an entry.
pub fn materialize(tree: &FolderNode) -> MountTree {
    tree.items
        .iter()
        .map(|node| match node {
            TreeNode::File(file) => (
                file.display_name(),
                MountEntry::File {
                    contents: file.content.clone(),
                },
            ),
            TreeNode::Folder(folder) => (
                folder.folder_name.clone(),
                MountEntry::Directory(materialize(folder)),
            ),
        })
        .collect()
}

/// Normalizes a root-relative sandbox path, rejecting absolute paths and `..` segments.
pub fn sandbox_path(path: &str) -> Result<String, RuntimeSyncError> {
    let reject = |message: &str| RuntimeSyncError::Write {
        path: path.to_string(),
        message: message.to_string(),
    };
    if path.starts_with('/') {
        return Err(reject("absolute paths are not allowed"));
    }
    let segments: Vec<&str> = path
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect();
    if segments.iter().any(|seg| *seg == "..") {
        return Err(reject("path escapes the sandbox root"));
    }
    if segments.is_empty() {
        return Err(reject("empty path"));
    }
    Ok(segments.join("/"))
}

async fn ensure_parent(instance: &dyn SandboxInstance, path: &str) -> Result<(), RuntimeSyncError> {
    match path.rsplit_once('/') {
        Some((parent, _)) => instance
            .mkdir(parent, true)
            .await
            .map_err(|e| write_error(parent, e)),
        None => Ok(()),
    }
}

fn write_error(path: &str, err: SandboxError) -> RuntimeSyncError {
    match err {
        SandboxError::TornDown => RuntimeSyncError::Unavailable,
        other => RuntimeSyncError::Write {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/runtime_sync.rs"]
mod tests;
