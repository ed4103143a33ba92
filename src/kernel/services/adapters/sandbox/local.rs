use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::kernel::services::ports::{
    MountEntry, MountTree, SandboxBooter, SandboxError, SandboxInstance,
};

/// Sandbox backed by a scratch directory. Every boot gets a fresh `sandbox-<uuid>` directory
/// under `root`; teardown deletes it.
pub struct LocalDirSandbox {
    root: PathBuf,
}

impl LocalDirSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SandboxBooter for LocalDirSandbox {
    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>, SandboxError> {
        let dir = self.root.join(format!("sandbox-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SandboxError::Boot(format!("{}: {e}", dir.display())))?;
        tracing::debug!(dir = %dir.display(), "local sandbox booted");
        Ok(Arc::new(LocalDirInstance {
            dir,
            torn_down: AtomicBool::new(false),
        }))
    }
}

pub struct LocalDirInstance {
    dir: PathBuf,
    torn_down: AtomicBool,
}

fn io_error(path: &str, err: std::io::Error) -> SandboxError {
    if err.kind() == std::io::ErrorKind::NotFound {
        SandboxError::NotFound(path.to_string())
    } else {
        SandboxError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl LocalDirInstance {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(SandboxError::TornDown);
        }
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SandboxError::Io {
                path: path.to_string(),
                message: "path leaves the sandbox directory".into(),
            });
        }
        Ok(self.dir.join(relative))
    }

    async fn mount_into(&self, base: PathBuf, tree: &MountTree) -> Result<(), SandboxError> {
        // iterative walk; async recursion would need boxing
        let mut pending = vec![(base, tree)];
        while let Some((dir, entries)) = pending.pop() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_error(&dir.display().to_string(), e))?;
            for (name, entry) in entries {
                let target = dir.join(name);
                match entry {
                    MountEntry::File { contents } => {
                        tokio::fs::write(&target, contents)
                            .await
                            .map_err(|e| io_error(name, e))?;
                    }
                    MountEntry::Directory(children) => pending.push((target, children)),
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SandboxInstance for LocalDirInstance {
    async fn mount(&self, tree: &MountTree) -> Result<(), SandboxError> {
        let base = self.resolve("")?;
        self.mount_into(base, tree).await
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        let target = self.resolve(path)?;
        let result = if recursive {
            tokio::fs::create_dir_all(&target).await
        } else {
            tokio::fs::create_dir(&target).await
        };
        result.map_err(|e| io_error(path, e))
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), SandboxError> {
        let target = self.resolve(path)?;
        tokio::fs::write(&target, contents)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), SandboxError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| io_error(from, e))
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        let target = self.resolve(path)?;
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|e| io_error(path, e))?;
        let result = if !meta.is_dir() {
            tokio::fs::remove_file(&target).await
        } else if recursive {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_dir(&target).await
        };
        result.map_err(|e| io_error(path, e))
    }

    async fn teardown(&self) -> Result<(), SandboxError> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.dir.display().to_string(), e)),
        }
    }
}
