use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    #[error("sandbox boot failed: {0}")]
    Boot(String),
    #[error("sandbox io error at `{path}`: {message}")]
    Io { path: String, message: String },
    #[error("no such path in sandbox: `{0}`")]
    NotFound(String),
    #[error("sandbox has been torn down")]
    TornDown,
}

/// Nested directory shape a sandbox filesystem is seeded from.
///
/// Serializes as `{"main.py": {"file": {"contents": ".."}}, "src": {"directory": {..}}}`.
pub type MountTree = BTreeMap<String, MountEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountEntry {
    File { contents: String },
    Directory(MountTree),
}

/// Boots the sandboxed execution environment. Booting is expensive; callers go through
/// `RuntimeSync`, which keeps at most one boot in flight.
#[async_trait]
pub trait SandboxBooter: Send + Sync {
    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>, SandboxError>;
}

/// Filesystem of one booted sandbox. Paths are relative to the sandbox root.
#[async_trait]
pub trait SandboxInstance: Send + Sync {
    async fn mount(&self, tree: &MountTree) -> Result<(), SandboxError>;
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError>;
    async fn write_file(&self, path: &str, contents: &str) -> Result<(), SandboxError>;
    async fn rename(&self, from: &str, to: &str) -> Result<(), SandboxError>;
    async fn remove(&self, path: &str, recursive: bool) -> Result<(), SandboxError>;
    /// Releases the sandbox. Calling it again is a no-op.
    async fn teardown(&self) -> Result<(), SandboxError>;
}
