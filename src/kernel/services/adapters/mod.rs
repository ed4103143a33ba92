//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod cache;
pub mod executor;
pub mod paths;
pub mod persistence;
pub mod runtime_sync;
pub mod sandbox;
pub mod settings;
pub mod source;
pub mod templates;

pub use cache::{DirCache, MemoryCache};
pub use executor::TokioExecutor;
pub use paths::{
    ensure_cache_dir, ensure_log_dir, ensure_sandbox_dir, ensure_workspaces_dir, get_log_dir,
};
pub use persistence::{JsonDirStore, MemoryStore};
pub use runtime_sync::{materialize, sandbox_path, RuntimeSync, RuntimeSyncError};
pub use sandbox::{LocalDirInstance, LocalDirSandbox, MemoryInstance, MemorySandbox, SandboxCall};
pub use settings::{ensure_settings_file, get_settings_path, load_settings, SettingsError};
pub use source::{FileContentSource, MemoryContentSource};
pub use templates::{StarterKind, StarterTemplates};
