//! Service ports: traits + data contracts.

pub mod cache;
pub mod completion;
pub mod config;
pub mod persistence;
pub mod runtime;
pub mod sandbox;
pub mod source;
pub mod template;

pub use cache::{cache_key, CacheError, LocalCache};
pub use completion::{CompletionError, CompletionService};
pub use config::EngineConfig;
pub use persistence::{PersistenceError, PersistenceGateway};
pub use runtime::{AsyncExecutor, BoxFuture};
pub use sandbox::{MountEntry, MountTree, SandboxBooter, SandboxError, SandboxInstance};
pub use source::{ContentSource, HydrationError};
pub use template::{TemplateError, TemplateProvider};
