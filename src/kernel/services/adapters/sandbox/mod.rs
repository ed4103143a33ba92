//! Sandbox backends.

mod local;
mod memory;

pub use local::{LocalDirInstance, LocalDirSandbox};
pub use memory::{MemoryInstance, MemorySandbox, SandboxCall};

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/sandbox.rs"]
mod tests;
