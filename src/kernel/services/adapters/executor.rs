use crate::kernel::services::ports::{AsyncExecutor, BoxFuture};

/// Spawns onto a tokio runtime handle.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl AsyncExecutor for TokioExecutor {
    fn spawn(&self, task: BoxFuture) {
        self.handle.spawn(task);
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/executor.rs"]
mod tests;
