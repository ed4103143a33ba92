use std::future::Future;
use std::pin::Pin;

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs detached background work such as content hydration.
pub trait AsyncExecutor: Send + Sync {
    fn spawn(&self, task: BoxFuture);
}

impl<F> AsyncExecutor for F
where
    F: Fn(BoxFuture) + Send + Sync,
{
    fn spawn(&self, task: BoxFuture) {
        self(task)
    }
}
