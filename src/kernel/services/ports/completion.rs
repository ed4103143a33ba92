use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("completion service unavailable: {0}")]
    Unavailable(String),
    #[error("completion request failed: {0}")]
    Request(String),
}

/// Single-shot inline completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, text_tail: &str, language: &str) -> Result<String, CompletionError>;
}
