use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrationError {
    #[error("fetching `{locator}` failed: {message}")]
    Fetch { locator: String, message: String },
    #[error("payload could not be decoded: {0}")]
    Decode(String),
}

/// Remote origin of lazily hydrated file content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, HydrationError>;
}
