use crate::models::FileId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache quota exceeded writing `{key}` ({needed} bytes, limit {limit})")]
    QuotaExceeded { key: String, needed: u64, limit: u64 },
    #[error("cache io error: {0}")]
    Io(String),
}

/// Local write-through cache of buffer contents, keyed by `cache_key`.
///
/// Writes are last-write-wins; there is no eviction.
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }
}

pub fn cache_key(prefix: &str, id: &FileId) -> String {
    format!("{prefix}{id}")
}
