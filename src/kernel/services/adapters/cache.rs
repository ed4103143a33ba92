use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::kernel::services::ports::{CacheError, LocalCache};

use super::paths::hash_key;

#[derive(Default)]
struct MemoryCacheInner {
    entries: Mutex<FxHashMap<String, String>>,
    max_bytes: Option<u64>,
    fail_writes: AtomicBool,
}

/// In-memory cache with an optional total size quota.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<MemoryCacheInner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(max_bytes: u64) -> Self {
        Self {
            inner: Arc::new(MemoryCacheInner {
                max_bytes: Some(max_bytes),
                ..MemoryCacheInner::default()
            }),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Io("injected write failure".into()));
        }
        let mut entries = self.inner.entries.lock();
        if let Some(limit) = self.inner.max_bytes {
            let others: u64 = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum();
            let needed = (key.len() + value.len()) as u64;
            if others + needed > limit {
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Cache stored as one file per key under `root`, named by the key's hash.
///
/// The optional quota bounds the total size of the directory.
pub struct DirCache {
    root: PathBuf,
    max_bytes: Option<u64>,
}

impl DirCache {
    pub fn new(root: impl Into<PathBuf>, max_bytes: Option<u64>) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.cache", hash_key(key)))
    }

    fn used_bytes_except(&self, skip: &std::path::Path) -> std::io::Result<u64> {
        let mut total = 0;
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            if entry.path() == skip {
                continue;
            }
            total += entry.metadata()?.len();
        }
        Ok(total)
    }
}

fn io_error(err: std::io::Error) -> CacheError {
    CacheError::Io(err.to_string())
}

impl LocalCache for DirCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if let Some(limit) = self.max_bytes {
            let used = self.used_bytes_except(&path).map_err(io_error)?;
            let needed = value.len() as u64;
            if used + needed > limit {
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        std::fs::create_dir_all(&self.root).map_err(io_error)?;
        std::fs::write(&path, value).map_err(io_error)
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/cache.rs"]
mod tests;
