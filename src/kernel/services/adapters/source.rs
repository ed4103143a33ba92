use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::kernel::services::ports::{ContentSource, HydrationError};

/// Resolves locators as paths below `root`.
pub struct FileContentSource {
    root: PathBuf,
}

impl FileContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentSource for FileContentSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, HydrationError> {
        let relative = locator.trim_start_matches('/');
        if relative.split('/').any(|seg| seg == "..") {
            return Err(HydrationError::Fetch {
                locator: locator.to_string(),
                message: "locator leaves the source root".into(),
            });
        }
        tokio::fs::read(self.root.join(relative))
            .await
            .map_err(|e| HydrationError::Fetch {
                locator: locator.to_string(),
                message: e.to_string(),
            })
    }
}

/// Serves fixed payloads; unknown locators fail. Counts fetches.
#[derive(Clone, Default)]
pub struct MemoryContentSource {
    payloads: Arc<Mutex<FxHashMap<String, Vec<u8>>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, locator: &str, payload: impl Into<Vec<u8>>) {
        self.payloads
            .lock()
            .insert(locator.to_string(), payload.into());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, HydrationError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .lock()
            .get(locator)
            .cloned()
            .ok_or_else(|| HydrationError::Fetch {
                locator: locator.to_string(),
                message: "not found".into(),
            })
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/source.rs"]
mod tests;
