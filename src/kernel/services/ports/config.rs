use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_KEY_PREFIX: &str = "workspace-file-";
pub const DEFAULT_LOG_FILTER: &str = "workspace_sync=info";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub completion_debounce_ms: u64,
    pub completion_max_prefix_chars: usize,
    pub cache_key_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_bytes: Option<u64>,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion_debounce_ms: 1000,
            completion_max_prefix_chars: 1500,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            cache_max_bytes: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.completion_debounce_ms)
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/config.rs"]
mod tests;
