//! 应用数据目录
//!
//! 跨平台的数据目录（`dirs` 解析）：
//! - macOS: ~/Library/Application Support/workspace-sync/
//! - Linux: $XDG_DATA_HOME/workspace-sync/ 或 ~/.local/share/workspace-sync/
//! - Windows: %APPDATA%\workspace-sync\

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

pub const APP_NAME: &str = "workspace-sync";
const WORKSPACES_DIR: &str = "workspaces";
const CACHE_DIR: &str = "cache";
const LOG_DIR: &str = "logs";
const SANDBOX_DIR: &str = "sandboxes";

fn get_app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_NAME))
}

/// 配置目录（settings.json 所在）
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// 计算键的哈希值（用于生成文件名）
pub fn hash_key(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

pub fn get_workspaces_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(WORKSPACES_DIR))
}

pub fn get_cache_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(CACHE_DIR))
}

pub fn get_log_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(LOG_DIR))
}

pub fn get_sandbox_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(SANDBOX_DIR))
}

fn ensure_dir(dir: Option<PathBuf>, what: &str) -> std::io::Result<PathBuf> {
    let dir = dir.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Cannot determine {what} directory"),
        )
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}

/// 确保日志目录存在
pub fn ensure_log_dir() -> std::io::Result<PathBuf> {
    ensure_dir(get_log_dir(), "log")
}

pub fn ensure_workspaces_dir() -> std::io::Result<PathBuf> {
    ensure_dir(get_workspaces_dir(), "workspaces")
}

pub fn ensure_cache_dir() -> std::io::Result<PathBuf> {
    ensure_dir(get_cache_dir(), "cache")
}

pub fn ensure_sandbox_dir() -> std::io::Result<PathBuf> {
    ensure_dir(get_sandbox_dir(), "sandbox")
}

/// File name safe for any platform: the key itself when it is plain ASCII, its hash otherwise.
pub fn file_stem_for(key: &str) -> String {
    let plain = !key.is_empty()
        && key.len() <= 64
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if plain {
        key.to_string()
    } else {
        hash_key(key)
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/paths.rs"]
mod tests;
