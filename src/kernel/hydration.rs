//! Lazy content hydration helpers.
//!
//! A file imported from a remote listing holds a placeholder until it is opened. While the fetch
//! runs the buffer shows `LOADING_PLACEHOLDER`; a failed fetch leaves `ERROR_PLACEHOLDER`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::kernel::services::ports::HydrationError;
use crate::models::is_placeholder;

pub const LOADING_PLACEHOLDER: &str = "// Fetching file from remote...";
pub const ERROR_PLACEHOLDER: &str = "// Error loading remote file.";

/// Transient buffer contents that must never reach the cache or count as an edit.
pub fn is_transient(content: &str) -> bool {
    content == LOADING_PLACEHOLDER || content == ERROR_PLACEHOLDER
}

/// Cached text usable in place of a fetch.
pub fn is_real_content(cached: &str) -> bool {
    !is_placeholder(cached) && !is_transient(cached)
}

#[derive(serde::Deserialize)]
struct RemotePayload {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Decodes a fetched payload into text.
///
/// A JSON object with a `content` field is treated as a remote file record whose content is
/// base64 (line-wrapped base64 is accepted) unless `encoding` names something else. Anything
/// else must be UTF-8 text.
pub fn decode_payload(raw: &[u8]) -> Result<String, HydrationError> {
    if let Ok(payload) = serde_json::from_slice::<RemotePayload>(raw) {
        return match payload.encoding.as_deref() {
            None | Some("base64") => decode_base64(&payload.content),
            Some(_) => Ok(payload.content),
        };
    }
    String::from_utf8(raw.to_vec()).map_err(|e| HydrationError::Decode(e.to_string()))
}

fn decode_base64(encoded: &str) -> Result<String, HydrationError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| HydrationError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| HydrationError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/hydration.rs"]
mod tests;
