//! Debounced inline completion.
//!
//! Each buffer owns a generation counter published through a `watch` channel. A request bumps
//! the generation, waits out the debounce and then calls the service, racing both waits against
//! a newer generation showing up. Only the request holding the latest generation can resolve to
//! a suggestion.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;

use crate::kernel::language::completion_language;
use crate::kernel::services::ports::{CompletionService, EngineConfig};
use crate::models::{FileId, OpenFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Suggestion(String),
    /// Nothing to suggest: empty input, an empty reply, or a swallowed service error.
    Empty,
    /// A newer edit or a cursor move invalidated the request; treat as empty.
    Superseded,
}

impl CompletionOutcome {
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            CompletionOutcome::Suggestion(text) => Some(text),
            CompletionOutcome::Empty | CompletionOutcome::Superseded => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub file_id: FileId,
    /// Text preceding the cursor.
    pub prefix: String,
    pub language: &'static str,
    /// Buffer edit version the prefix was taken from.
    pub edit_version: u64,
}

impl CompletionRequest {
    /// Builds a request from a buffer and a cursor byte offset. Offsets past the end or inside
    /// a character are clamped back to the previous character boundary.
    pub fn from_buffer(buffer: &OpenFile, cursor: usize) -> Self {
        let content = buffer.content();
        let mut end = cursor.min(content.len());
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            file_id: buffer.id.clone(),
            prefix: content[..end].to_string(),
            language: completion_language(&buffer.file_extension),
            edit_version: buffer.edit_version(),
        }
    }
}

pub struct InlineCompletion {
    service: Arc<dyn CompletionService>,
    debounce: Duration,
    max_prefix_chars: usize,
    slots: Mutex<FxHashMap<FileId, watch::Sender<u64>>>,
}

impl InlineCompletion {
    pub fn new(service: Arc<dyn CompletionService>, config: &EngineConfig) -> Self {
        Self {
            service,
            debounce: config.debounce(),
            max_prefix_chars: config.completion_max_prefix_chars,
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    pub async fn request(&self, request: CompletionRequest) -> CompletionOutcome {
        self.request_checked(request, || true).await
    }

    /// Like `request`, with `still_valid` consulted once the debounce elapsed and again before
    /// a reply is returned. It reports whether the context the prefix came from is unchanged.
    pub async fn request_checked(
        &self,
        request: CompletionRequest,
        still_valid: impl Fn() -> bool,
    ) -> CompletionOutcome {
        let file_id = request.file_id;
        let (generation, mut rx) = self.begin(&file_id);

        tokio::select! {
            _ = tokio::time::sleep(self.debounce) => {}
            _ = superseded(&mut rx, generation) => return CompletionOutcome::Superseded,
        }
        if !self.is_current(&file_id, generation) || !still_valid() {
            return CompletionOutcome::Superseded;
        }

        let tail = tail_chars(&request.prefix, self.max_prefix_chars);
        if tail.trim().is_empty() {
            return CompletionOutcome::Empty;
        }

        let result = tokio::select! {
            result = self.service.complete(tail, request.language) => result,
            _ = superseded(&mut rx, generation) => return CompletionOutcome::Superseded,
        };
        if !self.is_current(&file_id, generation) || !still_valid() {
            return CompletionOutcome::Superseded;
        }

        match result {
            Ok(reply) => {
                let text = strip_code_fence(&reply);
                if text.trim().is_empty() {
                    CompletionOutcome::Empty
                } else {
                    CompletionOutcome::Suggestion(text.to_string())
                }
            }
            Err(err) => {
                tracing::debug!(file_id = %file_id, error = %err, "completion request failed");
                CompletionOutcome::Empty
            }
        }
    }

    /// Invalidates any pending request for `file_id` (cursor moved, buffer blurred).
    pub fn cancel(&self, file_id: &FileId) {
        if let Some(tx) = self.slots.lock().get(file_id) {
            tx.send_modify(|generation| *generation += 1);
        }
    }

    /// Drops the slot of a closed buffer; pending requests resolve as superseded.
    pub fn forget(&self, file_id: &FileId) {
        self.slots.lock().remove(file_id);
    }

    fn begin(&self, file_id: &FileId) -> (u64, watch::Receiver<u64>) {
        let mut slots = self.slots.lock();
        let tx = slots
            .entry(file_id.clone())
            .or_insert_with(|| watch::channel(0).0);
        tx.send_modify(|generation| *generation += 1);
        let generation = *tx.borrow();
        (generation, tx.subscribe())
    }

    fn is_current(&self, file_id: &FileId, generation: u64) -> bool {
        self.slots
            .lock()
            .get(file_id)
            .is_some_and(|tx| *tx.borrow() == generation)
    }
}

/// Resolves once a newer generation is published or the slot is dropped.
async fn superseded(rx: &mut watch::Receiver<u64>, generation: u64) {
    let _ = rx.wait_for(|current| *current != generation).await;
}

fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let start = text
        .char_indices()
        .nth(count - max)
        .map_or(text.len(), |(idx, _)| idx);
    &text[start..]
}

/// Unwraps a reply wrapped in a markdown code fence.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return reply;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => return "",
    };
    body.strip_suffix("```").unwrap_or(body).trim_end_matches('\n')
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/completion.rs"]
mod tests;
