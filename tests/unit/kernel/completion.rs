use super::*;
use crate::kernel::services::ports::CompletionError;
use crate::models::FileNode;
use async_trait::async_trait;

struct RecordingService {
    calls: Mutex<Vec<(String, String)>>,
    reply: Result<String, CompletionError>,
    latency: Duration,
}

impl RecordingService {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Ok(reply.to_string()),
            latency: Duration::ZERO,
        })
    }

    fn slow(reply: &str, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Ok(reply.to_string()),
            latency,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Err(CompletionError::Request("boom".into())),
            latency: Duration::ZERO,
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompletionService for RecordingService {
    async fn complete(&self, text_tail: &str, language: &str) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .push((text_tail.to_string(), language.to_string()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.reply.clone()
    }
}

fn pipeline(service: Arc<RecordingService>) -> InlineCompletion {
    InlineCompletion::new(service, &EngineConfig::default())
}

fn request(id: &str, prefix: &str) -> CompletionRequest {
    CompletionRequest {
        file_id: FileId::from(id),
        prefix: prefix.to_string(),
        language: "python",
        edit_version: 0,
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_request_resolves_after_debounce() {
    let service = RecordingService::replying("print(2)");
    let completion = pipeline(service.clone());

    let started = tokio::time::Instant::now();
    let outcome = completion.request(request("a", "def f():\n    ")).await;

    assert_eq!(outcome, CompletionOutcome::Suggestion("print(2)".into()));
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(
        service.calls(),
        vec![("def f():\n    ".to_string(), "python".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_three_quick_edits_send_one_request() {
    let service = RecordingService::replying("x");
    let completion = pipeline(service.clone());

    let first = completion.request(request("a", "p"));
    let second = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        completion.request(request("a", "pr")).await
    };
    let third = async {
        tokio::time::sleep(Duration::from_millis(600)).await;
        completion.request(request("a", "pri")).await
    };
    let (first, second, third) = tokio::join!(first, second, third);

    assert_eq!(first, CompletionOutcome::Superseded);
    assert_eq!(second, CompletionOutcome::Superseded);
    assert_eq!(third, CompletionOutcome::Suggestion("x".into()));
    assert_eq!(service.calls(), vec![("pri".to_string(), "python".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_result_is_discarded_when_superseded() {
    let service = RecordingService::slow("late", Duration::from_millis(500));
    let completion = pipeline(service.clone());

    let first = completion.request(request("a", "one"));
    let second = async {
        // first request is already waiting on the service by now
        tokio::time::sleep(Duration::from_millis(1200)).await;
        completion.request(request("a", "two")).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, CompletionOutcome::Superseded);
    assert_eq!(second, CompletionOutcome::Suggestion("late".into()));
    assert_eq!(service.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_buffers_debounce_independently() {
    let service = RecordingService::replying("x");
    let completion = pipeline(service.clone());

    let (a, b) = tokio::join!(
        completion.request(request("a", "left")),
        completion.request(request("b", "right"))
    );
    assert!(a.suggestion().is_some());
    assert!(b.suggestion().is_some());
    assert_eq!(service.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_invalidates_pending_request() {
    let service = RecordingService::replying("x");
    let completion = pipeline(service.clone());

    let pending = completion.request(request("a", "text"));
    let cursor_move = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        completion.cancel(&FileId::from("a"));
    };
    let (outcome, ()) = tokio::join!(pending, cursor_move);

    assert_eq!(outcome, CompletionOutcome::Superseded);
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_forget_supersedes_pending_request() {
    let service = RecordingService::replying("x");
    let completion = pipeline(service.clone());

    let pending = completion.request(request("a", "text"));
    let close = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        completion.forget(&FileId::from("a"));
    };
    let (outcome, ()) = tokio::join!(pending, close);
    assert_eq!(outcome, CompletionOutcome::Superseded);
}

#[tokio::test(start_paused = true)]
async fn test_blank_input_skips_service() {
    let service = RecordingService::replying("x");
    let completion = pipeline(service.clone());

    assert_eq!(
        completion.request(request("a", "   \n\t")).await,
        CompletionOutcome::Empty
    );
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_service_errors_are_swallowed() {
    let completion = pipeline(RecordingService::failing());
    assert_eq!(
        completion.request(request("a", "x = ")).await,
        CompletionOutcome::Empty
    );
}

#[tokio::test(start_paused = true)]
async fn test_prefix_is_truncated_to_tail() {
    let service = RecordingService::replying("x");
    let config = EngineConfig {
        completion_max_prefix_chars: 4,
        ..EngineConfig::default()
    };
    let completion = InlineCompletion::new(service.clone(), &config);

    completion.request(request("a", "héllo wörld")).await;
    assert_eq!(service.calls()[0].0, "örld");
}

#[test]
fn test_tail_chars_respects_char_boundaries() {
    assert_eq!(tail_chars("abc", 10), "abc");
    assert_eq!(tail_chars("aé€b", 2), "€b");
    assert_eq!(tail_chars("abc", 0), "");
}

#[test]
fn test_strip_code_fence() {
    assert_eq!(strip_code_fence("```python\nprint(1)\n```"), "print(1)");
    assert_eq!(strip_code_fence("```\nx = 1```"), "x = 1");
    assert_eq!(strip_code_fence("plain"), "plain");
    assert_eq!(strip_code_fence("```"), "");
}

#[test]
fn test_request_from_buffer_clamps_cursor() {
    let node = FileNode::new("main", "py", "");
    let mut buffer = OpenFile::from_node(&node, String::new());
    buffer.set_content("é = 1".into());

    // byte 1 is inside 'é'
    let request = CompletionRequest::from_buffer(&buffer, 1);
    assert_eq!(request.prefix, "");
    assert_eq!(request.language, "python");

    let request = CompletionRequest::from_buffer(&buffer, 100);
    assert_eq!(request.prefix, "é = 1");
    assert_eq!(request.edit_version, buffer.edit_version());
}

#[tokio::test(start_paused = true)]
async fn test_changed_context_skips_the_service() {
    let service = RecordingService::replying("x");
    let completion = pipeline(service.clone());

    let outcome = completion
        .request_checked(request("a", "pri"), || false)
        .await;

    assert_eq!(outcome, CompletionOutcome::Superseded);
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reply_dropped_when_context_changes_in_flight() {
    let service = RecordingService::slow("late", Duration::from_millis(500));
    let completion = pipeline(service.clone());
    let checks = std::sync::atomic::AtomicUsize::new(0);

    // valid when the debounce fires, stale once the reply is back
    let outcome = completion
        .request_checked(request("a", "pri"), || {
            checks.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0
        })
        .await;

    assert_eq!(outcome, CompletionOutcome::Superseded);
    assert_eq!(service.calls().len(), 1);
}
