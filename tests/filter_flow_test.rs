// End-to-end tests for filter invocations with in-memory clipboard and transport
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc as std_mpsc};

use cbfilter::clipboard::{ClipboardKind, ClipboardProvider};
use cbfilter::error::AppError;
use cbfilter::filter::{FilterEvent, FilterRunner, InvocationSnapshot, TriggerOutcome, run_filter};
use cbfilter::request::HttpRequest;
use cbfilter::template::{TemplateRegistry, parse_provider};
use cbfilter::transport::Transport;
use cbfilter::types::{FilterDefinition, IoKind, ModelConfig};
use tokio::sync::mpsc;

const DECODED_IMAGE_ID: u32 = 99;

const OPENAI: &str = r#"{
    "text-text": {
        "endpoint": "/chat/completions",
        "result": "choices[0].message.content",
        "headers": { "Content-Type": "application/json", "Authorization": "Bearer <<api_key>>" },
        "payload": {
            "model": "<<model>>",
            "messages": [
                { "role": "system", "content": "<<system_prompt>>" },
                { "role": "user", "content": "<<prompt>>" }
            ]
        }
    },
    "image-image": {
        "endpoint": "/images/edits",
        "result": "data[0].b64_json",
        "headers": { "Content-Type": "multipart/form-data" }
    }
}"#;

/// 记录释放次数的位图句柄。
struct MockImage {
    id: u32,
    released: Arc<Mutex<Vec<u32>>>,
}

impl Drop for MockImage {
    fn drop(&mut self) {
        if let Ok(mut released) = self.released.lock() {
            released.push(self.id);
        }
    }
}

#[derive(Default)]
struct MockClipboard {
    text: String,
    image: Option<u32>,
    fail_image_write: bool,
    written_text: Mutex<Option<String>>,
    written_images: AtomicUsize,
    released: Arc<Mutex<Vec<u32>>>,
}

impl MockClipboard {
    fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    fn with_image(id: u32) -> Self {
        Self {
            image: Some(id),
            ..Self::default()
        }
    }

    fn released_count(&self, id: u32) -> usize {
        self.released
            .lock()
            .expect("lock")
            .iter()
            .filter(|released| **released == id)
            .count()
    }
}

impl ClipboardProvider for MockClipboard {
    type Image = MockImage;

    fn detect_type(&self) -> ClipboardKind {
        if !self.text.is_empty() {
            ClipboardKind::Text
        } else if self.image.is_some() {
            ClipboardKind::Image
        } else {
            ClipboardKind::None
        }
    }

    fn read_text(&self) -> Result<String, AppError> {
        Ok(self.text.clone())
    }

    fn read_image(&self) -> Result<Option<MockImage>, AppError> {
        Ok(self.image.map(|id| MockImage {
            id,
            released: Arc::clone(&self.released),
        }))
    }

    fn write_text(&self, text: &str) -> Result<(), AppError> {
        *self.written_text.lock().expect("lock") = Some(text.to_string());
        Ok(())
    }

    fn write_image(&self, image: MockImage) -> Result<(), AppError> {
        if self.fail_image_write {
            drop(image);
            return Err(AppError::Clipboard("clipboard is locked".to_string()));
        }
        self.written_images.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn encode_png_base64(&self, image: &MockImage) -> Result<String, AppError> {
        Ok(format!("UE5H{}", image.id))
    }

    fn decode_base64_image(&self, _b64: &str) -> Result<MockImage, AppError> {
        Ok(MockImage {
            id: DECODED_IMAGE_ID,
            released: Arc::clone(&self.released),
        })
    }
}

/// 返回固定响应；可选地在发送时等待放行信号。
struct MockTransport {
    response: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    gate: Mutex<Option<std_mpsc::Receiver<()>>>,
}

impl MockTransport {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    fn gated(response: &str, gate: std_mpsc::Receiver<()>) -> Self {
        let transport = Self::new(response);
        *transport.gate.lock().expect("lock") = Some(gate);
        transport
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());
        if let Some(gate) = self.gate.lock().expect("lock").as_ref() {
            let _ = gate.recv();
        }
        Ok(self.response.clone())
    }
}

struct PanickingTransport;

impl Transport for PanickingTransport {
    fn send(&self, _request: &HttpRequest) -> Result<String, AppError> {
        panic!("transport exploded");
    }
}

fn snapshot(filter: FilterDefinition) -> InvocationSnapshot {
    let provider = parse_provider("OpenAI", OPENAI).expect("provider");
    InvocationSnapshot {
        filter,
        model: ModelConfig::new("Default", "https://api.openai.com/v1", "gpt-5.1", "sk-test", "OpenAI"),
        registry: TemplateRegistry::new(vec![provider]),
    }
}

fn translate() -> FilterDefinition {
    FilterDefinition::new("Translate", IoKind::Text, IoKind::Text, 0, "Translate into English.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_filter_replaces_clipboard_and_completes() {
        let clipboard = Arc::new(MockClipboard::with_text("こんにちは"));
        let transport = Arc::new(MockTransport::new(
            r#"{"choices":[{"message":{"content":"Hello"}}]}"#,
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = FilterRunner::new(Arc::clone(&clipboard), Arc::clone(&transport), tx);

        let outcome = runner.trigger(snapshot(translate())).expect("trigger");
        assert_eq!(outcome, TriggerOutcome::Started);

        assert_eq!(
            rx.blocking_recv(),
            Some(FilterEvent::Started {
                title: "Translate".to_string()
            })
        );
        assert_eq!(
            rx.blocking_recv(),
            Some(FilterEvent::Completed {
                title: "Translate".to_string(),
                output: IoKind::Text,
            })
        );
        assert!(!runner.is_running());
        assert_eq!(
            clipboard.written_text.lock().expect("lock").as_deref(),
            Some("Hello")
        );

        let requests = transport.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url(), "https://api.openai.com/v1/chat/completions");
        let body = String::from_utf8(requests[0].body.clone()).expect("utf8 body");
        assert!(body.contains(r#""model":"gpt-5.1""#));
        assert!(body.contains(r#"Translate into English.\n\nこんにちは"#));
        assert!(body.contains("convert the input text to the output text"));
        assert!(
            requests[0]
                .headers
                .contains(&("Authorization".to_string(), "Bearer sk-test".to_string()))
        );
    }

    #[test]
    fn second_trigger_while_running_is_rejected() {
        let (release, gate) = std_mpsc::channel();
        let clipboard = Arc::new(MockClipboard::with_text("こんにちは"));
        let transport = Arc::new(MockTransport::gated(
            r#"{"choices":[{"message":{"content":"Hello"}}]}"#,
            gate,
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = FilterRunner::new(clipboard, Arc::clone(&transport), tx);

        assert_eq!(
            runner.trigger(snapshot(translate())).expect("first trigger"),
            TriggerOutcome::Started
        );
        assert!(runner.is_running());
        assert_eq!(
            runner.trigger(snapshot(translate())).expect("second trigger"),
            TriggerOutcome::AlreadyRunning
        );
        let progress = runner.progress().expect("progress while running");
        assert_eq!(progress.title, "Translate");

        release.send(()).expect("release worker");

        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Started { .. })));
        assert!(matches!(
            rx.blocking_recv(),
            Some(FilterEvent::AlreadyRunning { title, .. }) if title == "Translate"
        ));
        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Completed { .. })));
        assert!(rx.try_recv().is_err());

        assert_eq!(transport.calls(), 1);
        assert!(!runner.is_running());
        assert!(runner.progress().is_none());
    }

    #[test]
    fn runner_accepts_new_trigger_after_completion() {
        let clipboard = Arc::new(MockClipboard::with_text("hi"));
        let transport = Arc::new(MockTransport::new(
            r#"{"choices":[{"message":{"content":"Hello"}}]}"#,
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = FilterRunner::new(clipboard, Arc::clone(&transport), tx);

        for _ in 0..2 {
            assert_eq!(
                runner.trigger(snapshot(translate())).expect("trigger"),
                TriggerOutcome::Started
            );
            loop {
                let event = rx.blocking_recv().expect("event");
                if event.is_terminal() {
                    assert!(matches!(event, FilterEvent::Completed { .. }));
                    break;
                }
            }
        }
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn image_write_failure_releases_result_once() {
        let clipboard = MockClipboard {
            fail_image_write: true,
            ..MockClipboard::with_image(1)
        };
        let transport = MockTransport::new(r#"{"data":[{"b64_json":"iVBORw0KGgo="}]}"#);
        let filter = FilterDefinition::new("Sketch", IoKind::Image, IoKind::Image, 0, "Sketch it.");

        let result = run_filter(&snapshot(filter), &clipboard, &transport);

        assert!(matches!(
            result,
            Err(cbfilter::filter::FilterError::ClipboardWrite(_))
        ));
        assert_eq!(clipboard.released_count(DECODED_IMAGE_ID), 1);
        assert_eq!(clipboard.released_count(1), 1);
        assert_eq!(clipboard.written_images.load(Ordering::SeqCst), 0);

        let requests = transport.requests.lock().expect("lock");
        let content_type = &requests[0].headers[0].1;
        assert!(content_type.contains("boundary="));
    }

    #[test]
    fn image_result_is_written_back() {
        let clipboard = MockClipboard::with_image(1);
        let transport = MockTransport::new(r#"{"data":[{"b64_json":"iVBORw0KGgo="}]}"#);
        let filter = FilterDefinition::new("Sketch", IoKind::Image, IoKind::Image, 0, "Sketch it.");

        let output = run_filter(&snapshot(filter), &clipboard, &transport).expect("run filter");

        assert_eq!(output, IoKind::Image);
        assert_eq!(clipboard.written_images.load(Ordering::SeqCst), 1);
        assert_eq!(clipboard.released_count(DECODED_IMAGE_ID), 1);
    }

    #[test]
    fn missing_template_fails_without_request() {
        let clipboard = Arc::new(MockClipboard::with_text("draw a cat"));
        let transport = Arc::new(MockTransport::new("{}"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = FilterRunner::new(clipboard, Arc::clone(&transport), tx);

        let filter = FilterDefinition::new("Draw", IoKind::Text, IoKind::Image, 0, "Draw.");
        runner.trigger(snapshot(filter)).expect("trigger");

        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Started { .. })));
        match rx.blocking_recv() {
            Some(FilterEvent::Failed { title, reason }) => {
                assert_eq!(title, "Draw");
                assert!(reason.contains("text-image"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn empty_clipboard_text_fails_without_request() {
        let clipboard = Arc::new(MockClipboard::default());
        let transport = Arc::new(MockTransport::new("{}"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = FilterRunner::new(Arc::clone(&clipboard), Arc::clone(&transport), tx);

        runner.trigger(snapshot(translate())).expect("trigger");

        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Started { .. })));
        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Failed { .. })));
        assert_eq!(transport.calls(), 0);
        assert!(clipboard.written_text.lock().expect("lock").is_none());
    }

    #[test]
    fn unusable_response_leaves_clipboard_untouched() {
        let clipboard = MockClipboard::with_text("こんにちは");
        let transport = MockTransport::new(r#"{"error":{"message":"quota exceeded"}}"#);

        let result = run_filter(&snapshot(translate()), &clipboard, &transport);

        assert!(matches!(
            result,
            Err(cbfilter::filter::FilterError::EmptyResult)
        ));
        assert_eq!(transport.calls(), 1);
        assert!(clipboard.written_text.lock().expect("lock").is_none());
    }

    #[test]
    fn worker_panic_reports_failure_and_clears_flag() {
        let clipboard = Arc::new(MockClipboard::with_text("hi"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = FilterRunner::new(clipboard, Arc::new(PanickingTransport), tx);

        runner.trigger(snapshot(translate())).expect("trigger");

        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Started { .. })));
        assert!(matches!(rx.blocking_recv(), Some(FilterEvent::Failed { .. })));
        assert!(!runner.is_running());
        assert_eq!(
            runner.trigger(snapshot(translate())).expect("retrigger"),
            TriggerOutcome::Started
        );
    }
}
