//! Scripted fake models for tests.

mod embedding;
mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Sleep, sleep};
use toolwire_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
};

pub use embedding::TestEmbeddingProvider;
pub use preset::*;

/// Error type of the fake providers.
#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A response replaying one [`PresetResponse`].
pub struct TestModelResponse {
    preset: PresetResponse,
    turn: usize,
    delay: Duration,
    event_idx: usize,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn event_at(&self, idx: usize) -> Option<ModelResponseEvent> {
        let events = &self.preset.events;
        if idx < events.len() {
            return Some(match &events[idx] {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            });
        }
        if idx == events.len() {
            return Some(ModelResponseEvent::Completed(
                if self.preset.has_tool_call() {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                },
            ));
        }
        None
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let event = this.event_at(this.event_idx);
        if event.is_some() {
            this.event_idx += 1;
        }
        Poll::Ready(Ok(event))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let text: String = self
            .preset
            .events
            .iter()
            .filter_map(|event| match event {
                PresetEvent::MessageDelta(msg) => Some(msg.as_str()),
                PresetEvent::ToolCall(_) => None,
            })
            .collect();
        Some(OpaqueMessage::new(format!("msg:{}", self.turn), text))
    }
}

#[derive(Default)]
struct Shared {
    attempts: Vec<u64>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for tests.
///
/// Responses are picked by how many model messages the request already
/// carries: a fresh conversation gets the first preset, the request sent
/// after one assistant turn gets the second, and so on. Running out of
/// presets is an error.
///
/// Clones share the recorded requests and failure counters.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    responses: Vec<PresetResponse>,
    delay: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl TestModelProvider {
    /// Appends the response for the next assistant turn.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.responses.push(preset);
    }

    /// Builder-style variant of [`add_response`](Self::add_response).
    #[inline]
    pub fn with_response(mut self, preset: PresetResponse) -> Self {
        self.add_response(preset);
        self
    }

    /// Sets the delay before every event.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = duration;
    }

    /// Returns every request received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.shared
            .lock()
            .map(|shared| shared.requests.clone())
            .unwrap_or_default()
    }

    fn start(&self, req: &ModelRequest) -> Result<TestModelResponse, Error> {
        let turn = req.messages.iter().filter(|m| m.is_from_model()).count();
        let Some(preset) = self.responses.get(turn) else {
            return Err(Error {
                message: "no preset response left",
                kind: ErrorKind::Other,
            });
        };

        let mut shared = self.shared.lock().map_err(|_| Error {
            message: "state poisoned",
            kind: ErrorKind::Other,
        })?;
        shared.requests.push(req.clone());
        if shared.attempts.len() <= turn {
            shared.attempts.resize(turn + 1, 0);
        }
        let attempt = shared.attempts[turn];
        shared.attempts[turn] += 1;
        if preset.should_fail(attempt) {
            return Err(Error {
                message: "scripted failure",
                kind: ErrorKind::RateLimitExceeded,
            });
        }

        Ok(TestModelResponse {
            preset: preset.clone(),
            turn,
            delay: self.delay,
            event_idx: 0,
            sleep: None,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.start(req))
    }
}
