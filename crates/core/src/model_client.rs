use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use toolwire_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type TranscriptFn = Arc<dyn Fn(String) + Send + Sync>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, TranscriptFn) -> BoxedSendRequestFuture + Send + Sync
>;

/// How rate-limited requests are retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry. Later delays grow exponentially.
    pub initial_interval: Duration,
    /// Total time after which the last error is returned as is.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
///
/// Requests failing with a retryable error kind are sent again according
/// to the [`RetryPolicy`].
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    /// Wraps a provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that `ModelClient` stays a plain type.
        let handler_fn: HandlerFn = Arc::new(move |req, on_transcript| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_transcript).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sends a request and returns the fully received response.
    ///
    /// `on_transcript` sees every text delta as it arrives. When a request
    /// is retried after a partial stream, deltas from the failed attempt
    /// have already been delivered.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
    ) -> SendRequestResult {
        let on_transcript: TranscriptFn = Arc::new(on_transcript);
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_policy.initial_interval)
            .with_max_elapsed_time(Some(self.retry_policy.max_elapsed))
            .build();

        backoff::future::retry_notify(
            backoff,
            || {
                let fut = (self.handler_fn)(req.clone(), on_transcript.clone());
                async move {
                    fut.await.map_err(|err| {
                        if err.kind().is_retryable() {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: Box<dyn ModelProviderError>, after: Duration| {
                warn!("model request failed ({err}), retrying in {after:?}");
            },
        )
        .await
    }

    /// Sends a single user prompt without tools and returns the text.
    pub async fn complete(
        &self,
        prompt: impl Into<String>,
        temperature: Option<f32>,
    ) -> Result<String, Box<dyn ModelProviderError>> {
        let mut req = ModelRequest::from_prompt(prompt);
        req.temperature = temperature;
        let resp = self.send_request(req, |_| {}).await?;
        Ok(resp.transcript)
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The concatenated text deltas.
    pub transcript: String,
    /// The provider's own representation of the assistant message.
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_transcript: TranscriptFn,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            debug!("request failed: {err}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let opaque_msg;
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                debug!("response stream failed: {err}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            opaque_msg = pinned_resp.make_opaque_message();
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
                on_transcript(msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}
