use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use serde_json::json;
use tokio::time::{Sleep, sleep};
use toolwire_model::{
    EmbeddingProvider, EmbeddingRequest, ErrorKind, ModelFinishReason,
    ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, ModelTool, ToolCallRequest,
};

#[derive(Debug)]
struct FakeError(ErrorKind);

impl Display for FakeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for FakeError {}

impl ModelProviderError for FakeError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Emits queued events one by one with a tiny delay in between.
struct FakeResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for FakeResponse {
    type Error = FakeError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let delay = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(delay.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.events.pop_front()))
    }
}

/// Answers weather questions by calling the `WeatherAPI` tool, and
/// echoes everything else.
struct FakeProvider;

impl ModelProvider for FakeProvider {
    type Error = FakeError;
    type Response = FakeResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            let Some(ModelMessage::User(text)) = req.messages.last() else {
                break 'blk Err(FakeError(ErrorKind::Other));
            };

            let wants_weather = text.contains("weather")
                && req.tools.iter().any(|t| t.name == "WeatherAPI");
            let mut events = VecDeque::new();
            if wants_weather {
                events.push_back(ModelResponseEvent::ToolCall(
                    ToolCallRequest {
                        id: "call_0".to_owned(),
                        name: "WeatherAPI".to_owned(),
                        arguments: json!({ "input": "London" }),
                    },
                ));
                events.push_back(ModelResponseEvent::Completed(
                    ModelFinishReason::ToolCalls,
                ));
            } else {
                for word in format!("You said {text}").split_inclusive(' ') {
                    events.push_back(ModelResponseEvent::MessageDelta(
                        word.to_owned(),
                    ));
                }
                events.push_back(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ));
            }
            Ok(FakeResponse {
                events,
                sleep: None,
            })
        };
        ready(result)
    }
}

struct FakeEmbedder;

impl EmbeddingProvider for FakeEmbedder {
    type Error = FakeError;

    fn embed(
        &self,
        req: &EmbeddingRequest,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, Self::Error>> + Send + 'static
    {
        let vectors = req
            .inputs
            .iter()
            .map(|text| vec![text.len() as f32, 1.0])
            .collect();
        ready(Ok(vectors))
    }
}

async fn collect(
    mut resp: FakeResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = String::new();
    let mut tool_calls = vec![];
    let mut finish = None;
    while let Some(event) =
        std::future::poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::ToolCall(call) => tool_calls.push(call),
            ModelResponseEvent::Completed(reason) => finish = Some(reason),
        }
    }
    (text, tool_calls, finish)
}

#[tokio::test]
async fn test_plain_completion() {
    let req = ModelRequest::from_prompt("What is the capital of France?");
    let resp = FakeProvider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish) = collect(resp).await;

    assert_eq!(text, "You said What is the capital of France?");
    assert!(tool_calls.is_empty());
    assert_eq!(finish, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_tool_call_completion() {
    let mut req = ModelRequest::from_prompt("What is the weather in London?");
    req.tools.push(ModelTool {
        name: "WeatherAPI".to_owned(),
        description: "Fetches current weather for a given city".to_owned(),
        parameters: json!({ "type": "object" }),
    });
    let resp = FakeProvider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish) = collect(resp).await;

    assert!(text.is_empty());
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].arguments, json!({ "input": "London" }));
    assert_eq!(finish, Some(ModelFinishReason::ToolCalls));
}

#[tokio::test]
async fn test_error() {
    let req = ModelRequest::default();
    let err = FakeProvider.send_request(&req).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
}

#[tokio::test]
async fn test_embedding_order() {
    let req = EmbeddingRequest::new(["a", "abc"]);
    let vectors = FakeEmbedder.embed(&req).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0]]);
}
