use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::future::BoxFuture;
use pin_project_lite::pin_project;
use serde_json::{Map, Value};
use toolwire_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, Message, ToolCall};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    content: String,
    tool_calls: Vec<ToolCall>,
    // Indices into `tool_calls` that have been seen but not yet emitted.
    // Arguments keep streaming after the first fragment, so the calls are
    // only emitted once the stream reports a finish reason.
    pending_tool_call_idx: VecDeque<usize>,
    pending_finish_reason: Option<ModelFinishReason>,
    finished: bool,
}

impl PartialState {
    #[inline]
    fn finish(self) -> Option<(String, Message)> {
        Some((
            self.id?,
            Message::Assistant {
                content: Some(self.content),
                tool_calls: if self.tool_calls.is_empty() {
                    None
                } else {
                    Some(self.tool_calls)
                },
            },
        ))
    }

    fn apply_tool_call_delta(&mut self, tool_call: ToolCall) {
        let Some(partial) = self
            .tool_calls
            .iter_mut()
            .find(|t| t.index == tool_call.index)
        else {
            self.pending_tool_call_idx.push_back(self.tool_calls.len());
            self.tool_calls.push(tool_call);
            return;
        };

        if let Some(id) = tool_call.id {
            partial.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = tool_call.r#type {
            partial.r#type.get_or_insert_default().push_str(&ty);
        }
        let Some(function) = tool_call.function else {
            return;
        };
        match partial.function {
            Some(ref mut partial_func) => {
                if let Some(name) = function.name {
                    partial_func.name.get_or_insert_default().push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    partial_func
                        .arguments
                        .get_or_insert_default()
                        .push_str(&arguments);
                }
            }
            None => partial.function = Some(function),
        }
    }

    fn make_tool_call_request(&self, idx: usize) -> ToolCallRequest {
        let tool_call = &self.tool_calls[idx];
        let function = tool_call.function.as_ref();
        ToolCallRequest {
            id: tool_call.id.clone().unwrap_or_default(),
            name: function.and_then(|f| f.name.clone()).unwrap_or_default(),
            arguments: parse_arguments(
                function.and_then(|f| f.arguments.as_deref()),
            ),
        }
    }
}

/// Parses streamed tool arguments. Models occasionally answer with a bare
/// string instead of a JSON object, which is passed through untouched.
fn parse_arguments(raw: Option<&str>) -> Value {
    let raw = raw.unwrap_or_default();
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streaming chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<BoxFuture<'static, NextEvent>>,
        full_msg: Option<(String, Message)>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            content: Default::default(),
            tool_calls: Default::default(),
            pending_tool_call_idx: Default::default(),
            pending_finish_reason: Default::default(),
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    *this.full_msg = partial_state.finish();
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    let mut message_delta = None;

    while !partial_state.finished {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.finished = true;
                break;
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.finished = true;
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        };

        // Usage-only chunks carry no choices.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty())
        {
            partial_state.content.push_str(&content);
            message_delta = Some(content);
        }
        for tool_call in choice.delta.tool_calls.into_iter().flatten() {
            partial_state.apply_tool_call_delta(tool_call);
        }

        if let Some(finish_reason) = choice.finish_reason {
            let finish_reason = match finish_reason.as_str() {
                "tool_calls" => ModelFinishReason::ToolCalls,
                "content_filter" => {
                    return Err(Error::new(
                        "the response was blocked by the content filter",
                        ErrorKind::Moderated,
                    ));
                }
                _ => ModelFinishReason::Stop,
            };
            partial_state.pending_finish_reason = Some(finish_reason);
            partial_state.finished = true;
        }

        if message_delta.is_some() || partial_state.finished {
            break;
        }
    }

    // Message deltas go first, then the tool calls (only once the stream is
    // done so their arguments are complete), then the finish reason.

    if let Some(message_delta) = message_delta {
        return Ok((
            Some(ModelResponseEvent::MessageDelta(message_delta)),
            partial_state,
        ));
    }

    if partial_state.finished {
        if let Some(idx) = partial_state.pending_tool_call_idx.pop_front() {
            let request = partial_state.make_tool_call_request(idx);
            return Ok((
                Some(ModelResponseEvent::ToolCall(request)),
                partial_state,
            ));
        }
    }

    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use toolwire_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Chunks,
    ) -> (Result<Vec<ModelResponseEvent>, Error>, Option<OpaqueMessage>) {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        loop {
            match poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => break,
                Err(err) => return (Err(err), None),
            }
        }
        (Ok(events), resp.make_opaque_message())
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let chunks = Chunks::from_static(&[include_bytes!(
            "../fixtures/test_response.txt"
        )]);
        let (events, opaque) = collect(chunks).await;
        let events = events.unwrap();

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Let me check.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_weather".to_owned(),
                    name: "WeatherAPI".to_owned(),
                    arguments: json!({ "input": "Paris" }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_time".to_owned(),
                    name: "get_travel_time".to_owned(),
                    arguments: Value::String("Paris to Lyon".to_owned()),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );

        let opaque = opaque.unwrap();
        assert_eq!(opaque.id(), "chatcmpl-fixture");
        let Some(Message::Assistant {
            content,
            tool_calls: Some(tool_calls),
        }) = opaque.to_raw::<Message>()
        else {
            panic!("expected an assistant message with tool calls");
        };
        assert_eq!(content.as_deref(), Some("Let me check."));
        assert_eq!(tool_calls.len(), 2);
    }

    #[tokio::test]
    async fn test_delta_in_final_chunk() {
        let chunks = Chunks::from_static(&[
            b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
            b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            b"data: [DONE]\n\n",
        ]);
        let (events, _) = collect(chunks).await;
        assert_eq!(
            events.unwrap(),
            vec![
                ModelResponseEvent::MessageDelta("Hel".to_owned()),
                ModelResponseEvent::MessageDelta("lo".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_content_filter() {
        let chunks = Chunks::from_static(&[
            b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n",
        ]);
        let (events, _) = collect(chunks).await;
        let err = events.unwrap_err();
        assert_eq!(ModelProviderError::kind(&err), ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let chunks = Chunks::from_static(&[b"data: {not json}\n\n"]);
        let (events, _) = collect(chunks).await;
        assert!(events.is_err());
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments(None), json!({}));
        assert_eq!(parse_arguments(Some("  ")), json!({}));
        assert_eq!(parse_arguments(Some("{\"a\":1}")), json!({ "a": 1 }));
        assert_eq!(parse_arguments(Some("Paris")), json!("Paris"));
    }
}
