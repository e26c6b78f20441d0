use serde::{Deserialize, Serialize};
use toolwire_model::ToolCallRequest;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    /// A chunk of assistant text.
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    /// A tool call request.
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

impl PresetEvent {
    /// Shorthand for a tool call with a generated id.
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        PresetEvent::ToolCall(ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments,
        })
    }
}

/// The preset response for an assistant turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail forever.
    #[serde(default)]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a response made of a single text message.
    #[inline]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Sets how many attempts fail with a rate limit error before the
    /// response goes through. `0` means it never goes through.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    #[inline]
    pub(crate) fn has_tool_call(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)))
    }

    /// Whether attempt number `attempt` (starting at 0) should fail.
    #[inline]
    pub(crate) fn should_fail(&self, attempt: u64) -> bool {
        match self.failures {
            None => false,
            Some(0) => true,
            Some(n) => attempt < n,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_script() {
        let script = json!({
            "events": [
                { "type": "message_delta", "data": "Checking the weather." },
                {
                    "type": "tool_call",
                    "data": {
                        "id": "1",
                        "name": "WeatherAPI",
                        "arguments": { "input": "Paris" }
                    }
                }
            ]
        });
        let response: PresetResponse = serde_json::from_value(script).unwrap();
        assert_eq!(
            response,
            PresetResponse::with_events([
                PresetEvent::MessageDelta("Checking the weather.".to_owned()),
                PresetEvent::tool_call(
                    "1",
                    "WeatherAPI",
                    json!({ "input": "Paris" })
                ),
            ])
        );
        assert!(response.has_tool_call());
    }

    #[test]
    fn test_should_fail() {
        let ok = PresetResponse::with_text("ok");
        assert!(!ok.should_fail(0));

        let flaky = PresetResponse::with_text("ok").with_failures(2);
        assert!(flaky.should_fail(0));
        assert!(flaky.should_fail(1));
        assert!(!flaky.should_fail(2));

        let broken = PresetResponse::with_text("ok").with_failures(0);
        assert!(broken.should_fail(100));
    }
}
