use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use toolwire_core::tool::{
    Approval, Error as ToolError, SingleInput, Tool, ToolResult,
};

use super::request_failed;

/// Posts a message to a Slack channel through an incoming webhook.
pub struct SlackPoster {
    client: Client,
    webhook_url: Arc<str>,
    parameter_schema: Value,
}

impl SlackPoster {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client, webhook_url: &str) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            parameter_schema: SingleInput::parameter_schema(
                "The message to post.",
            ),
        }
    }
}

impl Tool for SlackPoster {
    type Input = SingleInput;

    fn name(&self) -> &str {
        "SlackPoster"
    }

    fn description(&self) -> &str {
        "Posts a message to the team's Slack channel."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn make_approval(&self, input: &SingleInput) -> Option<Approval> {
        Some(Approval::new(
            format!("Post to Slack:\n{input}"),
            "The message will be visible to everyone in the channel.",
        ))
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let webhook_url = Arc::clone(&self.webhook_url);
        async move { post_to_slack(&client, &webhook_url, &input.0).await }
    }
}

/// Sends `text` to the webhook.
pub async fn post_to_slack(
    client: &Client,
    webhook_url: &str,
    text: &str,
) -> ToolResult {
    let resp = client
        .post(webhook_url)
        .json(&json!({ "text": text }))
        .send()
        .await
        .map_err(request_failed)?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        return Err(ToolError::execution_error().with_reason(format!(
            "Request to Slack returned an error {}, the response is:\n{body}",
            status.as_u16()
        )));
    }
    Ok("Message posted to Slack.".to_owned())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_posts_text_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T000/B000"))
            .and(body_json(json!({ "text": "hello team" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/services/T000/B000", server.uri());
        let result = post_to_slack(&Client::new(), &url, "hello team").await;
        assert_eq!(result.unwrap(), "Message posted to Slack.");
    }

    #[tokio::test]
    async fn test_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("invalid_token"),
            )
            .mount(&server)
            .await;

        let tool = SlackPoster::new(Client::new(), &server.uri());
        let err = tool
            .execute(SingleInput("hi".to_owned()))
            .await
            .unwrap_err();
        assert_eq!(
            err.reason(),
            "Request to Slack returned an error 403, the response is:\n\
             invalid_token"
        );
    }

    #[test]
    fn test_requires_approval() {
        let tool = SlackPoster::new(Client::new(), "http://localhost");
        let approval = tool
            .make_approval(&SingleInput("status update".to_owned()))
            .unwrap();
        assert!(approval.what().contains("status update"));
    }
}
