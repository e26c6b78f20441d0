use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use toolwire_core::tool::{
    Approval, Error as ToolError, SingleInput, Tool, ToolResult,
};

use super::{join_url, request_failed};
use crate::config::TwilioSettings;

/// Sends an SMS to the configured phone number.
pub struct TwilioTool {
    client: Client,
    settings: Arc<TwilioSettings>,
    parameter_schema: Value,
}

impl TwilioTool {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client, settings: TwilioSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            parameter_schema: SingleInput::parameter_schema(
                "The original interview question.",
            ),
        }
    }
}

impl Tool for TwilioTool {
    type Input = SingleInput;

    fn name(&self) -> &str {
        "twilio_tool"
    }

    fn description(&self) -> &str {
        "If you ever answer 'I don't know based on my resume.', immediately \
         use this tool to notify the user by SMS. When you use this tool, \
         send the original interview question that was asked, not the \
         fallback answer."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn make_approval(&self, input: &SingleInput) -> Option<Approval> {
        Some(Approval::new(
            format!("Send SMS to {}:\n{input}", self.settings.to_number),
            "The question could not be answered from the resume.",
        ))
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let settings = Arc::clone(&self.settings);
        async move {
            let url = join_url(
                &settings.base_url,
                &format!(
                    "/2010-04-01/Accounts/{}/Messages.json",
                    settings.account_sid
                ),
            );
            let resp = client
                .post(url)
                .basic_auth(&settings.account_sid, Some(&settings.auth_token))
                .form(&[
                    ("To", settings.to_number.as_str()),
                    ("From", settings.from_number.as_str()),
                    ("Body", input.0.as_str()),
                ])
                .send()
                .await
                .map_err(request_failed)?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ToolError::execution_error().with_reason(format!(
                    "Twilio returned {}: {body}",
                    status.as_u16()
                )));
            }
            info!("SMS sent to {}", settings.to_number);
            Ok("SMS sent to your phone.".to_owned())
        }
    }
}
