//! Tools the demo agents hand to the model.
//!
//! Each tool wraps one external call. Tools talking to HTTP services share
//! the session's [`reqwest::Client`] and take their base URL from
//! [`crate::config`], so they can be pointed at a mock server.

mod github;
mod jira;
mod llm;
mod maps;
mod pytest_file;
mod resume;
mod slack;
mod twilio;
mod weather;

use serde_json::Value;
use toolwire_core::tool::Error as ToolError;

pub use github::CommitListTool;
pub use jira::JiraStoryFetcher;
pub use llm::{PromptTool, TranslatorTool};
pub use maps::{CoordinatesTool, DirectionsTool, TravelTimeTool};
pub use pytest_file::ExcelToPytestFileGenerator;
pub use resume::ResumeSearchTool;
pub use slack::{SlackPoster, post_to_slack};
pub use twilio::TwilioTool;
pub use weather::{WeatherTool, fetch_weather};

#[inline]
fn request_failed(err: reqwest::Error) -> ToolError {
    ToolError::execution_error().with_reason(format!("request failed: {err}"))
}

/// Renders a JSON scalar the way it appears in the response, without the
/// quotes `Value`'s `Display` puts around strings.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[inline]
fn join_url(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}
