use std::sync::Arc;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, SingleInput, Tool, ToolResult,
};

use super::request_failed;
use crate::config::JiraSettings;

/// Fetches the user story of a Jira issue.
pub struct JiraStoryFetcher {
    client: Client,
    settings: Arc<JiraSettings>,
    parameter_schema: Value,
}

#[derive(Deserialize)]
struct Issue {
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Default, Deserialize)]
struct IssueFields {
    description: Option<String>,
    summary: Option<String>,
}

impl IssueFields {
    fn into_story(self) -> Option<String> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        non_empty(self.description).or_else(|| non_empty(self.summary))
    }
}

/// Builds `<base>/rest/api/2/issue/<id>` with the ID as a single
/// percent-encoded segment.
fn issue_url(base: &str, issue_id: &str) -> Result<Url, ToolError> {
    let invalid =
        |reason: String| ToolError::execution_error().with_reason(reason);
    if matches!(issue_id, "" | "." | "..") {
        return Err(invalid(format!("invalid Jira issue ID {issue_id:?}")));
    }
    let mut url = Url::parse(base)
        .map_err(|err| invalid(format!("invalid Jira URL {base}: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("invalid Jira URL {base}")))?
        .pop_if_empty()
        .extend(["rest", "api", "2", "issue", issue_id]);
    Ok(url)
}

impl JiraStoryFetcher {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client, settings: JiraSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            parameter_schema: SingleInput::parameter_schema(
                "The Jira issue ID, e.g. PROJ-123.",
            ),
        }
    }
}

impl Tool for JiraStoryFetcher {
    type Input = SingleInput;

    fn name(&self) -> &str {
        "JiraStoryFetcher"
    }

    fn description(&self) -> &str {
        "Fetches user story from Jira using issue ID"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let settings = Arc::clone(&self.settings);
        async move {
            let url = issue_url(&settings.url, input.0.trim())?;
            let resp = client
                .get(url)
                .bearer_auth(&settings.api_token)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(request_failed)?;

            if resp.status() != StatusCode::OK {
                let body = resp.text().await.unwrap_or_default();
                return Err(ToolError::execution_error().with_reason(
                    format!("Failed to fetch Jira issue: {body}"),
                ));
            }

            let issue: Issue = resp.json().await.map_err(request_failed)?;
            issue.fields.into_story().ok_or_else(|| {
                ToolError::execution_error().with_reason(
                    "No user story or description found in Jira issue.",
                )
            })
        }
    }
}
