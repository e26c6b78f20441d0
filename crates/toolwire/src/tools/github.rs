use std::sync::Arc;

use reqwest::{Client, header};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, Tool, ToolResult, parameter_schema_of,
};

use super::{join_url, request_failed};
use crate::config::GithubSettings;

const USER_AGENT: &str = concat!("toolwire/", env!("CARGO_PKG_VERSION"));

/// Input of [`CommitListTool`].
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CommitListInput {
    /// Repository owner, a user or an organization.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch name or commit SHA to start listing from.
    #[serde(default)]
    pub sha: Option<String>,
    /// Page number of the results, starting at 1.
    #[serde(default)]
    pub page: Option<u32>,
    /// Number of commits per page, at most 100.
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
struct CommitEntry {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    name: String,
    date: String,
}

impl CommitEntry {
    fn summary(&self) -> String {
        let short_sha: String = self.sha.chars().take(7).collect();
        let title = self.commit.message.lines().next().unwrap_or_default();
        match &self.commit.author {
            Some(author) => format!(
                "{short_sha} {title} ({}, {})",
                author.name, author.date
            ),
            None => format!("{short_sha} {title}"),
        }
    }
}

/// Lists the commits of a GitHub repository.
pub struct CommitListTool {
    client: Client,
    settings: Arc<GithubSettings>,
    parameter_schema: Value,
}

impl CommitListTool {
    /// Creates the tool.
    #[inline]
    pub fn new(client: Client, settings: GithubSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            parameter_schema: parameter_schema_of::<CommitListInput>(),
        }
    }
}

impl Tool for CommitListTool {
    type Input = CommitListInput;

    fn name(&self) -> &str {
        "get_commit_list"
    }

    fn description(&self) -> &str {
        "Fetch commit list"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CommitListInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let settings = Arc::clone(&self.settings);
        async move {
            let url = join_url(
                &settings.api_url,
                &format!("/repos/{}/{}/commits", input.owner, input.repo),
            );
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(sha) = &input.sha {
                query.push(("sha", sha.clone()));
            }
            if let Some(page) = input.page {
                query.push(("page", page.to_string()));
            }
            if let Some(per_page) = input.per_page {
                query.push(("per_page", per_page.to_string()));
            }

            let mut req = client
                .get(url)
                .query(&query)
                .header(header::USER_AGENT, USER_AGENT)
                .header(header::ACCEPT, "application/vnd.github+json");
            if let Some(token) = &settings.token {
                req = req.bearer_auth(token);
            }

            let resp = req.send().await.map_err(request_failed)?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ToolError::execution_error().with_reason(format!(
                    "GitHub returned {}: {body}",
                    status.as_u16()
                )));
            }

            let commits: Vec<CommitEntry> =
                resp.json().await.map_err(request_failed)?;
            if commits.is_empty() {
                return Err(ToolError::execution_error().with_reason(format!(
                    "No commit data returned for {}/{}",
                    input.owner, input.repo
                )));
            }
            Ok(commits
                .iter()
                .map(CommitEntry::summary)
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn tool(server: &MockServer, token: Option<&str>) -> CommitListTool {
        CommitListTool::new(
            Client::new(),
            GithubSettings {
                token: token.map(str::to_owned),
                api_url: server.uri(),
            },
        )
    }

    fn input(value: Value) -> CommitListInput {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_lists_commits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/technoavengers/genaicoding/commits"))
            .and(query_param("sha", "main"))
            .and(query_param("per_page", "2"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "sha": "0123456789abcdef",
                    "commit": {
                        "message": "Add weather agent\n\nDetails here.",
                        "author": {
                            "name": "Dev One",
                            "date": "2025-01-02T03:04:05Z"
                        }
                    }
                },
                {
                    "sha": "fedcba9876543210",
                    "commit": { "message": "Initial commit", "author": null }
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let result = tool(&server, Some("gh-token"))
            .execute(input(json!({
                "owner": "technoavengers",
                "repo": "genaicoding",
                "sha": "main",
                "per_page": 2
            })))
            .await
            .unwrap();
        assert_eq!(
            result,
            "0123456 Add weather agent (Dev One, 2025-01-02T03:04:05Z)\n\
             fedcba9 Initial commit"
        );
    }

    #[tokio::test]
    async fn test_empty_list_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = tool(&server, None)
            .execute(input(json!({ "owner": "a", "repo": "b" })))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "No commit data returned for a/b");
    }
}
