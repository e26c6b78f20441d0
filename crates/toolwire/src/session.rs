use std::path::Path;

use reqwest::Client;
use thiserror::Error;
use toolwire_core::{
    AgentBuilder, GroupChat, ModelClient, PromptTemplate, TemplateError,
};
use toolwire_model::ModelProviderError;
use toolwire_openai_model::OpenAIProvider;

use crate::config::{Config, ConfigError};
use crate::rag::{DocumentQa, Embedder, QaPrompt, RagError};
use crate::tools::*;

const DEMO_TEMPERATURE: f32 = 0.0;
const WEATHER_SYSTEM_PROMPT: &str = include_str!("prompts/weather_system.md");
const QA_SYSTEM_PROMPT: &str = include_str!("prompts/qa_system.md");
const JIRA_SYSTEM_PROMPT: &str = include_str!("prompts/jira_system.md");
const RESUME_AGENT_PROMPT: &str = include_str!("prompts/resume_agent.md");
const NAVIGATE_PROMPT: &str = include_str!("prompts/navigate.md");
const TRANSLATE_PROMPT: &str = include_str!("prompts/translate.md");
const TRIP_MEMBERS: [(&str, &str); 3] = [
    ("planner_agent", include_str!("prompts/trip_planner.md")),
    ("budget_agent", include_str!("prompts/trip_budget.md")),
    ("activity_agent", include_str!("prompts/trip_activity.md")),
];

/// Errors that can occur while setting up or running a demo.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A required setting is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A prompt template is malformed.
    #[error("invalid prompt template: {0}")]
    Template(#[from] TemplateError),
    /// Indexing the document failed.
    #[error(transparent)]
    Rag(#[from] RagError),
    /// A one-shot completion failed.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
}

/// The shared state of one CLI run: configuration, one HTTP client for
/// every tool, and the model clients.
///
/// Each demo gets an [`AgentBuilder`] with its tools and prompt already
/// attached, so callers only add their callbacks.
pub struct Session {
    config: Config,
    http: Client,
    model_client: ModelClient,
    embedder: Embedder,
}

impl Session {
    /// Creates a session talking to the configured OpenAI-compatible
    /// endpoint.
    pub fn new(config: Config) -> Result<Self, SessionError> {
        let openai = config.openai()?;
        debug!("using {openai:?}");
        let http = Client::new();
        let provider = OpenAIProvider::with_client(
            http.clone(),
            openai.to_provider_config(),
        );
        Ok(Self {
            config,
            model_client: ModelClient::new(provider.clone()),
            embedder: Embedder::new(provider),
            http,
        })
    }

    /// Creates a session with custom model and embedding backends.
    pub fn with_models(
        config: Config,
        model_client: ModelClient,
        embedder: Embedder,
    ) -> Self {
        Self {
            config,
            http: Client::new(),
            model_client,
            embedder,
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the HTTP client shared by the tools.
    #[inline]
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// Runs a single completion.
    pub async fn ask(
        &self,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String, SessionError> {
        self.model_client
            .complete(prompt, temperature)
            .await
            .map_err(SessionError::Model)
    }

    /// Translates `text` into `language` with a one-shot prompt.
    pub async fn translate(
        &self,
        language: &str,
        text: &str,
    ) -> Result<String, SessionError> {
        let prompt = PromptTemplate::from_template(TRANSLATE_PROMPT)?
            .format(&[("text", text), ("language", language)])?;
        info!("prompt: {prompt}");
        self.ask(&prompt, None).await
    }

    /// Weather lookups, optionally shared on Slack.
    pub fn weather_agent(&self) -> Result<AgentBuilder, SessionError> {
        let weather = self.config.weather()?;
        let mut builder = self
            .agent_builder()
            .with_system_prompt(WEATHER_SYSTEM_PROMPT)
            .with_tool(WeatherTool::new(self.http.clone(), weather));
        match self.config.slack() {
            Ok(slack) => {
                builder = builder.with_tool(SlackPoster::new(
                    self.http.clone(),
                    &slack.webhook_url,
                ));
            }
            Err(err) => warn!("{err}, SlackPoster is disabled"),
        }
        Ok(builder)
    }

    /// Test case generation and Python debugging help.
    pub fn qa_agent(&self) -> Result<AgentBuilder, SessionError> {
        let client = &self.model_client;
        Ok(self
            .agent_builder()
            .with_system_prompt(QA_SYSTEM_PROMPT)
            .with_tool(PromptTool::pytest_case_generator(client.clone())?)
            .with_tool(PromptTool::broken_code_fixer(client.clone())?)
            .with_tool(PromptTool::error_analyzer(client.clone())?))
    }

    /// Jira stories to test cases and pytest files.
    pub fn jira_agent(
        &self,
        sheet: &Path,
    ) -> Result<AgentBuilder, SessionError> {
        let jira = self.config.jira()?;
        let client = &self.model_client;
        let exporter = ExcelToPytestFileGenerator::new(client.clone(), sheet)?;
        Ok(self
            .agent_builder()
            .with_system_prompt(JIRA_SYSTEM_PROMPT)
            .with_tool(JiraStoryFetcher::new(self.http.clone(), jira))
            .with_tool(PromptTool::test_case_generator(client.clone())?)
            .with_tool(exporter))
    }

    /// Interview questions answered from a resume, with an SMS when the
    /// resume has no answer.
    ///
    /// The document is indexed before this returns.
    pub async fn resume_agent(
        &self,
        document: &Path,
    ) -> Result<AgentBuilder, SessionError> {
        let twilio = self.config.twilio()?;
        let qa = DocumentQa::from_document(
            document,
            self.embedder.clone(),
            self.model_client.clone(),
            QaPrompt::resume()?,
        )
        .await?;
        Ok(self
            .agent_builder()
            .with_prompt_template(PromptTemplate::from_template(
                RESUME_AGENT_PROMPT,
            )?)
            .with_tool(ResumeSearchTool::new(qa))
            .with_tool(TwilioTool::new(self.http.clone(), twilio)))
    }

    /// Company policy questions answered from `document`, which is indexed
    /// before this returns.
    pub async fn policy_qa(
        &self,
        document: &Path,
    ) -> Result<DocumentQa, SessionError> {
        Ok(DocumentQa::from_document(
            document,
            self.embedder.clone(),
            self.model_client.clone(),
            QaPrompt::policy()?,
        )
        .await?)
    }

    /// A planner, a budget expert and an activity expert taking turns on
    /// a travel plan.
    pub fn trip_planner(&self, max_turns: usize) -> GroupChat {
        TRIP_MEMBERS.into_iter().fold(
            GroupChat::new(max_turns),
            |chat, (name, system_prompt)| {
                let executor = self
                    .agent_builder()
                    .with_system_prompt(system_prompt.trim())
                    .build();
                chat.with_member(name, executor)
            },
        )
    }

    /// Directions, travel times and weather.
    pub fn navigate_agent(&self) -> Result<AgentBuilder, SessionError> {
        let maps = self.config.maps()?;
        let mut builder = self
            .agent_builder()
            .with_prompt_template(PromptTemplate::from_template(
                NAVIGATE_PROMPT,
            )?)
            .with_tool(DirectionsTool::new(self.http.clone(), maps.clone()))
            .with_tool(TravelTimeTool::new(self.http.clone(), maps.clone()))
            .with_tool(CoordinatesTool::new(self.http.clone(), maps));
        match self.config.weather() {
            Ok(weather) => {
                builder = builder
                    .with_tool(WeatherTool::new(self.http.clone(), weather));
            }
            Err(err) => warn!("{err}, WeatherAPI is disabled"),
        }
        Ok(builder)
    }

    /// Commit history of GitHub repositories.
    pub fn github_agent(&self) -> AgentBuilder {
        let github = self.config.github();
        self.agent_builder()
            .with_tool(CommitListTool::new(self.http.clone(), github))
    }

    #[inline]
    fn agent_builder(&self) -> AgentBuilder {
        AgentBuilder::with_model_client(self.model_client.clone())
            .with_temperature(DEMO_TEMPERATURE)
    }
}
