mod builder;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use toolwire_model::{
    ErrorKind, ModelMessage, ModelProviderError, ToolCallRequest,
    ToolCallResult,
};
use tracing::Instrument;

pub use builder::AgentBuilder;

use crate::conversation::Conversation;
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::prompt::{PromptTemplate, TemplateError};
use crate::tool::Manager as ToolManager;
use crate::tool::ApprovalFn;

pub(crate) type TranscriptFn = Arc<dyn Fn(String) + Send + Sync>;
pub(crate) type ToolCallFn = dyn Fn(&ToolCallRequest) + Send + Sync;
pub(crate) type StepFn = dyn Fn(&AgentStep) + Send + Sync;

/// One tool call made while answering an input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentStep {
    /// Name of the requested tool.
    pub tool: String,
    /// Arguments as sent by the model.
    pub arguments: Value,
    /// The text fed back to the model.
    pub observation: String,
}

/// The result of [`AgentExecutor::invoke`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentOutput {
    /// The final answer of the model.
    pub output: String,
    /// Tool calls in the order they were executed.
    pub steps: Vec<AgentStep>,
}

/// Errors that abort an invocation.
///
/// Tool failures are not among them, they become observations instead.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model provider failed, after retries where applicable.
    #[error("model request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// The model kept calling tools past the iteration limit.
    #[error("agent stopped after {0} iterations without a final answer")]
    MaxIterations(usize),
    /// The input could not be rendered into the prompt template.
    #[error("failed to render the prompt: {0}")]
    Template(#[from] TemplateError),
}

impl AgentError {
    /// Returns the provider error kind for [`AgentError::Model`].
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            AgentError::Model(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Runs the tool-calling loop for one input at a time.
///
/// Every [`invoke`](Self::invoke) starts from a fresh conversation, so an
/// executor can be reused for any number of inputs.
pub struct AgentExecutor {
    model_client: ModelClient,
    tools: ToolManager,
    system_prompt: Option<String>,
    prompt_template: Option<PromptTemplate>,
    max_iterations: usize,
    temperature: Option<f32>,
    on_transcript: Option<TranscriptFn>,
    on_tool_call: Option<Box<ToolCallFn>>,
    on_step: Option<Box<StepFn>>,
    on_approval: Option<Box<ApprovalFn>>,
}

impl AgentExecutor {
    /// Answers `input`, calling tools as the model requests them.
    pub async fn invoke(
        &self,
        input: &str,
    ) -> Result<AgentOutput, AgentError> {
        let input = ModelMessage::User(self.render_input(input)?);
        self.run(&[input]).instrument(info_span!("agent invoke")).await
    }

    /// Continues an existing exchange until the model answers without
    /// calling a tool.
    ///
    /// The system prompt is sent before `history`. The prompt template is
    /// not applied.
    pub async fn respond(
        &self,
        history: &[ModelMessage],
    ) -> Result<AgentOutput, AgentError> {
        self.run(history).instrument(info_span!("agent respond")).await
    }

    async fn run(
        &self,
        history: &[ModelMessage],
    ) -> Result<AgentOutput, AgentError> {
        let mut conversation = Conversation::default();
        if let Some(system_prompt) = &self.system_prompt {
            conversation.push(ModelMessage::System(system_prompt.clone()));
        }
        for msg in history {
            conversation.push(msg.clone());
        }

        let definitions = self.tools.definitions();
        let mut steps = vec![];

        for iteration in 0..self.max_iterations {
            debug!(
                "iteration {iteration} with {} messages",
                conversation.len()
            );
            let req =
                conversation.to_request(definitions.clone(), self.temperature);
            let on_transcript = self.on_transcript.clone();
            let resp = self
                .model_client
                .send_request(req, move |delta| {
                    if let Some(on_transcript) = &on_transcript {
                        on_transcript(delta);
                    }
                })
                .await
                .map_err(AgentError::Model)?;

            let ModelClientResponse {
                transcript,
                opaque_msg,
                tool_calls,
                ..
            } = resp;
            conversation.push(match opaque_msg {
                Some(opaque_msg) => ModelMessage::Opaque(opaque_msg),
                None => ModelMessage::Assistant(transcript.clone()),
            });

            if tool_calls.is_empty() {
                return Ok(AgentOutput {
                    output: transcript,
                    steps,
                });
            }

            for call in tool_calls {
                let observation = self.run_tool(&call).await;
                conversation.push(ModelMessage::Tool(ToolCallResult {
                    id: call.id,
                    content: observation.clone(),
                }));
                let step = AgentStep {
                    tool: call.name,
                    arguments: call.arguments,
                    observation,
                };
                if let Some(on_step) = &self.on_step {
                    on_step(&step);
                }
                steps.push(step);
            }
        }

        warn!("no final answer after {} iterations", self.max_iterations);
        Err(AgentError::MaxIterations(self.max_iterations))
    }

    fn render_input(&self, input: &str) -> Result<String, TemplateError> {
        match &self.prompt_template {
            // Tool history travels as messages, the scratchpad stays empty.
            Some(template) => {
                template.format(&[("input", input), ("agent_scratchpad", "")])
            }
            None => Ok(input.to_owned()),
        }
    }

    async fn run_tool(&self, call: &ToolCallRequest) -> String {
        if let Some(on_tool_call) = &self.on_tool_call {
            on_tool_call(call);
        }

        let Some(fut) = self.tools.call(
            &call.name,
            call.arguments.clone(),
            self.on_approval.as_deref(),
        ) else {
            warn!("model requested an unknown tool: {}", call.name);
            return format!(
                "{} is not a valid tool, try one of [{}].",
                call.name,
                self.tools.names().join(", ")
            );
        };

        match fut.await {
            Ok(observation) => observation,
            Err(err) => {
                debug!("tool {} failed: {err:?}", call.name);
                format!("Error: {}", err.reason())
            }
        }
    }
}
