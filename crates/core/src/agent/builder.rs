use std::sync::Arc;

use toolwire_model::{ModelProvider, ToolCallRequest};

use super::{AgentExecutor, AgentStep};
use crate::model_client::{ModelClient, RetryPolicy};
use crate::prompt::PromptTemplate;
use crate::tool::{Approval, Manager as ToolManager, Tool};

const DEFAULT_MAX_ITERATIONS: usize = 15;

/// [`AgentExecutor`] builder.
pub struct AgentBuilder {
    executor: AgentExecutor,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder sharing an existing model client.
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            executor: AgentExecutor {
                model_client,
                tools: ToolManager::default(),
                system_prompt: None,
                prompt_template: None,
                max_iterations: DEFAULT_MAX_ITERATIONS,
                temperature: None,
                on_transcript: None,
                on_tool_call: None,
                on_step: None,
                on_approval: None,
            },
        }
    }

    /// Sets the system message sent before the user input.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.executor.system_prompt = Some(prompt.into());
        self
    }

    /// Renders every input through `template`. The input is bound to
    /// `{input}`, and `{agent_scratchpad}` renders empty.
    #[inline]
    pub fn with_prompt_template(mut self, template: PromptTemplate) -> Self {
        self.executor.prompt_template = Some(template);
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.executor.tools.add_tool(tool);
        self
    }

    /// Limits the number of model requests per input (15 by default).
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.executor.max_iterations = max_iterations;
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.executor.temperature = Some(temperature);
        self
    }

    /// Replaces how rate-limited model requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.executor.model_client =
            self.executor.model_client.with_retry_policy(retry_policy);
        self
    }

    /// Attaches a callback receiving model text as it streams in.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        self.executor.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback invoked before each tool call.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.executor.on_tool_call = Some(Box::new(on_tool_call));
        self
    }

    /// Attaches a callback invoked after each tool call with its
    /// observation.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&AgentStep) + Send + Sync + 'static,
    ) -> Self {
        self.executor.on_step = Some(Box::new(on_step));
        self
    }

    /// Attaches the approval handler. Without one, tools that ask for
    /// approval run unattended.
    #[inline]
    pub fn on_approval(
        mut self,
        on_approval: impl Fn(Approval) + Send + Sync + 'static,
    ) -> Self {
        self.executor.on_approval = Some(Box::new(on_approval));
        self
    }

    /// Builds the executor.
    #[inline]
    pub fn build(self) -> AgentExecutor {
        self.executor
    }
}
