//! Tools that answer with a single completion of a prompt template.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, SingleInput, Tool, ToolResult, parameter_schema_of,
};
use toolwire_core::{ModelClient, PromptTemplate, TemplateError};

const TEST_CASES_PROMPT: &str = include_str!("../prompts/test_cases.md");
const PYTEST_CASE_PROMPT: &str = include_str!("../prompts/pytest_case.md");
const FIX_CODE_PROMPT: &str = include_str!("../prompts/fix_code.md");
const ANALYZE_ERROR_PROMPT: &str = include_str!("../prompts/analyze_error.md");
const TRANSLATOR_PROMPT: &str = include_str!("../prompts/translator_tool.md");

/// A tool that fills its only template variable with the input and returns
/// the model's completion.
pub struct PromptTool {
    name: &'static str,
    description: &'static str,
    template: Arc<PromptTemplate>,
    model_client: ModelClient,
    parameter_schema: Value,
}

impl PromptTool {
    /// Creates a tool from a template with exactly one variable.
    pub fn new(
        name: &'static str,
        description: &'static str,
        template: &str,
        model_client: ModelClient,
    ) -> Result<Self, TemplateError> {
        let template = PromptTemplate::from_template(template)?;
        let parameter_schema = match template.input_variables() {
            [variable] => SingleInput::parameter_schema(&format!(
                "The {} to work on.",
                variable.replace('_', " ")
            )),
            [] => {
                return Err(TemplateError::MissingVariable("input".to_owned()));
            }
            [_, extra, ..] => {
                return Err(TemplateError::MissingVariable(extra.clone()));
            }
        };
        Ok(Self {
            name,
            description,
            template: Arc::new(template),
            model_client,
            parameter_schema,
        })
    }

    /// Generates plain-text test cases from a user story.
    pub fn test_case_generator(
        model_client: ModelClient,
    ) -> Result<Self, TemplateError> {
        Self::new(
            "TestCaseGenerator",
            "Generates at least 5 detailed test cases from a user story",
            TEST_CASES_PROMPT,
            model_client,
        )
    }

    /// Converts a user story into a pytest test function.
    pub fn pytest_case_generator(
        model_client: ModelClient,
    ) -> Result<Self, TemplateError> {
        Self::new(
            "PytestCaseGenerator",
            "Converts user story into pytest test case",
            PYTEST_CASE_PROMPT,
            model_client,
        )
    }

    /// Explains and fixes broken Python code.
    pub fn broken_code_fixer(
        model_client: ModelClient,
    ) -> Result<Self, TemplateError> {
        Self::new(
            "BrokenCodeFixer",
            "Fixes broken Python code and explains the error",
            FIX_CODE_PROMPT,
            model_client,
        )
    }

    /// Suggests a root cause and fix for a Python error log.
    pub fn error_analyzer(
        model_client: ModelClient,
    ) -> Result<Self, TemplateError> {
        Self::new(
            "ErrorAnalyzer",
            "Analyzes Python error logs and suggests fixes",
            ANALYZE_ERROR_PROMPT,
            model_client,
        )
    }
}

impl Tool for PromptTool {
    type Input = SingleInput;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let template = Arc::clone(&self.template);
        let model_client = self.model_client.clone();
        async move {
            let variable = template.input_variables()[0].as_str();
            let prompt = template
                .format(&[(variable, input.0.as_str())])
                .map_err(|err| {
                    ToolError::execution_error().with_reason(err.to_string())
                })?;
            complete(&model_client, prompt).await
        }
    }
}

/// Input of [`TranslatorTool`].
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TranslateInput {
    /// The text to translate.
    pub text: String,
    /// The language to translate into, e.g. French.
    pub target_lang: String,
}

/// Translates text into another language.
pub struct TranslatorTool {
    template: Arc<PromptTemplate>,
    model_client: ModelClient,
    parameter_schema: Value,
}

impl TranslatorTool {
    /// Creates the tool.
    pub fn new(model_client: ModelClient) -> Result<Self, TemplateError> {
        Ok(Self {
            template: Arc::new(PromptTemplate::from_template(
                TRANSLATOR_PROMPT,
            )?),
            model_client,
            parameter_schema: parameter_schema_of::<TranslateInput>(),
        })
    }
}

impl Tool for TranslatorTool {
    type Input = TranslateInput;

    fn name(&self) -> &str {
        "translator"
    }

    fn description(&self) -> &str {
        "Translates text into the target language."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: TranslateInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let template = Arc::clone(&self.template);
        let model_client = self.model_client.clone();
        async move {
            let prompt = template
                .format(&[
                    ("text", input.text.as_str()),
                    ("target_lang", input.target_lang.as_str()),
                ])
                .map_err(|err| {
                    ToolError::execution_error().with_reason(err.to_string())
                })?;
            complete(&model_client, prompt).await
        }
    }
}

async fn complete(model_client: &ModelClient, prompt: String) -> ToolResult {
    model_client.complete(prompt, None).await.map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("model request failed: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use toolwire_model::ModelMessage;
    use toolwire_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    fn last_prompt(provider: &TestModelProvider) -> String {
        let requests = provider.requests();
        match requests.last().and_then(|req| req.messages.last()) {
            Some(ModelMessage::User(text)) => text.clone(),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fills_template() {
        let provider = TestModelProvider::default()
            .with_response(PresetResponse::with_text("def test_login(): ..."));
        let tool = PromptTool::pytest_case_generator(ModelClient::new(
            provider.clone(),
        ))
        .unwrap();

        let output = tool
            .execute(SingleInput("As a user I can log in".to_owned()))
            .await
            .unwrap();
        assert_eq!(output, "def test_login(): ...");

        let prompt = last_prompt(&provider);
        assert!(prompt.starts_with("You are a senior QA engineer."));
        assert!(prompt.ends_with("\"\"\"As a user I can log in\"\"\""));
        assert!(provider.requests()[0].tools.is_empty());
    }

    #[test]
    fn test_rejects_multi_variable_template() {
        let provider = TestModelProvider::default();
        let result = PromptTool::new(
            "Broken",
            "Two variables",
            "{a} and {b}",
            ModelClient::new(provider),
        );
        assert!(matches!(
            result,
            Err(TemplateError::MissingVariable(v)) if v == "b"
        ));
    }

    #[tokio::test]
    async fn test_translator() {
        let provider = TestModelProvider::default()
            .with_response(PresetResponse::with_text("Bonjour"));
        let tool = TranslatorTool::new(ModelClient::new(provider.clone()))
            .unwrap();

        let input: TranslateInput = serde_json::from_value(
            serde_json::json!({ "text": "Hello", "target_lang": "French" }),
        )
        .unwrap();
        assert_eq!(tool.execute(input).await.unwrap(), "Bonjour");
        assert_eq!(
            last_prompt(&provider),
            "Translate the following text to French: Hello"
        );
    }

    #[tokio::test]
    async fn test_model_failure_is_tool_error() {
        let provider = TestModelProvider::default();
        let tool =
            PromptTool::error_analyzer(ModelClient::new(provider)).unwrap();
        let err = tool
            .execute(SingleInput("KeyError: 'x'".to_owned()))
            .await
            .unwrap_err();
        assert!(err.reason().starts_with("model request failed"));
    }
}
