use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, SingleInput, Tool, ToolResult,
};

use crate::rag::DocumentQa;

/// Answers interview questions from the indexed resume.
pub struct ResumeSearchTool {
    qa: DocumentQa,
    parameter_schema: Value,
}

impl ResumeSearchTool {
    /// Creates the tool.
    #[inline]
    pub fn new(qa: DocumentQa) -> Self {
        Self {
            qa,
            parameter_schema: SingleInput::parameter_schema(
                "The interview question.",
            ),
        }
    }
}

impl Tool for ResumeSearchTool {
    type Input = SingleInput;

    fn name(&self) -> &str {
        "resume_search"
    }

    fn description(&self) -> &str {
        "Use this tool to search the resume and answer interview questions \
         based on its content. If the answer is not found, return 'I don't \
         know based on my resume.' as a string. If you ever answer 'I don't \
         know based on my resume.', you must immediately use the twilio_tool \
         to notify the user by SMS."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SingleInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let qa = self.qa.clone();
        async move {
            qa.answer(&input.0).await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use toolwire_core::ModelClient;
    use toolwire_test_model::{
        PresetResponse, TestEmbeddingProvider, TestModelProvider,
    };

    use super::*;
    use crate::rag::{
        Embedder, QaPrompt, RESUME_FALLBACK, TextSplitter, build_index,
    };

    async fn tool(reply: &str) -> ResumeSearchTool {
        let embedder = Embedder::new(TestEmbeddingProvider);
        let index = build_index(
            "Five years of Rust and Python experience.",
            &TextSplitter::default(),
            &embedder,
        )
        .await
        .unwrap();
        let provider = TestModelProvider::default()
            .with_response(PresetResponse::with_text(reply));
        ResumeSearchTool::new(DocumentQa::new(
            index,
            embedder,
            ModelClient::new(provider),
            QaPrompt::resume().unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_answers_from_resume() {
        let tool = tool("I have five years of Rust experience.").await;
        let answer = tool
            .execute(SingleInput("How much Rust experience?".to_owned()))
            .await
            .unwrap();
        assert_eq!(answer, "I have five years of Rust experience.");
    }

    #[tokio::test]
    async fn test_dont_know_is_normalized() {
        let tool = tool("Hmm, I don't know.").await;
        let answer = tool
            .execute(SingleInput("Favourite colour?".to_owned()))
            .await
            .unwrap();
        assert_eq!(answer, RESUME_FALLBACK);
    }

    #[tokio::test]
    async fn test_empty_answer_is_normalized() {
        let tool = tool("").await;
        let answer = tool
            .execute(SingleInput("Anything?".to_owned()))
            .await
            .unwrap();
        assert_eq!(answer, RESUME_FALLBACK);
    }
}
