use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolwire_core::tool::{
    Error as ToolError, Tool, ToolResult, parameter_schema_of,
};
use toolwire_core::{ModelClient, PromptTemplate, TemplateError};

use crate::sheet::Sheet;

const EXCEL_PYTEST_PROMPT: &str = include_str!("../prompts/excel_pytest.md");
const JIRA_ID_HEADERS: &[&str] = &["jira id", "jiraid"];

/// Input of [`ExcelToPytestFileGenerator`].
///
/// Accepts a bare Jira ID string as well as an object.
#[derive(Debug, Deserialize)]
#[serde(from = "RawInput")]
pub struct PytestFileInput {
    jira_id: String,
    excel_path: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInput {
    Id(String),
    Fields {
        #[serde(alias = "input", alias = "__arg1")]
        jira_id: String,
        #[serde(default)]
        excel_path: Option<String>,
    },
}

impl From<RawInput> for PytestFileInput {
    fn from(raw: RawInput) -> Self {
        match raw {
            RawInput::Id(jira_id) => Self {
                jira_id,
                excel_path: None,
            },
            RawInput::Fields {
                jira_id,
                excel_path,
            } => Self {
                jira_id,
                excel_path,
            },
        }
    }
}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct PytestFileParameters {
    /// The Jira issue ID whose test cases are exported.
    jira_id: String,
    /// Path to the test case sheet, defaults to the configured workbook.
    excel_path: Option<String>,
}

/// Turns every test case row of a Jira issue into one pytest file.
pub struct ExcelToPytestFileGenerator {
    model_client: ModelClient,
    template: Arc<PromptTemplate>,
    default_sheet: Arc<Path>,
    out_dir: Arc<Path>,
    parameter_schema: Value,
}

impl ExcelToPytestFileGenerator {
    /// Creates the tool reading `default_sheet` unless the call names
    /// another one. Files are written to the current directory.
    pub fn new(
        model_client: ModelClient,
        default_sheet: impl Into<PathBuf>,
    ) -> Result<Self, TemplateError> {
        let default_sheet: PathBuf = default_sheet.into();
        Ok(Self {
            model_client,
            template: Arc::new(PromptTemplate::from_template(
                EXCEL_PYTEST_PROMPT,
            )?),
            default_sheet: Arc::from(default_sheet),
            out_dir: Path::new(".").into(),
            parameter_schema: parameter_schema_of::<PytestFileParameters>(),
        })
    }

    /// Sets the directory the pytest files are written to.
    #[inline]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        let out_dir: PathBuf = out_dir.into();
        self.out_dir = Arc::from(out_dir);
        self
    }
}

impl Tool for ExcelToPytestFileGenerator {
    type Input = PytestFileInput;

    fn name(&self) -> &str {
        "ExcelToPytestFileGenerator"
    }

    fn description(&self) -> &str {
        "Reads all test cases for a Jira ID from Excel and generates a \
         single pytest file."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: PytestFileInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let model_client = self.model_client.clone();
        let template = Arc::clone(&self.template);
        let sheet_path = match &input.excel_path {
            Some(path) => PathBuf::from(path),
            None => self.default_sheet.to_path_buf(),
        };
        let out_dir = Arc::clone(&self.out_dir);
        async move {
            let jira_id = input.jira_id.trim().to_owned();
            if !is_file_safe_id(&jira_id) {
                return Err(ToolError::execution_error().with_reason(format!(
                    "invalid Jira ID {jira_id:?}, expected only letters, \
                     digits, '-' and '_'"
                )));
            }
            let sheet = read_sheet(sheet_path.clone()).await?;

            let Some(column) = sheet.find_column(JIRA_ID_HEADERS) else {
                return Ok("No Jira ID column found in Excel file.".to_owned());
            };
            let test_cases: Vec<String> = sheet
                .rows_matching(column, &jira_id)
                .map(|row| sheet.describe_row(row))
                .collect();
            if test_cases.is_empty() {
                return Ok(format!(
                    "No test cases found for Jira ID {jira_id} in {}",
                    sheet_path.display()
                ));
            }

            let mut content = String::from("import pytest\n\n");
            for (idx, test_case) in test_cases.iter().enumerate() {
                debug!("generating test {} of {}", idx + 1, test_cases.len());
                let prompt = template
                    .format(&[("test_case", test_case.as_str())])
                    .map_err(|err| {
                        ToolError::execution_error()
                            .with_reason(err.to_string())
                    })?;
                let code = model_client
                    .complete(prompt, None)
                    .await
                    .map_err(|err| {
                        ToolError::execution_error()
                            .with_reason(format!("model request failed: {err}"))
                    })?;
                content.push_str(strip_code_fence(&code));
                content.push_str("\n\n");
            }

            let file_path = out_dir.join(format!("{jira_id}_test.py"));
            tokio::fs::write(&file_path, content).await.map_err(|err| {
                ToolError::execution_error().with_reason(format!(
                    "failed to write {}: {err}",
                    file_path.display()
                ))
            })?;
            info!(
                "wrote {} test cases to {}",
                test_cases.len(),
                file_path.display()
            );
            Ok(format!("Pytest file generated: {}", file_path.display()))
        }
    }
}

async fn read_sheet(path: PathBuf) -> Result<Sheet, ToolError> {
    let read_failed =
        |reason: String| ToolError::execution_error().with_reason(reason);
    tokio::task::spawn_blocking(move || Sheet::open(&path))
        .await
        .map_err(|err| read_failed(err.to_string()))?
        .map_err(|err| read_failed(err.to_string()))
}

/// The ID names the output file, so it must not carry path syntax.
fn is_file_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Removes the markdown fence models tend to wrap code in.
fn strip_code_fence(code: &str) -> &str {
    let code = code.trim();
    let code = code.strip_prefix("```python").unwrap_or(code);
    let code = code.strip_prefix("```").unwrap_or(code);
    let code = code.strip_suffix("```").unwrap_or(code);
    code.trim()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use toolwire_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    const CSV: &str = "\
JiraID,Title,Steps
QA-1,Valid login,Enter valid credentials
QA-2,Logout,Click logout
qa-1,Locked account,Enter wrong password 3 times
";

    fn setup(reply: &str) -> (tempfile::TempDir, PathBuf, TestModelProvider) {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("testcases.csv");
        std::fs::write(&sheet, CSV).unwrap();
        let provider = TestModelProvider::default()
            .with_response(PresetResponse::with_text(reply));
        (dir, sheet, provider)
    }

    #[test]
    fn test_input_forms() {
        let input: PytestFileInput =
            serde_json::from_value(json!("QA-1")).unwrap();
        assert_eq!(input.jira_id, "QA-1");
        assert!(input.excel_path.is_none());

        let input: PytestFileInput = serde_json::from_value(
            json!({ "jira_id": "QA-1", "excel_path": "cases.xlsx" }),
        )
        .unwrap();
        assert_eq!(input.excel_path.as_deref(), Some("cases.xlsx"));

        let input: PytestFileInput =
            serde_json::from_value(json!({ "input": "QA-9" })).unwrap();
        assert_eq!(input.jira_id, "QA-9");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(
            strip_code_fence("```python\ndef test_a():\n    pass\n```\n"),
            "def test_a():\n    pass"
        );
        assert_eq!(strip_code_fence("def test_b(): ..."), "def test_b(): ...");
    }

    #[tokio::test]
    async fn test_writes_one_function_per_row() {
        let (dir, sheet, provider) =
            setup("```python\ndef test_case():\n    assert True\n```");
        let tool = ExcelToPytestFileGenerator::new(
            ModelClient::new(provider.clone()),
            &sheet,
        )
        .unwrap()
        .with_out_dir(dir.path());

        let result = tool
            .execute(serde_json::from_value(json!("QA-1")).unwrap())
            .await
            .unwrap();
        let file_path = dir.path().join("QA-1_test.py");
        assert_eq!(
            result,
            format!("Pytest file generated: {}", file_path.display())
        );

        let content = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(
            content,
            "import pytest\n\n\
             def test_case():\n    assert True\n\n\
             def test_case():\n    assert True\n\n"
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let first_prompt = format!("{:?}", requests[0].messages);
        assert!(first_prompt.contains("Title: Valid login"));
    }

    #[tokio::test]
    async fn test_no_match_writes_nothing() {
        let (dir, sheet, provider) = setup("unused");
        let tool =
            ExcelToPytestFileGenerator::new(ModelClient::new(provider), &sheet)
                .unwrap()
                .with_out_dir(dir.path());

        let result = tool
            .execute(serde_json::from_value(json!("QA-404")).unwrap())
            .await
            .unwrap();
        assert_eq!(
            result,
            format!(
                "No test cases found for Jira ID QA-404 in {}",
                sheet.display()
            )
        );
        assert!(!dir.path().join("QA-404_test.py").exists());
    }

    #[tokio::test]
    async fn test_path_like_id_is_rejected() {
        let (dir, sheet, provider) = setup("unused");
        let nested = dir.path().join("out");
        std::fs::create_dir(&nested).unwrap();
        let tool = ExcelToPytestFileGenerator::new(
            ModelClient::new(provider.clone()),
            &sheet,
        )
        .unwrap()
        .with_out_dir(&nested);

        for id in ["../QA-1", "QA-1/x", "QA 1", ""] {
            let err = tool
                .execute(serde_json::from_value(json!(id)).unwrap())
                .await
                .unwrap_err();
            assert!(err.reason().starts_with("invalid Jira ID"), "{id}");
        }
        assert!(!dir.path().join("QA-1_test.py").exists());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_id_column() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("cases.csv");
        std::fs::write(&sheet, "Title,Steps\nLogin,Click\n").unwrap();
        let tool = ExcelToPytestFileGenerator::new(
            ModelClient::new(TestModelProvider::default()),
            &sheet,
        )
        .unwrap();

        let result = tool
            .execute(serde_json::from_value(json!("QA-1")).unwrap())
            .await
            .unwrap();
        assert_eq!(result, "No Jira ID column found in Excel file.");
    }
}
