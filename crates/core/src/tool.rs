//! Tool call supports.

mod approval;
mod error;
mod input;
mod manager;
mod object;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use approval::{Approval, ApprovalResult};
pub use error::{Error, ErrorKind};
pub use input::SingleInput;
pub(crate) use manager::Manager;
pub(crate) use object::ApprovalFn;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. Context such as API
/// credentials or a shared HTTP client is set during initialization and
/// cloned into the future returned by [`execute`](Tool::execute).
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned + Send + 'static;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Returns an approval to be confirmed before executing the tool, or
    /// `None` if the call has no side effects worth confirming.
    #[inline]
    fn make_approval(&self, _input: &Self::Input) -> Option<Approval> {
        None
    }

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

/// Generates the JSON schema of a tool input type.
#[inline]
pub fn parameter_schema_of<T: JsonSchema>() -> Value {
    schemars::schema_for!(T).to_value()
}
