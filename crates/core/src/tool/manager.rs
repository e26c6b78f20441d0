use std::sync::Arc;

use serde_json::Value;
use toolwire_model::ModelTool;

use crate::tool::Tool;
use crate::tool::object::{
    ApprovalFn, ToolFuture, ToolObject, ToolObjectImpl,
};

/// Holds the toolset of an agent, in registration order.
#[derive(Default)]
pub struct Manager {
    tools: Vec<Arc<dyn ToolObject>>,
}

impl Manager {
    /// Registers a tool, replacing an earlier one with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let tool: Arc<dyn ToolObject> = Arc::new(ToolObjectImpl(tool));
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => {
                warn!("tool {} registered twice", tool.name());
                *existing = tool;
            }
            None => self.tools.push(tool),
        }
    }

    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Starts a call to the named tool, or returns `None` if there is no
    /// such tool.
    pub fn call(
        &self,
        name: &str,
        arguments: Value,
        on_approval: Option<&ApprovalFn>,
    ) -> Option<ToolFuture> {
        let tool = self.tools.iter().find(|tool| tool.name() == name)?;
        trace!("calling tool {name} with args: {arguments:?}");
        Some(Arc::clone(tool).execute(arguments, on_approval))
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::LazyLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::{Approval, ErrorKind, SingleInput, ToolResult};

    static ECHO_SCHEMA: LazyLock<Value> =
        LazyLock::new(|| SingleInput::parameter_schema("Text to echo."));

    struct Echo;

    impl Tool for Echo {
        type Input = SingleInput;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the input."
        }

        fn parameter_schema(&self) -> &Value {
            &ECHO_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.into_inner()))
        }
    }

    #[derive(Deserialize)]
    struct SendInput {
        to: String,
    }

    struct Sender(Arc<AtomicUsize>);

    impl Tool for Sender {
        type Input = SendInput;

        fn name(&self) -> &str {
            "send"
        }

        fn description(&self) -> &str {
            "Sends something."
        }

        fn parameter_schema(&self) -> &Value {
            &ECHO_SCHEMA
        }

        fn make_approval(&self, input: &Self::Input) -> Option<Approval> {
            Some(Approval::new(format!("Send to {}", input.to), "testing"))
        }

        fn execute(
            &self,
            _input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            self.0.fetch_add(1, Ordering::SeqCst);
            ready(Ok("sent".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_call_in_registration_order() {
        let mut manager = Manager::default();
        manager.add_tool(Echo);
        manager.add_tool(Sender(Default::default()));
        assert_eq!(manager.names(), ["echo", "send"]);
        assert_eq!(manager.definitions()[0].name, "echo");

        let result = manager.call("echo", json!("hi"), None).unwrap().await;
        assert_eq!(result.unwrap(), "hi");
        assert!(manager.call("missing", json!({}), None).is_none());
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let mut manager = Manager::default();
        manager.add_tool(Echo);
        let err = manager
            .call("echo", json!(3), None)
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_approval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut manager = Manager::default();
        manager.add_tool(Sender(Arc::clone(&counter)));

        let approve = |approval: Approval| {
            assert_eq!(approval.what(), "Send to bob");
            approval.approve();
        };
        let result = manager
            .call("send", json!({ "to": "bob" }), Some(&approve))
            .unwrap()
            .await;
        assert_eq!(result.unwrap(), "sent");
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let reject =
            |approval: Approval| approval.reject(Some("not now".to_owned()));
        let err = manager
            .call("send", json!({ "to": "bob" }), Some(&reject))
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.reason(), "not now");

        let ignore = |approval: Approval| drop(approval);
        let err = manager
            .call("send", json!({ "to": "bob" }), Some(&ignore))
            .unwrap()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
