use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::Instrument;

use super::{Approval, Error, Tool, ToolResult};

pub(crate) type ApprovalFn = dyn Fn(Approval) + Send + Sync;
pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(
        self: Arc<Self>,
        arguments: Value,
        on_approval: Option<&ApprovalFn>,
    ) -> ToolFuture;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(
        self: Arc<Self>,
        arguments: Value,
        on_approval: Option<&ApprovalFn>,
    ) -> ToolFuture {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };

        let approval_res_rx = self.0.make_approval(&input).map(|mut approval| {
            let (approval_res_tx, approval_res_rx) = oneshot::channel();
            approval.on_result = Some(Box::new(move |result| {
                approval_res_tx.send(result).ok();
            }));
            match on_approval {
                Some(on_approval) => on_approval(approval),
                // Nobody to ask, run unattended.
                None => approval.approve(),
            }
            approval_res_rx
        });

        let span = debug_span!("tool execute", tool = %self.0.name());
        Box::pin(
            async move {
                if let Some(approval_res_rx) = approval_res_rx {
                    let Ok(approval_res) = approval_res_rx.await else {
                        return ToolResult::Err(
                            Error::permission_denied()
                                .with_reason("The tool call was not approved."),
                        );
                    };
                    trace!("tool call approval result: {approval_res:?}");
                    if !approval_res.approved {
                        return ToolResult::Err(
                            Error::permission_denied().with_reason(
                                approval_res.why.unwrap_or_else(|| {
                                    "The user rejected the tool call."
                                        .to_owned()
                                }),
                            ),
                        );
                    }
                }
                self.0.execute(input).await
            }
            .instrument(span),
        )
    }
}
