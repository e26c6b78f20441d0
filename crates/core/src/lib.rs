//! Core logic including the agent loop, round-robin group chats, tool
//! execution, model client and prompt templates.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
mod conversation;
mod group_chat;
mod model_client;
mod prompt;
pub mod tool;

pub use agent::{
    AgentBuilder, AgentError, AgentExecutor, AgentOutput, AgentStep,
};
pub use group_chat::{
    ChatMessage, GroupChat, GroupChatError, GroupChatOutput, StopReason,
    TASK_SOURCE,
};
pub use model_client::{ModelClient, ModelClientResponse, RetryPolicy};
pub use prompt::{PromptTemplate, TemplateError};
