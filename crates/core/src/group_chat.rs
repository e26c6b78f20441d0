//! Round-robin conversations between several agents.

use thiserror::Error;
use toolwire_model::ModelMessage;

use crate::agent::{AgentError, AgentExecutor};

/// Source name of the task that opens a chat.
pub const TASK_SOURCE: &str = "user";

type MessageFn = dyn Fn(&ChatMessage) + Send + Sync;

/// One message of a group chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// The member who wrote it, or [`TASK_SOURCE`] for the task.
    pub source: String,
    /// The message text.
    pub content: String,
}

/// Why a group chat ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The turn limit was reached.
    MaxTurns,
    /// A member mentioned the termination phrase.
    Termination,
}

/// The result of [`GroupChat::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupChatOutput {
    /// Every message in order, starting with the task.
    pub messages: Vec<ChatMessage>,
    /// Why the chat ended.
    pub stop_reason: StopReason,
}

/// Errors that abort a group chat.
#[derive(Debug, Error)]
pub enum GroupChatError {
    /// No member was added.
    #[error("the group chat has no members")]
    NoMembers,
    /// A member's agent failed.
    #[error("{name} failed: {source}")]
    Agent {
        /// The member's name.
        name: String,
        /// The agent error.
        source: AgentError,
    },
}

struct Member {
    name: String,
    executor: AgentExecutor,
}

/// Lets agents take turns on a shared transcript.
///
/// Members speak in the order they were added. Each one sees the task and
/// every message so far: its own earlier messages as assistant turns, the
/// others' as user messages prefixed with the speaker's name.
pub struct GroupChat {
    members: Vec<Member>,
    max_turns: usize,
    termination: Option<String>,
    on_message: Option<Box<MessageFn>>,
}

impl GroupChat {
    /// Creates an empty chat ending after `max_turns` member messages.
    #[inline]
    pub fn new(max_turns: usize) -> Self {
        Self {
            members: vec![],
            max_turns,
            termination: None,
            on_message: None,
        }
    }

    /// Adds a member.
    #[inline]
    pub fn with_member<S: Into<String>>(
        mut self,
        name: S,
        executor: AgentExecutor,
    ) -> Self {
        self.members.push(Member {
            name: name.into(),
            executor,
        });
        self
    }

    /// Ends the chat as soon as a member's message contains `phrase`.
    #[inline]
    pub fn with_termination<S: Into<String>>(mut self, phrase: S) -> Self {
        self.termination = Some(phrase.into());
        self
    }

    /// Attaches a callback receiving every message, the task included.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(&ChatMessage) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(on_message));
        self
    }

    /// Runs the chat on `task`.
    pub async fn run(
        &self,
        task: &str,
    ) -> Result<GroupChatOutput, GroupChatError> {
        if self.members.is_empty() {
            return Err(GroupChatError::NoMembers);
        }

        let mut messages = vec![];
        self.push(
            &mut messages,
            ChatMessage {
                source: TASK_SOURCE.to_owned(),
                content: task.to_owned(),
            },
        );

        for turn in 0..self.max_turns {
            let member = &self.members[turn % self.members.len()];
            debug!("turn {turn}: {}", member.name);
            let history: Vec<_> = messages
                .iter()
                .map(|msg| as_seen_by(&member.name, msg))
                .collect();
            let output =
                member.executor.respond(&history).await.map_err(|source| {
                    GroupChatError::Agent {
                        name: member.name.clone(),
                        source,
                    }
                })?;

            let terminated = self
                .termination
                .as_deref()
                .is_some_and(|phrase| output.output.contains(phrase));
            self.push(
                &mut messages,
                ChatMessage {
                    source: member.name.clone(),
                    content: output.output,
                },
            );
            if terminated {
                let turns = turn + 1;
                info!("{} ended the chat after {turns} turns", member.name);
                return Ok(GroupChatOutput {
                    messages,
                    stop_reason: StopReason::Termination,
                });
            }
        }

        Ok(GroupChatOutput {
            messages,
            stop_reason: StopReason::MaxTurns,
        })
    }

    fn push(&self, messages: &mut Vec<ChatMessage>, msg: ChatMessage) {
        if let Some(on_message) = &self.on_message {
            on_message(&msg);
        }
        messages.push(msg);
    }
}

fn as_seen_by(member: &str, msg: &ChatMessage) -> ModelMessage {
    if msg.source == member {
        ModelMessage::Assistant(msg.content.clone())
    } else if msg.source == TASK_SOURCE {
        ModelMessage::User(msg.content.clone())
    } else {
        ModelMessage::User(format!("{}: {}", msg.source, msg.content))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use toolwire_test_model::{PresetResponse, TestModelProvider};

    use super::*;
    use crate::AgentBuilder;

    fn member(replies: &[&str]) -> (AgentExecutor, TestModelProvider) {
        let mut provider = TestModelProvider::default();
        for reply in replies {
            provider.add_response(PresetResponse::with_text(*reply));
        }
        let executor = AgentBuilder::with_model_provider(provider.clone())
            .with_system_prompt("Plan trips.")
            .build();
        (executor, provider)
    }

    fn sources(output: &GroupChatOutput) -> Vec<&str> {
        output.messages.iter().map(|m| m.source.as_str()).collect()
    }

    #[tokio::test]
    async fn test_round_robin_until_termination() {
        let (planner, planner_model) =
            member(&["Day 1: Shibuya.", "Final plan. TERMINATE"]);
        let (budget, budget_model) = member(&["Fits in $2500."]);
        let (activity, _) = member(&["Visit Asakusa."]);
        let seen = Arc::new(Mutex::new(vec![]));
        let chat = GroupChat::new(10)
            .with_member("planner", planner)
            .with_member("budget", budget)
            .with_member("activity", activity)
            .with_termination("TERMINATE")
            .on_message({
                let seen = Arc::clone(&seen);
                move |msg| seen.lock().unwrap().push(msg.source.clone())
            });

        let output = chat.run("5 days in Tokyo.").await.unwrap();
        assert_eq!(output.stop_reason, StopReason::Termination);
        assert_eq!(
            sources(&output),
            ["user", "planner", "budget", "activity", "planner"]
        );
        assert_eq!(output.messages[4].content, "Final plan. TERMINATE");
        assert_eq!(*seen.lock().unwrap(), sources(&output));

        assert_eq!(
            budget_model.requests()[0].messages,
            [
                ModelMessage::System("Plan trips.".to_owned()),
                ModelMessage::User("5 days in Tokyo.".to_owned()),
                ModelMessage::User("planner: Day 1: Shibuya.".to_owned()),
            ]
        );
        let second_turn = &planner_model.requests()[1].messages;
        assert_eq!(
            second_turn[2],
            ModelMessage::Assistant("Day 1: Shibuya.".to_owned())
        );
        assert_eq!(
            second_turn[4],
            ModelMessage::User("activity: Visit Asakusa.".to_owned())
        );
    }

    #[tokio::test]
    async fn test_stops_at_turn_limit() {
        let (planner, _) = member(&["Draft.", "Revised draft."]);
        let (budget, _) = member(&["Too expensive."]);
        let chat = GroupChat::new(3)
            .with_member("planner", planner)
            .with_member("budget", budget)
            .with_termination("TERMINATE");

        let output = chat.run("A weekend in Oslo.").await.unwrap();
        assert_eq!(output.stop_reason, StopReason::MaxTurns);
        assert_eq!(sources(&output), ["user", "planner", "budget", "planner"]);
        assert_eq!(output.messages[3].content, "Revised draft.");
    }

    #[tokio::test]
    async fn test_member_failure_names_the_member() {
        let (planner, _) = member(&["Draft."]);
        let (budget, _) = member(&[]);
        let chat = GroupChat::new(4)
            .with_member("planner", planner)
            .with_member("budget", budget);

        match chat.run("Anywhere.").await.unwrap_err() {
            GroupChatError::Agent { name, .. } => assert_eq!(name, "budget"),
            err => panic!("expected an agent error, got {err:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_members() {
        let err = GroupChat::new(3).run("Anywhere.").await.unwrap_err();
        assert!(matches!(err, GroupChatError::NoMembers));
    }
}
