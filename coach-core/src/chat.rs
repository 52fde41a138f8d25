//! Chat messages and conversation turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted chat message. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One completed exchange: the user's question and the assistant's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
}

impl ChatTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self { user: user.into(), assistant: assistant.into() }
    }
}

/// Pair each user message with the assistant message that directly follows it.
///
/// A user message left unanswered (a failed turn, or the one still pending)
/// is skipped, as are assistant and system messages without a preceding
/// question. Later turns are unaffected by what was skipped.
pub fn pair_turns(messages: &[ChatMessage]) -> Vec<ChatTurn> {
    let mut turns = Vec::new();
    let mut pending: Option<&str> = None;
    for message in messages {
        match message.role {
            Role::User => pending = Some(&message.content),
            Role::Assistant => {
                if let Some(question) = pending.take() {
                    turns.push(ChatTurn::new(question, message.content.clone()));
                }
            }
            Role::System => pending = None,
        }
    }
    turns
}
