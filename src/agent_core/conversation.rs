//! ConversationState: the in-memory transcript of one chat session.
//!
//! Turns are appended in the order they happen and never edited or removed.
//! `to_chat_messages()` renders the transcript into the wire messages sent
//! with every model call.

use crate::inference::types::{ChatMessage, FunctionCallResponse, Role, ToolCallResponse};

// ─── ConversationTurn ───────────────────────────────────────────────────────

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    User {
        text: String,
    },
    AssistantText {
        text: String,
    },
    /// The model asked for a tool; arguments are kept structured.
    AssistantToolCall {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
    },
}

// ─── ConversationState ──────────────────────────────────────────────────────

/// Append-only transcript shared by every query of a session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: &str) {
        self.turns.push(ConversationTurn::User {
            text: text.to_string(),
        });
    }

    pub fn push_assistant_text(&mut self, text: &str) {
        self.turns.push(ConversationTurn::AssistantText {
            text: text.to_string(),
        });
    }

    pub fn push_tool_call(&mut self, id: &str, name: &str, arguments: serde_json::Value) {
        self.turns.push(ConversationTurn::AssistantToolCall {
            tool_call_id: id.to_string(),
            tool_name: name.to_string(),
            arguments,
        });
    }

    pub fn push_tool_result(&mut self, id: &str, content: &str) {
        self.turns.push(ConversationTurn::ToolResult {
            tool_call_id: id.to_string(),
            content: content.to_string(),
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the transcript as chat messages, optionally behind a system
    /// prompt.
    ///
    /// A tool call whose result never arrived (the query failed before
    /// dispatch finished) is left out: the endpoint rejects an assistant
    /// `tool_calls` message that no `tool` message answers.
    pub fn to_chat_messages(&self, system_prompt: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            messages.push(ChatMessage::text(Role::System, prompt));
        }

        for (index, turn) in self.turns.iter().enumerate() {
            match turn {
                ConversationTurn::User { text } => {
                    messages.push(ChatMessage::text(Role::User, text));
                }
                ConversationTurn::AssistantText { text } => {
                    messages.push(ChatMessage::text(Role::Assistant, text));
                }
                ConversationTurn::AssistantToolCall {
                    tool_call_id,
                    tool_name,
                    arguments,
                } => {
                    if !self.is_answered_at(index, tool_call_id) {
                        tracing::debug!(
                            tool = %tool_name,
                            tool_call_id = %tool_call_id,
                            "omitting unanswered tool call from transcript"
                        );
                        continue;
                    }
                    messages.push(ChatMessage {
                        role: Role::Assistant,
                        content: None,
                        tool_call_id: None,
                        tool_calls: Some(vec![ToolCallResponse {
                            id: tool_call_id.clone(),
                            r#type: "function".to_string(),
                            function: FunctionCallResponse {
                                name: tool_name.clone(),
                                arguments: arguments.to_string(),
                            },
                        }]),
                    });
                }
                ConversationTurn::ToolResult {
                    tool_call_id,
                    content,
                } => {
                    messages.push(ChatMessage {
                        role: Role::Tool,
                        content: Some(content.clone()),
                        tool_call_id: Some(tool_call_id.clone()),
                        tool_calls: None,
                    });
                }
            }
        }

        messages
    }

    /// A call is answered when the very next turn is its result. Ids are
    /// compared only there because endpoints may reuse them across rounds.
    fn is_answered_at(&self, index: usize, tool_call_id: &str) -> bool {
        matches!(
            self.turns.get(index + 1),
            Some(ConversationTurn::ToolResult { tool_call_id: id, .. }) if id == tool_call_id
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
