//! OrchestrationLoop: drives one user query to a final answer.
//!
//! Each query runs a small state machine:
//!
//! ```text
//!   AwaitingModel ──stop──────────────▶ Done(answer)
//!        │  ▲
//!   tool_calls │ all results appended
//!        ▼  │
//!   Dispatching ──unknown tool / tool failure──▶ Failed
//! ```
//!
//! Any other finish reason is retried up to `max_unexpected_retries` times in
//! a row. Endpoint errors fail the query immediately. The transcript keeps
//! everything appended before a failure, so the next query continues the
//! same conversation.

use crate::inference::types::{FinishReason, ModelResponse, ToolCall};
use crate::inference::ModelEndpoint;
use crate::mcp_client::{McpError, ToolRegistry};

use super::conversation::ConversationState;
use super::errors::AgentError;
use super::types::{AgentEvent, EventObserver, LoopConfig};

// ─── Loop State ─────────────────────────────────────────────────────────────

enum LoopState {
    AwaitingModel,
    Dispatching(Vec<ToolCall>),
    Done(String),
    Failed(AgentError),
}

// ─── OrchestrationLoop ──────────────────────────────────────────────────────

/// The agent: one model endpoint, one transcript, and the loop bounds.
pub struct OrchestrationLoop {
    endpoint: Box<dyn ModelEndpoint>,
    conversation: ConversationState,
    config: LoopConfig,
    observer: Option<EventObserver>,
}

impl OrchestrationLoop {
    pub fn new(endpoint: Box<dyn ModelEndpoint>, config: LoopConfig) -> Self {
        Self {
            endpoint,
            conversation: ConversationState::new(),
            config,
            observer: None,
        }
    }

    /// Report progress events to `observer`.
    pub fn with_observer(mut self, observer: EventObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The transcript so far.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Answer one user query, calling tools from `registry` as the model
    /// requests them.
    pub async fn process_query(
        &mut self,
        registry: &ToolRegistry,
        query: &str,
    ) -> Result<String, AgentError> {
        self.conversation.push_user(query);

        let catalog = registry.catalog();
        let mut state = LoopState::AwaitingModel;
        let mut unexpected: u32 = 0;
        let mut rounds: u32 = 0;

        tracing::info!(
            model = self.endpoint.model_name(),
            tools = catalog.len(),
            "processing query"
        );

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    let messages = self
                        .conversation
                        .to_chat_messages(self.config.system_prompt.as_deref());
                    match self.endpoint.complete(&messages, &catalog).await {
                        Ok(response) => self.interpret(response, &mut unexpected),
                        Err(e) => {
                            tracing::error!(error = %e, "model endpoint call failed");
                            LoopState::Failed(e.into())
                        }
                    }
                }
                LoopState::Dispatching(calls) => {
                    if rounds >= self.config.max_tool_rounds {
                        LoopState::Failed(AgentError::ToolRoundsExhausted { rounds })
                    } else {
                        rounds += 1;
                        tracing::debug!(round = rounds, calls = calls.len(), "dispatching tool calls");
                        match self.dispatch(registry, &calls).await {
                            Ok(()) => LoopState::AwaitingModel,
                            Err(e) => LoopState::Failed(e),
                        }
                    }
                }
                LoopState::Done(answer) => {
                    tracing::info!(rounds, "query answered");
                    return Ok(answer);
                }
                LoopState::Failed(err) => {
                    tracing::warn!(rounds, error = %err, "query failed");
                    return Err(err);
                }
            };
        }
    }

    /// Decide the next state from a model response.
    fn interpret(&mut self, response: ModelResponse, unexpected: &mut u32) -> LoopState {
        match response.finish_reason {
            FinishReason::Stop => {
                let text = response.content.unwrap_or_default();
                self.conversation.push_assistant_text(&text);
                LoopState::Done(text)
            }
            FinishReason::ToolCalls if !response.tool_calls.is_empty() => {
                *unexpected = 0;
                LoopState::Dispatching(response.tool_calls)
            }
            other => {
                // `tool_calls` with no calls lands here too.
                *unexpected += 1;
                let finish_reason = other.as_str().to_string();
                if *unexpected > self.config.max_unexpected_retries {
                    return LoopState::Failed(AgentError::UnexpectedResponse {
                        finish_reason,
                        attempts: *unexpected,
                    });
                }
                tracing::warn!(
                    finish_reason = %finish_reason,
                    attempt = *unexpected,
                    "unexpected finish reason, retrying"
                );
                self.emit(&AgentEvent::Retry {
                    finish_reason,
                    attempt: *unexpected,
                });
                LoopState::AwaitingModel
            }
        }
    }

    /// Run every requested call in order, appending a call turn and then its
    /// result turn for each.
    async fn dispatch(
        &mut self,
        registry: &ToolRegistry,
        calls: &[ToolCall],
    ) -> Result<(), AgentError> {
        for call in calls {
            self.conversation
                .push_tool_call(&call.id, &call.name, call.arguments.clone());

            let owner = registry.resolve(&call.name).ok_or_else(|| {
                tracing::warn!(tool = %call.name, "model requested an unregistered tool");
                AgentError::tool(
                    &call.name,
                    &McpError::UnknownTool {
                        name: call.name.clone(),
                    },
                )
            })?;

            self.emit(&AgentEvent::ToolCall {
                name: call.name.clone(),
                server: owner.identity().to_string(),
                arguments: call.arguments.clone(),
            });

            let result = owner
                .call_tool(&call.name, call.arguments.clone())
                .await
                .map_err(|e| {
                    tracing::warn!(tool = %call.name, server = owner.identity(), error = %e, "tool call failed");
                    AgentError::tool(&call.name, &e)
                })?;

            if result.is_error {
                tracing::info!(tool = %call.name, "tool reported an error result");
            }
            self.emit(&AgentEvent::ToolResult {
                name: call.name.clone(),
                content: result.content.clone(),
                is_error: result.is_error,
            });

            self.conversation.push_tool_result(&call.id, &result.content);
        }
        Ok(())
    }

    fn emit(&self, event: &AgentEvent) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
