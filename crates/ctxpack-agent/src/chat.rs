//! Chat model capability interface
//!
//! The core never sees provider types: a chat model is something that takes
//! a request (system, prompt, tools, step budget) and yields a stream of
//! typed events. Tool execution happens inside the model's agent loop via
//! the handlers carried on each tool definition.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::AgentResult;

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Handler a chat model invokes to execute a tool call
pub type ToolHandler = Arc<
    dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value, String>>
        + Send
        + Sync,
>;

/// A tool definition exposed to the model
#[derive(Clone)]
pub struct ToolDefinition {
    /// Tool name (must match the dispatch the model reports back)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema object describing the tool's input
    pub parameters: serde_json::Value,
    /// Executes a call; errors come back to the model as tool failures
    pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .finish()
    }
}

/// A request to the chat model
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system: String,
    pub prompt: String,
    pub tools: Vec<ToolDefinition>,
    /// Maximum model→tool round-trips before the model must answer
    pub step_budget: usize,
}

/// Typed events a chat model emits while running
///
/// Tool inputs/outputs stay as free-form JSON; provider payloads never leak
/// through this boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    TextDelta { text: String },
    Reasoning { text: String },
    ToolCall { name: String, input: serde_json::Value },
    ToolResult { name: String, output: serde_json::Value },
    Finish { reason: String, usage: ChatUsage },
    Error { message: String },
}

/// The event stream a chat model yields
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// The buffered outcome of a chat run
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    /// All text deltas, concatenated
    pub text: String,
    /// Every event the run produced, in order
    pub events: Vec<ChatEvent>,
    pub finish_reason: Option<String>,
    pub usage: Option<ChatUsage>,
}

/// Capability interface for the completion/agent-loop provider
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, surfaced in stream start/done events
    fn model_name(&self) -> &str;

    /// Run the request, yielding typed events until a `Finish` or `Error`
    ///
    /// # Errors
    ///
    /// Returns an error only when the run cannot start at all; mid-run
    /// failures arrive as `ChatEvent::Error`.
    async fn stream(&self, request: ChatRequest) -> AgentResult<ChatEventStream>;

    /// Run the request to completion and buffer the full result
    ///
    /// # Errors
    ///
    /// A mid-run `ChatEvent::Error` surfaces as `AgentError::Upstream`.
    async fn generate(&self, request: ChatRequest) -> AgentResult<ChatOutcome> {
        use futures::StreamExt;

        let mut stream = self.stream(request).await?;
        let mut outcome = ChatOutcome::default();
        while let Some(event) = stream.next().await {
            match &event {
                ChatEvent::TextDelta { text } => outcome.text.push_str(text),
                ChatEvent::Finish { reason, usage } => {
                    outcome.finish_reason = Some(reason.clone());
                    outcome.usage = Some(usage.clone());
                }
                ChatEvent::Error { message } => {
                    return Err(crate::error::AgentError::Upstream {
                        message: message.clone(),
                    });
                }
                _ => {}
            }
            outcome.events.push(event);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_event_serialization_is_kebab_case_tagged() {
        let event = ChatEvent::TextDelta {
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&event).expect("serializes");
        assert!(json.contains(r#""type":"text-delta""#), "got {json}");

        let event = ChatEvent::ToolCall {
            name: "search".to_string(),
            input: serde_json::json!({"query": "beta"}),
        };
        let json = serde_json::to_string(&event).expect("serializes");
        assert!(json.contains(r#""type":"tool-call""#), "got {json}");
    }
}
