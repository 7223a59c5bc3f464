//! Scripted chat model for tests

// Allow test-specific patterns in mock implementation
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::chat::{ChatEvent, ChatEventStream, ChatModel, ChatRequest, ChatUsage};
use crate::error::AgentResult;

/// One step of a scripted run
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a text delta
    Text(String),
    /// Emit reasoning text
    Reasoning(String),
    /// Call a tool by name through the request's handler and emit the
    /// call/result pair
    CallTool {
        name: String,
        input: serde_json::Value,
    },
    /// Emit the terminal finish event
    Finish { reason: String, usage: ChatUsage },
    /// Emit a terminal error event
    Error(String),
    /// Stall forever (cancellation tests); wakes only when the consumer
    /// disconnects
    Hang,
}

/// Chat model that replays a fixed script, executing real tool handlers
pub struct ScriptedChatModel {
    name: String,
    steps: Vec<ScriptStep>,
}

impl ScriptedChatModel {
    /// Create a scripted model
    pub fn new(name: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// A script that answers with plain text and finishes
    pub fn answering(text: &str) -> Self {
        Self::new(
            "scripted-model",
            vec![
                ScriptStep::Text(text.to_string()),
                ScriptStep::Finish {
                    reason: "stop".to_string(),
                    usage: ChatUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    },
                },
            ],
        )
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: ChatRequest) -> AgentResult<ChatEventStream> {
        let steps = self.steps.clone();
        let tools: Vec<(String, crate::chat::ToolHandler)> = request
            .tools
            .iter()
            .map(|t| (t.name.clone(), Arc::clone(&t.handler)))
            .collect();

        let (tx, rx) = mpsc::channel::<ChatEvent>(16);
        tokio::spawn(async move {
            for step in steps {
                let keep_going = match step {
                    ScriptStep::Text(text) => {
                        tx.send(ChatEvent::TextDelta { text }).await.is_ok()
                    }
                    ScriptStep::Reasoning(text) => {
                        tx.send(ChatEvent::Reasoning { text }).await.is_ok()
                    }
                    ScriptStep::CallTool { name, input } => {
                        if tx
                            .send(ChatEvent::ToolCall {
                                name: name.clone(),
                                input: input.clone(),
                            })
                            .await
                            .is_err()
                        {
                            false
                        } else {
                            let output = match tools.iter().find(|(n, _)| *n == name) {
                                Some((_, handler)) => match (**handler)(input).await {
                                    Ok(output) => output,
                                    Err(message) => serde_json::json!({ "error": message }),
                                },
                                None => {
                                    serde_json::json!({ "error": format!("unknown tool {name}") })
                                }
                            };
                            tx.send(ChatEvent::ToolResult { name, output }).await.is_ok()
                        }
                    }
                    ScriptStep::Finish { reason, usage } => {
                        let _ = tx.send(ChatEvent::Finish { reason, usage }).await;
                        false
                    }
                    ScriptStep::Error(message) => {
                        let _ = tx.send(ChatEvent::Error { message }).await;
                        false
                    }
                    ScriptStep::Hang => {
                        tx.closed().await;
                        false
                    }
                };
                if !keep_going {
                    break;
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(stream.boxed())
    }
}
