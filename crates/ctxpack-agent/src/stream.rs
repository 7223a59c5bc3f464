//! Streaming entry points
//!
//! Producers run in their own task behind a bounded channel (backpressure),
//! emit a ping heartbeat every five seconds, and close with exactly one
//! terminal event. A disconnected consumer stops the producer, cancels the
//! in-flight chat stream, and still fires the attached side effect exactly
//! once.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use uuid::Uuid;

use crate::chat::{ChatEvent, ChatRequest};
use crate::driver::{AgentDriver, AgentMode, StepCollector};
use crate::events::{PING_INTERVAL_SECS, StreamEvent};
use crate::prompts::{quick_prompt, quick_system};
use crate::source::{SourceRef, SourceSet};
use ctxpack_search::SearchRequest;

/// Channel capacity between the producer and the consumer
const STREAM_BUFFER: usize = 32;

/// Sends events until the consumer goes away
struct Emitter {
    tx: mpsc::Sender<StreamEvent>,
    connected: bool,
}

impl Emitter {
    const fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            connected: true,
        }
    }

    /// Send one event; flips to disconnected when the consumer is gone
    async fn send(&mut self, event: StreamEvent) -> bool {
        if self.connected && self.tx.send(event).await.is_err() {
            self.connected = false;
        }
        self.connected
    }
}

impl AgentDriver {
    /// Stream a quick answer: retrieval, sources, then tool-free text
    pub fn stream_quick(
        &self,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let driver = self.clone();
        let owner = owner_id.map(ToString::to_string);
        let query = query.to_string();
        let ids = resource_ids.to_vec();

        tokio::spawn(async move {
            let mut emitter = Emitter::new(tx);
            let scope_ids = produce_quick(&driver, &mut emitter, owner.as_deref(), &query, &ids)
                .await;
            // Attached side effect: exactly once, terminal event or not
            (driver.end_hook)(scope_ids);
        });
        rx
    }

    /// Stream an exploration or deep-research run
    pub fn stream_run(
        &self,
        mode: AgentMode,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let driver = self.clone();
        let owner = owner_id.map(ToString::to_string);
        let query = query.to_string();
        let ids = resource_ids.to_vec();

        tokio::spawn(async move {
            let mut emitter = Emitter::new(tx);
            let scope_ids =
                produce_run(&driver, mode, &mut emitter, owner.as_deref(), &query, &ids).await;
            (driver.end_hook)(scope_ids);
        });
        rx
    }
}

/// Quick-answer producer body; returns the resolved scope for the end hook
async fn produce_quick(
    driver: &AgentDriver,
    emitter: &mut Emitter,
    owner_id: Option<&str>,
    query: &str,
    resource_ids: &[Uuid],
) -> Vec<Uuid> {
    let model = driver.chat.model_name().to_string();
    if !emitter.send(StreamEvent::Start { model: model.clone() }).await {
        return resource_ids.to_vec();
    }

    let resources = match driver.scope(owner_id, resource_ids).await {
        Ok(resources) => resources,
        Err(e) => {
            emitter
                .send(StreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return resource_ids.to_vec();
        }
    };
    let scope_ids: Vec<Uuid> = resources.iter().map(|r| r.id).collect();

    let results = match driver
        .search
        .search(
            owner_id,
            SearchRequest {
                query: query.to_string(),
                resource_ids: scope_ids.clone(),
                ..SearchRequest::query(query)
            },
        )
        .await
    {
        Ok(results) => results,
        Err(e) => {
            emitter
                .send(StreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return scope_ids;
        }
    };

    let mut sources = SourceSet::new();
    for result in &results {
        sources.add(SourceRef::from(result));
    }
    if !emitter
        .send(StreamEvent::Sources {
            list: sources.into_list(),
        })
        .await
    {
        return scope_ids;
    }

    let request = ChatRequest {
        system: quick_system(&resources),
        prompt: quick_prompt(query, &results),
        tools: Vec::new(),
        step_budget: driver.config.quick_step_budget,
    };
    drive_chat(driver, emitter, request, &model, None).await;
    scope_ids
}

/// Tool-run producer body; returns the resolved scope for the end hook
async fn produce_run(
    driver: &AgentDriver,
    mode: AgentMode,
    emitter: &mut Emitter,
    owner_id: Option<&str>,
    query: &str,
    resource_ids: &[Uuid],
) -> Vec<Uuid> {
    let model = driver.chat.model_name().to_string();
    if !emitter.send(StreamEvent::Start { model: model.clone() }).await {
        return resource_ids.to_vec();
    }

    let resources = match driver.scope(owner_id, resource_ids).await {
        Ok(resources) => resources,
        Err(e) => {
            emitter
                .send(StreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return resource_ids.to_vec();
        }
    };
    let scope_ids: Vec<Uuid> = resources.iter().map(|r| r.id).collect();

    let ctx = driver.tool_context(resources.clone(), owner_id);
    let request = driver.request_for(mode, &resources, query, &ctx);

    let mut collector = StepCollector::new();
    drive_chat(driver, emitter, request, &model, Some(&mut collector)).await;
    scope_ids
}

/// Pump the chat stream into the emitter with heartbeats and exactly one
/// terminal event
async fn drive_chat(
    driver: &AgentDriver,
    emitter: &mut Emitter,
    request: ChatRequest,
    model: &str,
    mut collector: Option<&mut StepCollector>,
) {
    let mut chat_stream = match driver.chat.stream(request).await {
        Ok(stream) => stream,
        Err(e) => {
            emitter
                .send(StreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return;
        }
    };

    let period = Duration::from_secs(PING_INTERVAL_SECS);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Cloned handle so disconnect detection does not hold a borrow on the
    // emitter across the select arms
    let disconnect = emitter.tx.clone();

    loop {
        tokio::select! {
            () = disconnect.closed() => {
                // Consumer gone: dropping the chat stream cancels the
                // in-flight call and its tool executions
                emitter.connected = false;
                return;
            }
            _ = ticker.tick() => {
                if !emitter.send(StreamEvent::Ping).await {
                    return;
                }
            }
            event = chat_stream.next() => {
                let step = event
                    .as_ref()
                    .map(|e| collector.as_mut().map_or(0, |c| c.on_event(e)));
                match event {
                    Some(ChatEvent::TextDelta { text }) => {
                        if !emitter.send(StreamEvent::TextDelta { text }).await {
                            return;
                        }
                    }
                    Some(ChatEvent::ToolCall { name, input }) => {
                        let event = StreamEvent::ToolCall {
                            step: step.unwrap_or(0),
                            name,
                            input,
                        };
                        if !emitter.send(event).await {
                            return;
                        }
                    }
                    Some(ChatEvent::ToolResult { name, output }) => {
                        let event = StreamEvent::ToolResult {
                            step: step.unwrap_or(0),
                            name,
                            output,
                        };
                        if !emitter.send(event).await {
                            return;
                        }
                    }
                    Some(ChatEvent::Reasoning { .. }) => {
                        // Captured by the collector; not a consumer event
                    }
                    Some(ChatEvent::Finish { .. }) => {
                        emitter
                            .send(StreamEvent::Done {
                                model: model.to_string(),
                            })
                            .await;
                        return;
                    }
                    Some(ChatEvent::Error { message }) => {
                        emitter.send(StreamEvent::Error { message }).await;
                        return;
                    }
                    None => {
                        // Provider closed without a finish marker; still a
                        // clean termination for the consumer
                        emitter
                            .send(StreamEvent::Done {
                                model: model.to_string(),
                            })
                            .await;
                        return;
                    }
                }
            }
        }
    }
}
