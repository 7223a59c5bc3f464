//! Agent driver: quick answer, exploration, and deep research
//!
//! The three entry points share one shape: build a system prompt describing
//! the in-scope resources and tools, run the chat model under a step
//! budget, and either buffer the full result or stream events lazily.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use crate::chat::{ChatEvent, ChatModel, ChatRequest, ChatUsage};
use crate::error::{AgentError, AgentResult};
use crate::prompts::{explore_system, quick_prompt, quick_system, research_system};
use crate::source::{SourceRef, SourceSet};
use crate::tools::{SearchDefaults, ToolContext, build_toolset};
use ctxpack_config::ChatConfig;
use ctxpack_git::Materializer;
use ctxpack_indexing::UpdateChecker;
use ctxpack_search::{SearchRequest, SearchService};
use ctxpack_store::{Resource, ResourceRepository};

/// The two tool-using agent modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Step budget 20
    Explore,
    /// Step budget 50, broader-coverage system prompt
    Research,
}

/// What the driver records per step
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub text: String,
    pub reasoning: Option<String>,
    pub tool_calls: Vec<(String, serde_json::Value)>,
    pub tool_results: Vec<(String, serde_json::Value)>,
    pub finish_reason: Option<String>,
    pub usage: Option<ChatUsage>,
}

impl StepRecord {
    fn new(step: usize) -> Self {
        Self {
            step,
            text: String::new(),
            reasoning: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            finish_reason: None,
            usage: None,
        }
    }
}

/// Buffered outcome of an exploration or research run
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AgentRunOutcome {
    pub text: String,
    pub steps: Vec<StepRecord>,
    pub sources: Vec<SourceRef>,
    pub finish_reason: Option<String>,
    pub usage: Option<ChatUsage>,
}

/// A failed run still carries everything collected before the failure
#[derive(Debug)]
pub struct AgentRunFailure {
    pub error: AgentError,
    pub partial: AgentRunOutcome,
}

/// Buffered outcome of a quick answer
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuickAnswer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Kind of the previously seen event, for step numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    None,
    Text,
    Reasoning,
    ToolCall,
    ToolResult,
}

/// Folds chat events into step records, sources, and the final text
///
/// Step numbering: a tool-call that follows an event of a different kind
/// opens a new step.
#[derive(Debug)]
pub(crate) struct StepCollector {
    steps: Vec<StepRecord>,
    sources: SourceSet,
    text: String,
    step_counter: usize,
    last_kind: EventKind,
    finish_reason: Option<String>,
    usage: Option<ChatUsage>,
    error: Option<String>,
}

impl StepCollector {
    pub(crate) fn new() -> Self {
        Self {
            steps: Vec::new(),
            sources: SourceSet::new(),
            text: String::new(),
            step_counter: 0,
            last_kind: EventKind::None,
            finish_reason: None,
            usage: None,
            error: None,
        }
    }

    fn record_mut(&mut self) -> &mut StepRecord {
        if self.steps.is_empty() {
            self.steps.push(StepRecord::new(self.step_counter));
        }
        #[allow(clippy::unwrap_used)] // Non-empty by the push above
        self.steps.last_mut().unwrap()
    }

    /// Fold one event; returns the step number tool events belong to
    pub(crate) fn on_event(&mut self, event: &ChatEvent) -> usize {
        match event {
            ChatEvent::TextDelta { text } => {
                self.text.push_str(text);
                self.record_mut().text.push_str(text);
                self.last_kind = EventKind::Text;
            }
            ChatEvent::Reasoning { text } => {
                let record = self.record_mut();
                match &mut record.reasoning {
                    Some(existing) => existing.push_str(text),
                    none => *none = Some(text.clone()),
                }
                self.last_kind = EventKind::Reasoning;
            }
            ChatEvent::ToolCall { name, input } => {
                if self.last_kind != EventKind::ToolCall {
                    self.step_counter += 1;
                    self.steps.push(StepRecord::new(self.step_counter));
                }
                self.record_mut().tool_calls.push((name.clone(), input.clone()));
                self.last_kind = EventKind::ToolCall;
            }
            ChatEvent::ToolResult { name, output } => {
                self.record_mut()
                    .tool_results
                    .push((name.clone(), output.clone()));
                if name == "search" {
                    self.sources.add_from_tool_output(output);
                }
                self.last_kind = EventKind::ToolResult;
            }
            ChatEvent::Finish { reason, usage } => {
                self.finish_reason = Some(reason.clone());
                self.usage = Some(usage.clone());
                let record = self.record_mut();
                record.finish_reason = Some(reason.clone());
                record.usage = Some(usage.clone());
            }
            ChatEvent::Error { message } => {
                self.error = Some(message.clone());
            }
        }
        self.step_counter
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn into_outcome(self) -> AgentRunOutcome {
        AgentRunOutcome {
            text: self.text,
            steps: self.steps,
            sources: self.sources.into_list(),
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}

/// Hook fired exactly once when a stream reaches its terminal event
pub type StreamEndHook = Arc<dyn Fn(Vec<Uuid>) + Send + Sync>;

/// The agent driver
#[derive(Clone)]
pub struct AgentDriver {
    pub(crate) store: Arc<dyn ResourceRepository>,
    pub(crate) search: Arc<SearchService>,
    pub(crate) chat: Arc<dyn ChatModel>,
    pub(crate) materializer: Materializer,
    pub(crate) repos_root: PathBuf,
    pub(crate) config: ChatConfig,
    pub(crate) end_hook: StreamEndHook,
}

impl AgentDriver {
    /// Create a driver; the stream-end hook defaults to a no-op
    pub fn new(
        store: Arc<dyn ResourceRepository>,
        search: Arc<SearchService>,
        chat: Arc<dyn ChatModel>,
        materializer: Materializer,
        repos_root: PathBuf,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            search,
            chat,
            materializer,
            repos_root,
            config,
            end_hook: Arc::new(|_| {}),
        }
    }

    /// Replace the stream-end hook (fired exactly once per stream)
    #[must_use]
    pub fn with_stream_end_hook(mut self, hook: StreamEndHook) -> Self {
        self.end_hook = hook;
        self
    }

    /// Fire a background update check when streams terminate
    #[must_use]
    pub fn with_update_checker(self, checker: UpdateChecker) -> Self {
        self.with_stream_end_hook(Arc::new(move |ids| checker.schedule(ids)))
    }

    /// Resolve the resource scope for a run
    pub(crate) async fn scope(
        &self,
        owner_id: Option<&str>,
        resource_ids: &[Uuid],
    ) -> AgentResult<Vec<Resource>> {
        let resources = if resource_ids.is_empty() {
            self.store.list_resources(owner_id).await?
        } else {
            self.store
                .resources_by_ids(resource_ids)
                .await?
                .into_iter()
                .filter(|r| {
                    r.owner_id.is_none()
                        || owner_id.is_some_and(|o| r.owner_id.as_deref() == Some(o))
                })
                .collect()
        };
        Ok(resources)
    }

    pub(crate) fn tool_context(
        &self,
        resources: Vec<Resource>,
        owner_id: Option<&str>,
    ) -> Arc<ToolContext> {
        self.tool_context_with(resources, owner_id, SearchDefaults::default())
    }

    pub(crate) fn tool_context_with(
        &self,
        resources: Vec<Resource>,
        owner_id: Option<&str>,
        search_defaults: SearchDefaults,
    ) -> Arc<ToolContext> {
        Arc::new(ToolContext {
            search: Arc::clone(&self.search),
            materializer: self.materializer.clone(),
            repos_root: self.repos_root.clone(),
            resources,
            owner_id: owner_id.map(ToString::to_string),
            search_defaults,
        })
    }

    pub(crate) fn request_for(
        &self,
        mode: AgentMode,
        resources: &[Resource],
        query: &str,
        ctx: &Arc<ToolContext>,
    ) -> ChatRequest {
        let (system, step_budget) = match mode {
            AgentMode::Explore => (explore_system(resources), self.config.explore_step_budget),
            AgentMode::Research => {
                (research_system(resources), self.config.research_step_budget)
            }
        };
        ChatRequest {
            system,
            prompt: query.to_string(),
            tools: build_toolset(ctx),
            step_budget,
        }
    }

    /// One retrieval pass plus one tool-free model call
    ///
    /// # Errors
    ///
    /// Propagates retrieval failures and upstream chat errors.
    #[tracing::instrument(skip(self, query), fields(mode = "quick"))]
    pub async fn quick_answer(
        &self,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
    ) -> AgentResult<QuickAnswer> {
        let resources = self.scope(owner_id, resource_ids).await?;

        let results = self
            .search
            .search(
                owner_id,
                SearchRequest {
                    query: query.to_string(),
                    resource_ids: resources.iter().map(|r| r.id).collect(),
                    ..SearchRequest::query(query)
                },
            )
            .await?;

        let mut sources = SourceSet::new();
        for result in &results {
            sources.add(SourceRef::from(result));
        }

        let request = ChatRequest {
            system: quick_system(&resources),
            prompt: quick_prompt(query, &results),
            tools: Vec::new(),
            step_budget: self.config.quick_step_budget,
        };

        let outcome = self.chat.generate(request).await?;
        Ok(QuickAnswer {
            text: outcome.text,
            sources: sources.into_list(),
        })
    }

    /// Buffered exploration or deep research
    ///
    /// # Errors
    ///
    /// Upstream chat failures return `AgentRunFailure`, which carries the
    /// partial results collected before the failure.
    #[tracing::instrument(skip(self, query))]
    pub async fn run(
        &self,
        mode: AgentMode,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
    ) -> Result<AgentRunOutcome, AgentRunFailure> {
        self.run_with_options(mode, owner_id, query, resource_ids, SearchDefaults::default())
            .await
    }

    /// Buffered run with explicit search defaults (async research honors the
    /// persisted job options this way)
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::run`].
    pub async fn run_with_options(
        &self,
        mode: AgentMode,
        owner_id: Option<&str>,
        query: &str,
        resource_ids: &[Uuid],
        search_defaults: SearchDefaults,
    ) -> Result<AgentRunOutcome, AgentRunFailure> {
        let wrap = |error: AgentError| AgentRunFailure {
            error,
            partial: AgentRunOutcome::default(),
        };

        let resources = self.scope(owner_id, resource_ids).await.map_err(wrap)?;
        let ctx = self.tool_context_with(resources.clone(), owner_id, search_defaults);
        let request = self.request_for(mode, &resources, query, &ctx);

        let mut stream = self.chat.stream(request).await.map_err(wrap)?;
        let mut collector = StepCollector::new();

        while let Some(event) = stream.next().await {
            collector.on_event(&event);
            if collector.error().is_some() {
                break;
            }
        }

        if let Some(message) = collector.error() {
            let message = message.to_string();
            return Err(AgentRunFailure {
                error: AgentError::Upstream { message },
                partial: collector.into_outcome(),
            });
        }
        Ok(collector.into_outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_numbering_increments_on_tool_call_after_other_kind() {
        let mut collector = StepCollector::new();

        collector.on_event(&ChatEvent::TextDelta {
            text: "thinking".to_string(),
        });
        let step_a = collector.on_event(&ChatEvent::ToolCall {
            name: "search".to_string(),
            input: serde_json::json!({}),
        });
        assert_eq!(step_a, 1, "first tool call opens step 1");

        // A second tool call immediately after another tool call shares the
        // step
        let step_b = collector.on_event(&ChatEvent::ToolCall {
            name: "read".to_string(),
            input: serde_json::json!({}),
        });
        assert_eq!(step_b, 1);

        collector.on_event(&ChatEvent::ToolResult {
            name: "read".to_string(),
            output: serde_json::json!([]),
        });
        let step_c = collector.on_event(&ChatEvent::ToolCall {
            name: "grep".to_string(),
            input: serde_json::json!({}),
        });
        assert_eq!(step_c, 2, "tool call after a result opens a new step");
    }

    #[test]
    fn test_collector_accumulates_text_and_sources() {
        let mut collector = StepCollector::new();
        collector.on_event(&ChatEvent::TextDelta {
            text: "part one ".to_string(),
        });
        collector.on_event(&ChatEvent::ToolCall {
            name: "search".to_string(),
            input: serde_json::json!({"query": "beta"}),
        });
        collector.on_event(&ChatEvent::ToolResult {
            name: "search".to_string(),
            output: serde_json::json!([{
                "chunk_id": null,
                "resource_id": uuid::Uuid::nil(),
                "resource_name": "demo",
                "filepath": "a.rs",
                "line_start": 1,
                "line_end": 4,
            }]),
        });
        collector.on_event(&ChatEvent::TextDelta {
            text: "part two".to_string(),
        });
        collector.on_event(&ChatEvent::Finish {
            reason: "stop".to_string(),
            usage: ChatUsage::default(),
        });

        let outcome = collector.into_outcome();
        assert_eq!(outcome.text, "part one part two");
        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(outcome.finish_reason.as_deref(), Some("stop"));
        assert_eq!(outcome.steps.len(), 2, "step 0 text plus step 1 tools");
    }

    #[test]
    fn test_collector_captures_error() {
        let mut collector = StepCollector::new();
        collector.on_event(&ChatEvent::Error {
            message: "boom".to_string(),
        });
        assert_eq!(collector.error(), Some("boom"));
    }
}
