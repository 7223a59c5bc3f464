//! Agent driver integration tests over the mock store and a scripted model

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use ctxpack_agent::{
    AgentDriver, AgentMode, ChatUsage, ResearchRunner, ScriptStep, ScriptedChatModel,
    StreamEvent,
};
use ctxpack_config::{ChatConfig, SearchConfig};
use ctxpack_git::Materializer;
use ctxpack_indexing::Supervisor;
use ctxpack_search::SearchService;
use ctxpack_store::{
    ContentStatus, JobStatus, MockStore, NewChunk, ResearchJobRepository, ResearchOptions,
    ResourceRepository, VectorStatus,
};
use ctxpack_test_utils::{StubEmbedder, local_resource, temp_tree};

const WAIT: Duration = Duration::from_secs(20);

struct Fixture {
    store: MockStore,
    _tree: tempfile::TempDir,
    resource_id: uuid::Uuid,
}

/// An indexed two-file resource, both statuses ready
async fn fixture() -> Fixture {
    let tree = temp_tree(&[("a.txt", "alpha\nbeta\n"), ("b.txt", "beta\ngamma\n")]);
    let store = MockStore::new();
    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create resource");

    let chunk = |path: &str, text: &str| NewChunk {
        filepath: path.to_string(),
        line_start: 1,
        line_end: 2,
        text: text.to_string(),
        contextualized_text: format!("// file: {path}\n{text}"),
        scope: None,
        entities: vec![],
        language: None,
        embedding: Some(vec![1.0, 1.0]),
    };
    store
        .replace_chunks(
            &resource.id,
            vec![chunk("a.txt", "alpha\nbeta"), chunk("b.txt", "beta\ngamma")],
        )
        .await
        .expect("chunks");
    store
        .set_content_status(&resource.id, ContentStatus::Ready, None)
        .await
        .expect("ready");
    store
        .set_vector_status(&resource.id, VectorStatus::Ready, None)
        .await
        .expect("ready");

    Fixture {
        store,
        _tree: tree,
        resource_id: resource.id,
    }
}

fn driver(fx: &Fixture, chat: ScriptedChatModel) -> AgentDriver {
    let store = Arc::new(fx.store.clone());
    let repos_root = std::path::PathBuf::from("/nonexistent-repos-root");
    let search = Arc::new(SearchService::new(
        Arc::new(fx.store.clone()),
        Arc::new(StubEmbedder::new(2).with_needle("beta", vec![1.0, 1.0])),
        repos_root.clone(),
        SearchConfig::from_env(),
    ));
    AgentDriver::new(
        store,
        search,
        Arc::new(chat),
        Materializer::new(
            repos_root.clone(),
            Duration::from_secs(60),
            Duration::from_secs(30),
        ),
        repos_root,
        ChatConfig::from_env(),
    )
}

fn finish() -> ScriptStep {
    ScriptStep::Finish {
        reason: "stop".to_string(),
        usage: ChatUsage {
            prompt_tokens: 100,
            completion_tokens: 20,
            total_tokens: 120,
        },
    }
}

#[tokio::test]
async fn test_exploration_run_collects_steps_and_sources() {
    let fx = fixture().await;
    let script = ScriptedChatModel::new(
        "scripted-model",
        vec![
            ScriptStep::Text("Let me look. ".to_string()),
            ScriptStep::CallTool {
                name: "search".to_string(),
                input: json!({"query": "beta"}),
            },
            ScriptStep::Text("Both files mention beta.".to_string()),
            finish(),
        ],
    );
    let driver = driver(&fx, script);

    let outcome = driver
        .run(AgentMode::Explore, None, "where is beta?", &[])
        .await
        .expect("run succeeds");

    assert_eq!(outcome.text, "Let me look. Both files mention beta.");
    assert_eq!(outcome.finish_reason.as_deref(), Some("stop"));
    assert_eq!(
        outcome.usage.as_ref().map(|u| u.total_tokens),
        Some(120),
        "usage summary recorded"
    );

    // Step 0 carries the lead-in text; step 1 carries the tool round-trip
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[1].step, 1);
    assert_eq!(outcome.steps[1].tool_calls.len(), 1);
    assert_eq!(outcome.steps[1].tool_calls[0].0, "search");
    assert_eq!(outcome.steps[1].tool_results.len(), 1);

    // Sources harvested from the search tool output, one per file
    assert_eq!(outcome.sources.len(), 2, "got {:?}", outcome.sources);
    let mut paths: Vec<&str> = outcome.sources.iter().map(|s| s.filepath.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_quick_answer_returns_text_and_sources() {
    let fx = fixture().await;
    let driver = driver(&fx, ScriptedChatModel::answering("beta appears in both files"));

    let answer = driver
        .quick_answer(None, "beta", &[fx.resource_id])
        .await
        .expect("quick answer");

    assert_eq!(answer.text, "beta appears in both files");
    assert_eq!(answer.sources.len(), 2, "retrieval feeds the sources");
}

#[tokio::test]
async fn test_upstream_error_keeps_partial_results() {
    let fx = fixture().await;
    let script = ScriptedChatModel::new(
        "scripted-model",
        vec![
            ScriptStep::Text("partial ".to_string()),
            ScriptStep::Error("model fell over".to_string()),
        ],
    );
    let driver = driver(&fx, script);

    let failure = driver
        .run(AgentMode::Explore, None, "anything", &[])
        .await
        .expect_err("must fail");

    assert!(failure.error.to_string().contains("model fell over"));
    assert_eq!(failure.partial.text, "partial ", "partial text survives");
}

#[tokio::test]
async fn test_stream_emits_ordered_events_with_one_terminal() {
    let fx = fixture().await;
    let script = ScriptedChatModel::new(
        "scripted-model",
        vec![
            ScriptStep::Text("looking".to_string()),
            ScriptStep::CallTool {
                name: "search".to_string(),
                input: json!({"query": "beta"}),
            },
            ScriptStep::Text("done looking".to_string()),
            finish(),
        ],
    );
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in_hook = Arc::clone(&fired);
    let driver = driver(&fx, script).with_stream_end_hook(Arc::new(move |_| {
        fired_in_hook.fetch_add(1, Ordering::SeqCst);
    }));

    let mut rx = driver.stream_run(AgentMode::Explore, None, "where is beta?", &[]);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(
        matches!(events.first(), Some(StreamEvent::Start { .. })),
        "stream opens with start"
    );
    let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal_count, 1, "exactly one terminal event");
    assert!(
        matches!(events.last(), Some(StreamEvent::Done { .. })),
        "terminal event closes the stream"
    );

    let tool_calls: Vec<&StreamEvent> = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::ToolCall { .. }))
        .collect();
    assert_eq!(tool_calls.len(), 1);
    if let StreamEvent::ToolCall { step, name, .. } = tool_calls[0] {
        assert_eq!(*step, 1, "tool call after text opens step 1");
        assert_eq!(name, "search");
    }

    // Side effect fires exactly once after the terminal event
    let deadline = std::time::Instant::now() + WAIT;
    while fired.load(Ordering::SeqCst) == 0 {
        assert!(std::time::Instant::now() < deadline, "hook never fired");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// Scenario: consumer disconnects after the first tool-call event
#[tokio::test]
async fn test_stream_cancellation_fires_side_effect_once() {
    let fx = fixture().await;
    let script = ScriptedChatModel::new(
        "scripted-model",
        vec![
            ScriptStep::CallTool {
                name: "search".to_string(),
                input: json!({"query": "beta"}),
            },
            // The model would hang forever; cancellation must not wait on it
            ScriptStep::Hang,
        ],
    );
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in_hook = Arc::clone(&fired);
    let driver = driver(&fx, script).with_stream_end_hook(Arc::new(move |_| {
        fired_in_hook.fetch_add(1, Ordering::SeqCst);
    }));

    let mut rx = driver.stream_run(AgentMode::Explore, None, "where is beta?", &[]);

    // Consume until the first tool-call, then hang up
    loop {
        let event = rx.recv().await.expect("events flow before disconnect");
        if matches!(event, StreamEvent::ToolCall { .. }) {
            break;
        }
    }
    drop(rx);

    // The producer notices the disconnect and fires the side effect exactly
    // once
    let deadline = std::time::Instant::now() + WAIT;
    while fired.load(Ordering::SeqCst) == 0 {
        assert!(
            std::time::Instant::now() < deadline,
            "side effect never fired after disconnect"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1, "exactly once");
}

#[tokio::test]
async fn test_quick_stream_emits_sources_before_text() {
    let fx = fixture().await;
    let driver = driver(&fx, ScriptedChatModel::answering("answer"));

    let mut rx = driver.stream_quick(None, "beta", &[fx.resource_id]);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            StreamEvent::Start { .. } => "start",
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::TextDelta { .. } => "text-delta",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Ping => "ping",
            StreamEvent::ToolCall { .. } => "tool-call",
            StreamEvent::ToolResult { .. } => "tool-result",
        })
        .collect();
    assert_eq!(kinds, vec!["start", "sources", "text-delta", "done"]);

    if let StreamEvent::Sources { list } = &events[1] {
        assert_eq!(list.len(), 2, "both files cited");
    }
}

#[tokio::test]
async fn test_async_research_job_completes_with_result() {
    let fx = fixture().await;
    let script = ScriptedChatModel::new(
        "scripted-model",
        vec![
            ScriptStep::CallTool {
                name: "search".to_string(),
                input: json!({"query": "beta"}),
            },
            ScriptStep::Text("research report".to_string()),
            finish(),
        ],
    );
    let runner = ResearchRunner::new(
        driver(&fx, script),
        Arc::new(fx.store.clone()),
        Arc::new(Supervisor::new()),
    );

    let job = runner
        .start(None, "map all beta usages", &[], ResearchOptions::default())
        .await
        .expect("job created");
    assert_eq!(job.status, JobStatus::Queued, "row starts queued");

    let deadline = std::time::Instant::now() + WAIT;
    let finished = loop {
        let current = fx
            .store
            .get_research_job(&job.id)
            .await
            .expect("get")
            .expect("exists");
        if current.status.is_terminal() {
            break current;
        }
        assert!(std::time::Instant::now() < deadline, "research never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    assert_eq!(finished.status, JobStatus::Completed, "error: {:?}", finished.error);
    let result = finished.result.expect("result persisted");
    assert_eq!(result["text"], "research report");
    assert!(result["sources"].as_array().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn test_async_research_failure_is_persisted() {
    let fx = fixture().await;
    let script = ScriptedChatModel::new(
        "scripted-model",
        vec![ScriptStep::Error("provider quota exhausted".to_string())],
    );
    let runner = ResearchRunner::new(
        driver(&fx, script),
        Arc::new(fx.store.clone()),
        Arc::new(Supervisor::new()),
    );

    let job = runner
        .start(None, "anything", &[], ResearchOptions::default())
        .await
        .expect("job created");

    let deadline = std::time::Instant::now() + WAIT;
    let finished = loop {
        let current = fx
            .store
            .get_research_job(&job.id)
            .await
            .expect("get")
            .expect("exists");
        if current.status.is_terminal() {
            break current;
        }
        assert!(std::time::Instant::now() < deadline, "research never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    assert_eq!(finished.status, JobStatus::Failed);
    assert!(
        finished
            .error
            .as_deref()
            .is_some_and(|e| e.contains("provider quota exhausted")),
        "error message persisted: {:?}",
        finished.error
    );
    assert!(finished.completed_at.is_some());
}
