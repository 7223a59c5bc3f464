//! End-to-end pipeline tests over the mock store
//!
//! Jobs run through the real scheduler so status transitions, progress, and
//! warnings land the way callers observe them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ctxpack_chunking::Chunker;
use ctxpack_config::IndexingConfig;
use ctxpack_git::Materializer;
use ctxpack_indexing::{Indexer, JobScheduler};
use ctxpack_store::{
    ContentStatus, JobKind, JobStatus, MockStore, Resource, ResourceRepository, VectorStatus,
    WarningStage,
};
use ctxpack_test_utils::{StubEmbedder, local_resource, temp_tree, wait_job_terminal, write_file};

const WAIT: Duration = Duration::from_secs(20);

fn scheduler(store: &MockStore, embedder: StubEmbedder, repos_root: &Path) -> JobScheduler {
    let materializer = Materializer::new(
        repos_root.to_path_buf(),
        Duration::from_secs(60),
        Duration::from_secs(30),
    );
    let indexer = Indexer::new(
        Arc::new(store.clone()),
        materializer,
        Chunker::default(),
        IndexingConfig::from_env(),
    );
    JobScheduler::with_fixed_embedder(Arc::new(store.clone()), indexer, Arc::new(embedder))
}

/// Enqueue and run one job to a terminal state
async fn run_job(
    store: &MockStore,
    scheduler: &JobScheduler,
    resource: &Resource,
    kind: JobKind,
) -> ctxpack_store::IndexJob {
    let job = store.create_job(&resource.id, kind).await.expect("enqueue");
    scheduler.ensure(resource.id, None);
    wait_job_terminal(store, &job.id, WAIT).await
}

#[tokio::test]
async fn test_sync_then_index_local_resource() {
    let tree = temp_tree(&[("a.txt", "alpha\nbeta\n"), ("b.txt", "beta\ngamma\n")]);
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let embedder = StubEmbedder::new(2).with_needle("beta", vec![1.0, 1.0]);
    let scheduler = scheduler(&store, embedder, repos.path());

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");

    let sync = run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    assert_eq!(sync.status, JobStatus::Completed);
    assert_eq!(sync.progress, 100);
    assert_eq!(sync.total_files, 2);

    let after_sync = store
        .get_resource(&resource.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(after_sync.content_status, ContentStatus::Ready);
    assert!(after_sync.last_synced_at.is_some());

    let index = run_job(&store, &scheduler, &resource, JobKind::Index).await;
    assert_eq!(index.status, JobStatus::Completed);
    assert_eq!(index.progress, 100);
    assert!(index.warnings.is_empty(), "clean tree produces no warnings");

    let after_index = store
        .get_resource(&resource.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(after_index.vector_status, VectorStatus::Ready);
    assert_eq!(after_index.chunk_count, 2, "one chunk per small file");
    assert!(after_index.last_indexed_at.is_some());
    assert_eq!(store.chunk_count(&resource.id), 2);
}

/// Scenario: single local resource, hybrid query through the search service
#[tokio::test]
async fn test_indexed_resource_answers_hybrid_query() {
    use ctxpack_search::{MatchType, SearchRequest, SearchService};
    use ctxpack_store::SearchMode;

    let tree = temp_tree(&[("a.txt", "alpha\nbeta\n"), ("b.txt", "beta\ngamma\n")]);
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(
        &store,
        StubEmbedder::new(2).with_needle("beta", vec![1.0, 1.0]),
        repos.path(),
    );

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");
    run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    run_job(&store, &scheduler, &resource, JobKind::Index).await;

    let service = SearchService::new(
        Arc::new(store.clone()),
        Arc::new(StubEmbedder::new(2).with_needle("beta", vec![1.0, 1.0])),
        repos.path().to_path_buf(),
        ctxpack_config::SearchConfig::from_env(),
    );

    let request = SearchRequest {
        query: "beta".to_string(),
        resource_ids: vec![],
        mode: SearchMode::Hybrid,
        alpha: 0.5,
        top_k: 5,
    };
    let first = service.search(None, request.clone()).await.expect("search");

    assert_eq!(first.len(), 2, "both files answer");
    let mut paths: Vec<&str> = first.iter().map(|r| r.filepath.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["a.txt", "b.txt"]);
    assert!(first.iter().any(|r| r.match_type == MatchType::Hybrid));
    assert!(first.iter().all(|r| r.score > 0.0));

    let second = service.search(None, request).await.expect("repeat");
    assert_eq!(
        first.iter().map(|r| &r.filepath).collect::<Vec<_>>(),
        second.iter().map(|r| &r.filepath).collect::<Vec<_>>(),
        "order stable across runs"
    );
}

#[tokio::test]
async fn test_oversized_file_warns_and_produces_no_chunks() {
    let tree = temp_tree(&[("ok.txt", "alpha\n")]);
    write_file(tree.path(), "huge.txt", &"x".repeat(1024 * 1024 + 1));
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(&store, StubEmbedder::new(2), repos.path());

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");
    run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    let index = run_job(&store, &scheduler, &resource, JobKind::Index).await;

    assert_eq!(index.status, JobStatus::Completed);
    let read_warnings: Vec<_> = index
        .warnings
        .iter()
        .filter(|w| w.stage == WarningStage::Read)
        .collect();
    assert_eq!(read_warnings.len(), 1, "exactly one read warning");
    assert_eq!(read_warnings[0].filepath, "huge.txt");

    let chunks = store
        .chunks_for_file(&resource.id, "huge.txt")
        .await
        .expect("query");
    assert!(chunks.is_empty(), "no chunks for the oversized file");
    assert_eq!(store.chunk_count(&resource.id), 1, "only ok.txt chunked");
}

#[tokio::test]
async fn test_binary_file_warns_and_produces_no_chunks() {
    let tree = temp_tree(&[("ok.txt", "alpha\n")]);
    std::fs::write(tree.path().join("blob.bin"), b"abc\0def").expect("write binary");
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(&store, StubEmbedder::new(2), repos.path());

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");
    run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    let index = run_job(&store, &scheduler, &resource, JobKind::Index).await;

    assert_eq!(index.status, JobStatus::Completed);
    let binary_warnings: Vec<_> = index
        .warnings
        .iter()
        .filter(|w| w.stage == WarningStage::Read && w.message.contains("binary"))
        .collect();
    assert_eq!(binary_warnings.len(), 1);
    assert_eq!(binary_warnings[0].filepath, "blob.bin");
    assert_eq!(store.chunk_count(&resource.id), 1);
}

#[tokio::test]
async fn test_zero_files_completes_cleanly_and_clears_chunks() {
    let tree = tempfile::tempdir().expect("empty tree");
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(&store, StubEmbedder::new(2), repos.path());

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");

    // Pre-existing chunks from an earlier index must not survive
    store
        .replace_chunks(
            &resource.id,
            vec![ctxpack_store::NewChunk {
                filepath: "stale.txt".to_string(),
                line_start: 1,
                line_end: 1,
                text: "stale".to_string(),
                contextualized_text: "stale".to_string(),
                scope: None,
                entities: vec![],
                language: None,
                embedding: None,
            }],
        )
        .await
        .expect("seed stale chunk");

    run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    let index = run_job(&store, &scheduler, &resource, JobKind::Index).await;

    assert_eq!(index.status, JobStatus::Completed);
    assert_eq!(index.total_files, 0);

    let after = store
        .get_resource(&resource.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(after.vector_status, VectorStatus::Ready);
    assert_eq!(after.chunk_count, 0);
    assert_eq!(store.chunk_count(&resource.id), 0, "stale chunks deleted");
}

/// Scenario: embedder fails deterministically for batch index 1 out of
/// 250 chunks
#[tokio::test]
async fn test_embedder_partial_failure_keeps_job_green() {
    let tree = tempfile::tempdir().expect("tree");
    for i in 0..250 {
        write_file(
            tree.path(),
            &format!("notes/file_{i:03}.txt"),
            &format!("note number {i}\n"),
        );
    }
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(&store, StubEmbedder::new(2).failing_batch(1), repos.path());

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");
    run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    let index = run_job(&store, &scheduler, &resource, JobKind::Index).await;

    assert_eq!(index.status, JobStatus::Completed, "partial failure stays green");

    let embed_warnings: Vec<_> = index
        .warnings
        .iter()
        .filter(|w| w.stage == WarningStage::Embed)
        .collect();
    assert_eq!(embed_warnings.len(), 1, "one warning for the failed batch");
    assert!(embed_warnings[0].message.contains("batch 1"));

    let chunks = store.chunks.lock().expect("chunks lock");
    let mine: Vec<_> = chunks
        .iter()
        .filter(|c| c.resource_id == resource.id)
        .collect();
    assert_eq!(mine.len(), 250, "every chunk persisted");
    let without_vectors = mine.iter().filter(|c| c.embedding.is_none()).count();
    assert_eq!(without_vectors, 100, "exactly the failed batch lacks vectors");
    drop(chunks);

    let after = store
        .get_resource(&resource.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(after.vector_status, VectorStatus::Ready);
    assert_eq!(after.chunk_count, 250);
}

#[tokio::test]
async fn test_reindex_unchanged_resource_is_idempotent() {
    let tree = temp_tree(&[("a.txt", "alpha\nbeta\n"), ("b.txt", "beta\ngamma\n")]);
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(&store, StubEmbedder::new(2), repos.path());

    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create");
    run_job(&store, &scheduler, &resource, JobKind::Sync).await;
    run_job(&store, &scheduler, &resource, JobKind::Index).await;

    let first_hashes: Vec<String> = {
        let chunks = store.chunks.lock().expect("lock");
        let mut hashes: Vec<String> = chunks.iter().map(|c| c.hash.clone()).collect();
        hashes.sort();
        hashes
    };

    run_job(&store, &scheduler, &resource, JobKind::Index).await;
    let second_hashes: Vec<String> = {
        let chunks = store.chunks.lock().expect("lock");
        let mut hashes: Vec<String> = chunks.iter().map(|c| c.hash.clone()).collect();
        hashes.sort();
        hashes
    };

    assert_eq!(first_hashes, second_hashes, "same content, same hashes");
    assert_eq!(store.chunk_count(&resource.id), 2);
}

#[tokio::test]
async fn test_sync_failure_marks_content_failed() {
    let repos = tempfile::tempdir().expect("repos root");
    let store = MockStore::new();
    let scheduler = scheduler(&store, StubEmbedder::new(2), repos.path());

    let resource = store
        .create_resource(local_resource("demo", "/definitely/not/a/path"))
        .await
        .expect("create");
    let sync = run_job(&store, &scheduler, &resource, JobKind::Sync).await;

    assert_eq!(sync.status, JobStatus::Failed);
    assert!(sync.error.is_some());
    assert_eq!(sync.progress, 100, "terminal rows close at 100");

    let after = store
        .get_resource(&resource.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(after.content_status, ContentStatus::Failed);
    assert!(after.content_error.is_some());
}
