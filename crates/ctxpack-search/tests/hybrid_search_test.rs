//! Integration tests for the hybrid search service over the mock store
//!
//! The lexical subtrack shells out to ripgrep, which is a declared runtime
//! dependency of the system.

use std::sync::Arc;

use ctxpack_config::SearchConfig;
use ctxpack_search::{MatchType, SearchRequest, SearchService};
use ctxpack_store::{
    ContentStatus, MockStore, NewChunk, ResourceRepository, SearchMode, VectorStatus,
};
use ctxpack_test_utils::{StubEmbedder, local_resource, temp_tree};

fn chunk(filepath: &str, text: &str, embedding: Option<Vec<f32>>) -> NewChunk {
    NewChunk {
        filepath: filepath.to_string(),
        line_start: 1,
        line_end: 2,
        text: text.to_string(),
        contextualized_text: format!("// file: {filepath}\n{text}"),
        scope: None,
        entities: vec![],
        language: None,
        embedding,
    }
}

/// Two-file tree, chunks embedded, both statuses ready
async fn ready_fixture() -> (tempfile::TempDir, MockStore, uuid::Uuid) {
    let tree = temp_tree(&[("a.txt", "alpha\nbeta\n"), ("b.txt", "beta\ngamma\n")]);
    let store = MockStore::new();
    let resource = store
        .create_resource(local_resource("demo", &tree.path().to_string_lossy()))
        .await
        .expect("create resource");

    store
        .replace_chunks(
            &resource.id,
            vec![
                chunk("a.txt", "alpha\nbeta", Some(vec![1.0, 1.0])),
                chunk("b.txt", "beta\ngamma", Some(vec![1.0, 1.0])),
            ],
        )
        .await
        .expect("insert chunks");
    store
        .set_content_status(&resource.id, ContentStatus::Ready, None)
        .await
        .expect("content ready");
    store
        .set_vector_status(&resource.id, VectorStatus::Ready, None)
        .await
        .expect("vector ready");

    (tree, store, resource.id)
}

fn service(store: MockStore, embedder: StubEmbedder) -> SearchService {
    SearchService::new(
        Arc::new(store),
        Arc::new(embedder),
        std::path::PathBuf::from("/nonexistent-repos-root"),
        SearchConfig::from_env(),
    )
}

#[tokio::test]
async fn test_hybrid_query_over_local_resource() {
    let (_tree, store, _id) = ready_fixture().await;
    let embedder = StubEmbedder::new(2).with_needle("beta", vec![1.0, 1.0]);
    let service = service(store, embedder);

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
    assert!(
        first.iter().any(|r| r.match_type == MatchType::Hybrid),
        "at least one result fused from both channels"
    );
    assert!(first.iter().all(|r| r.score > 0.0), "scores strictly positive");

    // Stable across repeat runs
    let second = service.search(None, request).await.expect("repeat search");
    let order_first: Vec<&str> = first.iter().map(|r| r.filepath.as_str()).collect();
    let order_second: Vec<&str> = second.iter().map(|r| r.filepath.as_str()).collect();
    assert_eq!(order_first, order_second, "result order is stable");
}

#[tokio::test]
async fn test_empty_query_short_circuits_without_store_calls() {
    let store = MockStore::new();
    // Any store call would fail; an empty query must never reach it
    store.fail_next("store must not be touched");

    let service = service(store, StubEmbedder::new(2));
    let results = service
        .search(None, SearchRequest::query("   "))
        .await
        .expect("empty query is an empty result");
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_text_mode_returns_text_results_only() {
    let (_tree, store, _id) = ready_fixture().await;
    let service = service(store, StubEmbedder::new(2));

    let request = SearchRequest {
        query: "beta".to_string(),
        resource_ids: vec![],
        mode: SearchMode::Text,
        alpha: 0.5,
        top_k: 5,
    };
    let results = service.search(None, request).await.expect("search");

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.match_type == MatchType::Text));
    assert!(results.iter().all(|r| r.chunk_id.is_none()));
}

#[tokio::test]
async fn test_vector_mode_failure_propagates() {
    let (_tree, store, _id) = ready_fixture().await;
    // First embed_many call (the query embedding) fails
    let embedder = StubEmbedder::new(2).failing_batch(0);
    let service = service(store, embedder);

    let request = SearchRequest {
        query: "beta".to_string(),
        resource_ids: vec![],
        mode: SearchMode::Vector,
        alpha: 0.5,
        top_k: 5,
    };
    let err = service.search(None, request).await.expect_err("must fail");
    let message = err.to_string();
    assert!(message.contains("stub failure"), "got {message}");
}

#[tokio::test]
async fn test_hybrid_tolerates_vector_failure_when_text_answers() {
    let (_tree, store, _id) = ready_fixture().await;
    let embedder = StubEmbedder::new(2).failing_batch(0);
    let service = service(store, embedder);

    let request = SearchRequest {
        query: "beta".to_string(),
        resource_ids: vec![],
        mode: SearchMode::Hybrid,
        alpha: 0.5,
        top_k: 5,
    };
    let results = service.search(None, request).await.expect("text side answers");
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.match_type == MatchType::Text));
}

#[tokio::test]
async fn test_scoped_resource_filter_applies() {
    let (_tree, store, id) = ready_fixture().await;
    let other_id = uuid::Uuid::new_v4();
    let embedder = StubEmbedder::new(2).with_needle("beta", vec![1.0, 1.0]);
    let service = service(store, embedder);

    // Scope to a nonexistent resource: nothing visible, nothing found
    let request = SearchRequest {
        query: "beta".to_string(),
        resource_ids: vec![other_id],
        mode: SearchMode::Hybrid,
        alpha: 0.5,
        top_k: 5,
    };
    let results = service.search(None, request).await.expect("search");
    assert!(results.is_empty());

    // Scope to the real resource: results return
    let request = SearchRequest {
        query: "beta".to_string(),
        resource_ids: vec![id],
        mode: SearchMode::Hybrid,
        alpha: 0.5,
        top_k: 5,
    };
    let results = service.search(None, request).await.expect("search");
    assert_eq!(results.len(), 2);
}
