//! Hybrid search service
//!
//! Runs the lexical and vector subtracks concurrently under independent
//! deadlines and fuses their ranked candidates.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{SearchError, SearchResult, Subtrack};
use crate::fusion::fuse;
use crate::text::text_search;
use crate::types::{
    MatchSource, MatchType, SearchRequest, SearchResultItem, TextCandidate, VectorCandidate,
};
use ctxpack_common::CorrelationId;
use ctxpack_config::SearchConfig;
use ctxpack_embeddings::Embedder;
use ctxpack_store::{ContentStatus, Resource, ResourceRepository, SearchMode, VectorStatus};

/// Vector candidate overfetch factor ahead of fusion
const VECTOR_OVERFETCH: usize = 4;

/// Search service over the resource store and an embedder
pub struct SearchService {
    store: Arc<dyn ResourceRepository>,
    embedder: Arc<dyn Embedder>,
    repos_root: PathBuf,
    config: SearchConfig,
}

impl SearchService {
    /// Create a search service
    pub fn new(
        store: Arc<dyn ResourceRepository>,
        embedder: Arc<dyn Embedder>,
        repos_root: PathBuf,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            repos_root,
            config,
        }
    }

    /// Run a search for a caller
    ///
    /// An empty (post-trim) query short-circuits to an empty result without
    /// touching either subtrack. Knobs are clamped (`top_k` to [1,50], alpha
    /// to [0,1], NaN alpha to 0.5).
    ///
    /// # Errors
    ///
    /// Subtrack failures propagate only when the requested mode forces the
    /// failing subtrack, or when the surviving subtrack has nothing to
    /// answer with.
    #[tracing::instrument(
        skip(self, request),
        fields(mode = %request.mode, top_k = request.top_k, correlation_id)
    )]
    pub async fn search(
        &self,
        owner_id: Option<&str>,
        request: SearchRequest,
    ) -> SearchResult<Vec<SearchResultItem>> {
        let correlation_id = CorrelationId::new();
        tracing::Span::current().record("correlation_id", correlation_id.to_string());

        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let request = request.clamped(self.config.max_top_k);

        let resources = self.scope_resources(owner_id, &request.resource_ids).await?;

        match request.mode {
            SearchMode::Text => {
                let mut candidates = self.timed_text(&resources, &query).await?;
                candidates.truncate(request.top_k);
                Ok(candidates.into_iter().map(text_item).collect())
            }
            SearchMode::Vector => {
                let mut candidates = self
                    .timed_vector(&resources, &query, request.top_k)
                    .await?;
                candidates.truncate(request.top_k);
                Ok(candidates.into_iter().map(vector_item).collect())
            }
            SearchMode::Hybrid => {
                let (text_outcome, vector_outcome) = tokio::join!(
                    self.timed_text(&resources, &query),
                    self.timed_vector(&resources, &query, request.top_k),
                );

                match (text_outcome, vector_outcome) {
                    (Ok(text), Ok(vector)) => {
                        Ok(fuse(&text, &vector, request.alpha, request.top_k))
                    }
                    (Ok(text), Err(e)) if !text.is_empty() => {
                        tracing::warn!(error = %e, "vector subtrack failed, serving text results");
                        Ok(fuse(&text, &[], request.alpha, request.top_k))
                    }
                    (Err(e), Ok(vector)) if !vector.is_empty() => {
                        tracing::warn!(error = %e, "text subtrack failed, serving vector results");
                        Ok(fuse(&[], &vector, request.alpha, request.top_k))
                    }
                    (Err(e), _) | (Ok(_), Err(e)) => Err(e),
                }
            }
        }
    }

    /// Resolve the resource scope: an explicit id list, or everything the
    /// caller can see
    async fn scope_resources(
        &self,
        owner_id: Option<&str>,
        resource_ids: &[Uuid],
    ) -> SearchResult<Vec<Resource>> {
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

    async fn timed_text(
        &self,
        resources: &[Resource],
        query: &str,
    ) -> SearchResult<Vec<TextCandidate>> {
        let ready: Vec<Resource> = resources
            .iter()
            .filter(|r| r.content_status == ContentStatus::Ready)
            .cloned()
            .collect();

        let timeout = self.config.subtrack_timeout();
        tokio::time::timeout(
            timeout,
            text_search(
                &ready,
                query,
                &self.repos_root,
                self.config.max_hits_per_resource,
                timeout,
            ),
        )
        .await
        .map_err(|_| SearchError::Timeout {
            subtrack: Subtrack::Text,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })?
    }

    async fn timed_vector(
        &self,
        resources: &[Resource],
        query: &str,
        top_k: usize,
    ) -> SearchResult<Vec<VectorCandidate>> {
        let timeout = self.config.subtrack_timeout();
        tokio::time::timeout(timeout, self.vector_subtrack(resources, query, top_k))
            .await
            .map_err(|_| SearchError::Timeout {
                subtrack: Subtrack::Vector,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    /// Embed the query once and pull nearest neighbours across the ready
    /// resources
    async fn vector_subtrack(
        &self,
        resources: &[Resource],
        query: &str,
        top_k: usize,
    ) -> SearchResult<Vec<VectorCandidate>> {
        let ready: Vec<&Resource> = resources
            .iter()
            .filter(|r| r.vector_status == VectorStatus::Ready)
            .collect();
        if ready.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(query).await?;
        let ids: Vec<Uuid> = ready.iter().map(|r| r.id).collect();
        let limit = top_k.saturating_mul(VECTOR_OVERFETCH);

        let hits = self.store.vector_search(&ids, &embedding, limit).await?;

        let name_of = |id: &Uuid| {
            ready
                .iter()
                .find(|r| r.id == *id)
                .map_or_else(String::new, |r| r.name.clone())
        };

        Ok(hits
            .into_iter()
            .map(|hit| VectorCandidate {
                chunk_id: hit.chunk.id,
                resource_id: hit.chunk.resource_id,
                resource_name: name_of(&hit.chunk.resource_id),
                filepath: hit.chunk.filepath,
                line_start: hit.chunk.line_start,
                line_end: hit.chunk.line_end,
                text: hit.chunk.text,
                score: f64::from(1.0 - hit.distance),
            })
            .collect())
    }
}

fn text_item(candidate: TextCandidate) -> SearchResultItem {
    SearchResultItem {
        chunk_id: None,
        resource_id: candidate.resource_id,
        resource_name: candidate.resource_name,
        filepath: candidate.filepath,
        line_start: candidate.line_start,
        line_end: candidate.line_end,
        text: candidate.text,
        score: candidate.score,
        match_type: MatchType::Text,
        match_sources: vec![MatchSource::Text],
    }
}

fn vector_item(candidate: VectorCandidate) -> SearchResultItem {
    SearchResultItem {
        chunk_id: Some(candidate.chunk_id),
        resource_id: candidate.resource_id,
        resource_name: candidate.resource_name,
        filepath: candidate.filepath,
        line_start: candidate.line_start,
        line_end: candidate.line_end,
        text: candidate.text,
        score: candidate.score,
        match_type: MatchType::Vector,
        match_sources: vec![MatchSource::Vector],
    }
}
