//! Shared test utilities for ctxpack integration tests
//!
//! Provides a programmable stub embedder, temp-tree builders, and resource
//! fixtures used across the crate test suites.

#![allow(clippy::unwrap_used)] // Test infrastructure may panic loudly
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use ctxpack_embeddings::{Embedder, EmbeddingError, EmbeddingResult};
use ctxpack_store::{NewResource, ResourceKind, ResourceScope};

/// Programmable embedder for tests
///
/// Deterministic: texts containing a configured needle get that needle's
/// vector; everything else gets the default vector. Whole batches can be
/// made to fail by batch index, and individual texts can be given gaps.
pub struct StubEmbedder {
    dimension: usize,
    default_vector: Vec<f32>,
    needles: Vec<(String, Vec<f32>)>,
    gap_needles: Vec<String>,
    failing_batches: Vec<usize>,
    calls: AtomicUsize,
    embedded_texts: Mutex<Vec<String>>,
}

impl StubEmbedder {
    /// A stub of the given dimension whose default vector is all 0.1
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            default_vector: vec![0.1; dimension],
            needles: Vec::new(),
            gap_needles: Vec::new(),
            failing_batches: Vec::new(),
            calls: AtomicUsize::new(0),
            embedded_texts: Mutex::new(Vec::new()),
        }
    }

    /// Texts containing `needle` embed to `vector`
    #[must_use]
    pub fn with_needle(mut self, needle: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimension, "needle vector dimension");
        self.needles.push((needle.to_string(), vector));
        self
    }

    /// Texts containing `needle` come back as gaps (per-item failure)
    #[must_use]
    pub fn with_gap_for(mut self, needle: &str) -> Self {
        self.gap_needles.push(needle.to_string());
        self
    }

    /// The Nth `embed_many` call (0-based) fails outright
    #[must_use]
    pub fn failing_batch(mut self, index: usize) -> Self {
        self.failing_batches.push(index);
        self
    }

    /// How many `embed_many` calls have been made
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text that has been embedded, in order
    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded_texts.lock().unwrap().clone()
    }

    fn vector_for(&self, text: &str) -> Option<Vec<f32>> {
        if self.gap_needles.iter().any(|n| text.contains(n)) {
            return None;
        }
        for (needle, vector) in &self.needles {
            if text.contains(needle) {
                return Some(vector.clone());
            }
        }
        Some(self.default_vector.clone())
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_many(&self, texts: &[String]) -> EmbeddingResult<Vec<Option<Vec<f32>>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_batches.contains(&call) {
            return Err(EmbeddingError::Upstream {
                status: 500,
                message: format!("stub failure for batch {call}"),
            });
        }
        self.embedded_texts
            .lock()
            .unwrap()
            .extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "stub-embedder"
    }
}

/// Write a file tree into a fresh temp directory
///
/// # Panics
///
/// Panics on any filesystem failure.
pub fn temp_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (rel, content) in files {
        write_file(dir.path(), rel, content);
    }
    dir
}

/// Write one file under a root, creating parents
///
/// # Panics
///
/// Panics on any filesystem failure.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, content).expect("write file");
}

/// Poll a mock store until a job reaches a terminal status
///
/// # Panics
///
/// Panics when the job does not terminate within the timeout, or when the
/// job row disappears.
pub async fn wait_job_terminal(
    store: &ctxpack_store::MockStore,
    job_id: &uuid::Uuid,
    timeout: std::time::Duration,
) -> ctxpack_store::IndexJob {
    use ctxpack_store::ResourceRepository;

    let deadline = std::time::Instant::now() + timeout;
    loop {
        let job = store
            .get_job(job_id)
            .await
            .expect("job query")
            .expect("job exists");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "job {job_id} did not terminate within {timeout:?}"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

/// A project-scoped local resource input
pub fn local_resource(name: &str, path: &str) -> NewResource {
    NewResource {
        owner_id: None,
        name: name.to_string(),
        scope: ResourceScope::Project,
        project_key: "/p".to_string(),
        kind: ResourceKind::Local,
        url: None,
        path: Some(path.to_string()),
        branch: None,
        commit: None,
        scoped_paths: None,
        notes: None,
    }
}

/// A global git resource input
pub fn git_resource(name: &str, url: &str, branch: Option<&str>) -> NewResource {
    NewResource {
        owner_id: None,
        name: name.to_string(),
        scope: ResourceScope::Global,
        project_key: String::new(),
        kind: ResourceKind::Git,
        url: Some(url.to_string()),
        path: None,
        branch: branch.map(ToString::to_string),
        commit: None,
        scoped_paths: None,
        notes: None,
    }
}
