//! OpenAI-compatible HTTP embedding provider

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::Embedder;
use ctxpack_config::EmbeddingConfig;

/// Per-request provider overrides; unset fields fall back to the process
/// defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedderOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Provider speaking the `/embeddings` JSON shape over HTTP
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Build from process defaults plus optional per-request overrides
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::Transient` when the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: &EmbeddingConfig,
        overrides: Option<&EmbedderOverrides>,
    ) -> EmbeddingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EmbeddingError::Transient {
                message: format!("building http client: {e}"),
            })?;

        let pick = |field: Option<&String>, default: &Option<String>| {
            field.cloned().or_else(|| default.clone())
        };

        Ok(Self {
            client,
            base_url: overrides
                .and_then(|o| o.base_url.clone())
                .unwrap_or_else(|| config.base_url.clone())
                .trim_end_matches('/')
                .to_string(),
            api_key: pick(
                overrides.and_then(|o| o.api_key.as_ref()),
                &config.api_key,
            ),
            model: overrides
                .and_then(|o| o.model.clone())
                .unwrap_or_else(|| config.model.clone()),
            dimension: config.dimensions,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[tracing::instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model))]
    async fn embed_many(&self, texts: &[String]) -> EmbeddingResult<Vec<Option<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&json!({ "model": self.model, "input": texts }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| EmbeddingError::Transient {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingsResponse =
            response.json().await.map_err(|e| EmbeddingError::Decode {
                message: e.to_string(),
            })?;

        // Fill by index; anything the provider skipped stays None and turns
        // into an embed-stage warning upstream
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for datum in body.data {
            if datum.embedding.len() != self.dimension {
                return Err(EmbeddingError::Dimension {
                    expected: self.dimension,
                    actual: datum.embedding.len(),
                });
            }
            if let Some(slot) = vectors.get_mut(datum.index) {
                *slot = Some(datum.embedding);
            }
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, dimensions: usize) -> EmbeddingConfig {
        let mut config = EmbeddingConfig::from_env();
        config.base_url = base_url.to_string();
        config.dimensions = dimensions;
        config.model = "test-embedder".to_string();
        config
    }

    #[tokio::test]
    async fn test_embed_many_maps_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] },
                ]
            })))
            .mount(&server)
            .await;

        let embedder =
            HttpEmbedder::new(&config(&server.uri(), 2), None).expect("client builds");
        let vectors = embedder
            .embed_many(&["alpha".to_string(), "beta".to_string()])
            .await
            .expect("success");

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], Some(vec![1.0, 0.0]), "out-of-order data lands by index");
        assert_eq!(vectors[1], Some(vec![0.0, 1.0]));
    }

    #[tokio::test]
    async fn test_missing_entry_becomes_gap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [ { "index": 0, "embedding": [1.0, 0.0] } ]
            })))
            .mount(&server)
            .await;

        let embedder =
            HttpEmbedder::new(&config(&server.uri(), 2), None).expect("client builds");
        let vectors = embedder
            .embed_many(&["alpha".to_string(), "beta".to_string()])
            .await
            .expect("success");

        assert_eq!(vectors[0], Some(vec![1.0, 0.0]));
        assert_eq!(vectors[1], None, "provider gap propagates as None");
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let embedder =
            HttpEmbedder::new(&config(&server.uri(), 2), None).expect("client builds");
        let err = embedder
            .embed_many(&["alpha".to_string()])
            .await
            .expect_err("must fail");

        match err {
            EmbeddingError::Upstream { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [ { "index": 0, "embedding": [1.0, 0.0, 0.5] } ]
            })))
            .mount(&server)
            .await;

        let embedder =
            HttpEmbedder::new(&config(&server.uri(), 2), None).expect("client builds");
        let err = embedder
            .embed_many(&["alpha".to_string()])
            .await
            .expect_err("must fail");
        assert!(matches!(err, EmbeddingError::Dimension { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn test_overrides_take_precedence() {
        let config = config("http://default.invalid", 4);
        let overrides = EmbedderOverrides {
            base_url: Some("http://override.invalid/v1/".to_string()),
            api_key: Some("override-key".to_string()),
            model: Some("override-model".to_string()),
        };
        let embedder = HttpEmbedder::new(&config, Some(&overrides)).expect("client builds");
        assert_eq!(embedder.model_name(), "override-model");
        assert_eq!(embedder.base_url, "http://override.invalid/v1");
    }
}
