//! Search request and result types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ctxpack_store::SearchMode;

/// Reciprocal-rank fusion constant
pub const RRF_K: f64 = 60.0;

/// A hybrid search request, before clamping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Empty list means "all resources the caller can see"
    #[serde(default)]
    pub resource_ids: Vec<Uuid>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_alpha() -> f64 {
    0.5
}

const fn default_top_k() -> usize {
    10
}

impl SearchRequest {
    /// A plain query over all visible resources with defaults
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            resource_ids: Vec::new(),
            mode: SearchMode::Hybrid,
            alpha: default_alpha(),
            top_k: default_top_k(),
        }
    }

    /// Clamp knobs into their valid ranges: `top_k` to [1, `max_top_k`],
    /// alpha to [0, 1] with NaN mapping to 0.5
    pub fn clamped(mut self, max_top_k: usize) -> Self {
        self.top_k = self.top_k.clamp(1, max_top_k);
        if self.alpha.is_nan() {
            self.alpha = 0.5;
        } else {
            self.alpha = self.alpha.clamp(0.0, 1.0);
        }
        self
    }
}

/// Which channels produced a result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Text,
    Vector,
}

/// How a result matched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Hybrid,
    Text,
    Vector,
}

/// A fused search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Present for vector hits; text windows have no chunk identity
    pub chunk_id: Option<Uuid>,
    pub resource_id: Uuid,
    pub resource_name: String,
    pub filepath: String,
    /// 1-based inclusive
    pub line_start: i32,
    pub line_end: i32,
    pub text: String,
    pub score: f64,
    pub match_type: MatchType,
    pub match_sources: Vec<MatchSource>,
}

/// A candidate from the lexical subtrack, pre-fusion
#[derive(Debug, Clone)]
pub struct TextCandidate {
    pub resource_id: Uuid,
    pub resource_name: String,
    pub filepath: String,
    pub line_start: i32,
    pub line_end: i32,
    pub text: String,
    /// `1/(K+rank) + min(hits,5) * 0.0005`
    pub score: f64,
}

/// A candidate from the vector subtrack, pre-fusion
#[derive(Debug, Clone)]
pub struct VectorCandidate {
    pub chunk_id: Uuid,
    pub resource_id: Uuid,
    pub resource_name: String,
    pub filepath: String,
    pub line_start: i32,
    pub line_end: i32,
    pub text: String,
    /// `1 - cosine_distance`
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        let request = SearchRequest {
            query: "q".to_string(),
            resource_ids: vec![],
            mode: SearchMode::Hybrid,
            alpha: 1.7,
            top_k: 99,
        }
        .clamped(50);
        assert_eq!(request.top_k, 50);
        assert!((request.alpha - 1.0).abs() < f64::EPSILON);

        let request = SearchRequest {
            query: "q".to_string(),
            resource_ids: vec![],
            mode: SearchMode::Hybrid,
            alpha: f64::NAN,
            top_k: 0,
        }
        .clamped(50);
        assert_eq!(request.top_k, 1);
        assert!((request.alpha - 0.5).abs() < f64::EPSILON, "NaN maps to 0.5");
    }
}
