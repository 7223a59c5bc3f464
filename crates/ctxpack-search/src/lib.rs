//! Hybrid search for ctxpack
//!
//! Combines an on-disk lexical subtrack (keyword extraction, grep, context
//! windows) with a dense-vector subtrack over the chunk store, fused by
//! reciprocal ranks with K=60.

pub mod error;
pub mod fusion;
pub mod keywords;
pub mod service;
pub mod text;
pub mod types;

pub use error::{SearchError, SearchResult, Subtrack};
pub use fusion::fuse;
pub use keywords::{QueryPattern, build_pattern, extract_keywords};
pub use service::SearchService;
pub use text::{SEARCH_EXCLUDE_GLOBS, merge_hits, text_search};
pub use types::{
    MatchSource, MatchType, RRF_K, SearchRequest, SearchResultItem, TextCandidate,
    VectorCandidate,
};
