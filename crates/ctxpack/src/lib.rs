//! ctxpack: repository indexing and retrieval core
//!
//! Indexes source-code repositories (remote git or local directories) and
//! answers questions about them by fusing lexical and dense-vector search
//! under an LLM agent loop. This crate assembles the sub-crates into one
//! embeddable core; HTTP routing, authentication, and the CLI live outside.

pub mod bootstrap;
pub mod error;

pub use bootstrap::{App, bootstrap, build_embedder_resolver, build_materializer};
pub use error::{Error, Result};

// Re-export the sub-crate surfaces embedders reach for most
pub use ctxpack_agent::{
    AgentDriver, AgentMode, ChatEvent, ChatModel, ChatRequest, ResearchRunner, StreamEvent,
};
pub use ctxpack_config::ApplicationConfig;
pub use ctxpack_embeddings::{Embedder, EmbedderOverrides};
pub use ctxpack_indexing::{JobOverrides, JobScheduler, UpdateChecker};
pub use ctxpack_search::{SearchRequest, SearchResultItem, SearchService};
pub use ctxpack_store::{
    IndexJob, JobKind, JobStatus, NewResource, ResearchJob, Resource, ResourceKind,
    ResourceScope, SearchMode,
};
