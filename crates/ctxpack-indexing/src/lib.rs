//! Indexing pipeline, job scheduler, and background update checker
//!
//! Sync jobs materialize content; index jobs chunk and embed it. The
//! scheduler guarantees at most one running job per resource with strict
//! FIFO ordering within a resource.

pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod supervisor;
pub mod update_checker;

pub use error::{IndexerError, IndexerResult};
pub use pipeline::{EMBED_BATCH_SIZE, Indexer};
pub use scheduler::{EmbedderResolver, JobOverrides, JobScheduler};
pub use supervisor::Supervisor;
pub use update_checker::UpdateChecker;
