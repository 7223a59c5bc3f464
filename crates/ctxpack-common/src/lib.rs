//! Common utilities and patterns shared across ctxpack crates
//!
//! This crate provides shared functionality to reduce duplication across
//! the various ctxpack components.

pub mod correlation;
pub mod error;
pub mod init;
pub mod tracing;

pub use correlation::CorrelationId;
pub use error::{CommonError, ErrorContext};
pub use init::{ensure_home_layout, initialize_environment};
pub use tracing::{init_tracing, init_tracing_with_file};
