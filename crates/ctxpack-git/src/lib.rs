//! Repository materialization for ctxpack
//!
//! Shells out to the `git` binary (clone, fetch, checkout, ls-files,
//! ls-remote, rev-parse) with bounded subprocess execution, and walks local
//! directory resources with fixed exclusions.

pub mod command;
pub mod error;
pub mod materializer;
pub mod walker;

pub use command::{run_git, try_git};
pub use error::{GitError, GitResult};
pub use materializer::Materializer;
pub use walker::{EXCLUDED_DIRS, apply_scoped_paths, local_files, validate_local_root};
