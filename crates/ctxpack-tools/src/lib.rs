//! Resource-scoped tools for ctxpack
//!
//! Direct read/grep/list/glob operations over a resource root, shared by the
//! agent driver and the outer tool surface, plus the ripgrep JSON runner the
//! text-search subsystem builds on.

pub mod error;
pub mod ops;
pub mod ripgrep;

pub use error::{ToolError, ToolResult};
pub use ops::{
    GREP_MATCH_CAP, LIST_FILE_CAP, READ_LINE_CAP, ReadResult, glob_files, grep_files, list_files,
    read_file, resource_root,
};
pub use ripgrep::{GrepMatch, RipgrepOptions, run_ripgrep};
