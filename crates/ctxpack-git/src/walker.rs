//! Local directory walking with fixed exclusions

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{GitError, GitResult};

/// Directory names skipped at any depth
pub const EXCLUDED_DIRS: &[&str] = &[".git", "node_modules", "dist", "build", ".next", "coverage"];

/// Validate that a local resource's configured path exists
///
/// # Errors
///
/// Returns `GitError::PathMissing` when the path is absent or not a
/// directory.
pub fn validate_local_root(path: &str) -> GitResult<PathBuf> {
    let root = PathBuf::from(path);
    if root.is_dir() {
        Ok(root)
    } else {
        Err(GitError::PathMissing {
            path: path.to_string(),
        })
    }
}

/// Enumerate files under a local root, skipping the excluded directories
///
/// Paths come back POSIX-normalized, relative to the root, sorted for
/// determinism, and filtered by the resource's scoped sub-paths when given.
///
/// # Errors
///
/// Returns `GitError::PathMissing` when the root does not exist.
pub fn local_files(root: &Path, scoped_paths: Option<&[String]>) -> GitResult<Vec<String>> {
    if !root.is_dir() {
        return Err(GitError::PathMissing {
            path: root.to_string_lossy().into_owned(),
        });
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !EXCLUDED_DIRS.contains(&name))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    files.sort();

    Ok(apply_scoped_paths(files, scoped_paths))
}

/// Keep only files under one of the scoped sub-paths (order-preserving)
///
/// With no scoped paths (or an empty list) the input passes through.
pub fn apply_scoped_paths(files: Vec<String>, scoped_paths: Option<&[String]>) -> Vec<String> {
    let Some(scoped) = scoped_paths.filter(|s| !s.is_empty()) else {
        return files;
    };

    files
        .into_iter()
        .filter(|file| {
            scoped.iter().any(|prefix| {
                let prefix = prefix.trim_end_matches('/');
                file == prefix || file.starts_with(&format!("{prefix}/"))
            })
        })
        .collect()
}
