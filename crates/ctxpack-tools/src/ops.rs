//! Resource-scoped tool operations: read, grep, list, glob
//!
//! The same four operations back both the agent's tool set and the outer
//! tool surface. All paths are resolved against a resource root and may not
//! escape it.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use globset::GlobBuilder;

use crate::error::{ToolError, ToolResult};
use crate::ripgrep::{GrepMatch, RipgrepOptions, run_ripgrep};
use ctxpack_git::local_files;
use ctxpack_store::{Resource, ResourceKind};

/// Line cap for `read`
pub const READ_LINE_CAP: usize = 500;
/// Match cap for `grep`
pub const GREP_MATCH_CAP: usize = 100;
/// File cap for `list` and `glob`
pub const LIST_FILE_CAP: usize = 500;

/// Resolve the on-disk root of a resource
///
/// Git resources live under `<repos_root>/<resource-id>`; local resources
/// use their configured path.
///
/// # Errors
///
/// Returns `ToolError::NotFound` when the root does not exist on disk.
pub fn resource_root(resource: &Resource, repos_root: &Path) -> ToolResult<PathBuf> {
    let root = match resource.kind {
        ResourceKind::Git => repos_root.join(resource.id.to_string()),
        ResourceKind::Local => PathBuf::from(resource.path.clone().unwrap_or_default()),
    };
    if root.is_dir() {
        Ok(root)
    } else {
        Err(ToolError::NotFound {
            what: format!("resource root {}", root.display()),
        })
    }
}

/// Join a relative POSIX path onto a root, rejecting escapes
fn safe_join(root: &Path, relative: &str) -> ToolResult<PathBuf> {
    let candidate = Path::new(relative);
    if candidate.is_absolute()
        || candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ToolError::Validation {
            message: format!("path escapes the resource root: {relative}"),
        });
    }
    Ok(root.join(candidate))
}

/// Result of a `read` call
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReadResult {
    pub filepath: String,
    /// 1-based inclusive range actually returned
    pub line_start: usize,
    pub line_end: usize,
    pub total_lines: usize,
    pub text: String,
    /// True when the line cap cut the requested range short
    pub truncated: bool,
}

/// Read a file, optionally restricted to a 1-based inclusive line range,
/// returning at most [`READ_LINE_CAP`] lines
///
/// # Errors
///
/// - `ToolError::NotFound` when the file is absent
/// - `ToolError::Validation` on an inverted range or an escaping path
pub async fn read_file(
    root: &Path,
    filepath: &str,
    range: Option<(usize, usize)>,
) -> ToolResult<ReadResult> {
    let full = safe_join(root, filepath)?;
    if !full.is_file() {
        return Err(ToolError::NotFound {
            what: filepath.to_string(),
        });
    }

    let content = tokio::fs::read_to_string(&full).await?;
    let lines: Vec<&str> = content.lines().collect();
    let total_lines = lines.len();

    let (start, requested_end) = match range {
        Some((s, e)) if s == 0 || e < s => {
            return Err(ToolError::Validation {
                message: format!("invalid line range {s}-{e}"),
            });
        }
        Some((s, e)) => (s, e.min(total_lines.max(1))),
        None => (1, total_lines.max(1)),
    };

    let capped_end = requested_end.min(start.saturating_add(READ_LINE_CAP).saturating_sub(1));
    let slice: Vec<&str> = lines
        .iter()
        .skip(start.saturating_sub(1))
        .take(capped_end.saturating_sub(start).saturating_add(1))
        .copied()
        .collect();

    Ok(ReadResult {
        filepath: filepath.to_string(),
        line_start: start,
        line_end: start.saturating_add(slice.len().saturating_sub(1)),
        total_lines,
        text: slice.join("\n"),
        truncated: capped_end < requested_end,
    })
}

/// Grep within a resource root, capped at [`GREP_MATCH_CAP`] matches
///
/// # Errors
///
/// Propagates ripgrep subprocess failures; an empty pattern is rejected.
pub async fn grep_files(root: &Path, pattern: &str) -> ToolResult<Vec<GrepMatch>> {
    if pattern.trim().is_empty() {
        return Err(ToolError::Validation {
            message: "empty grep pattern".to_string(),
        });
    }
    let options = RipgrepOptions {
        exclude_globs: vec!["node_modules/**".to_string(), ".git/**".to_string()],
        max_hits: GREP_MATCH_CAP,
        timeout: Duration::from_secs(10),
        ..RipgrepOptions::default()
    };
    run_ripgrep(root, pattern, &options).await
}

/// List files under a resource root, capped at [`LIST_FILE_CAP`]
///
/// Prefers the tracked-file listing when the caller has one (git resources);
/// otherwise walks the tree with the standard exclusions.
///
/// # Errors
///
/// Returns `ToolError::NotFound` when the root is missing.
pub fn list_files(root: &Path, tracked: Option<Vec<String>>) -> ToolResult<Vec<String>> {
    let mut files = match tracked {
        Some(files) => files,
        None => local_files(root, None).map_err(|e| ToolError::NotFound {
            what: e.to_string(),
        })?,
    };
    files.truncate(LIST_FILE_CAP);
    Ok(files)
}

/// Match files under a resource root against a glob pattern, excluding
/// `node_modules/` and `.git/`, capped at [`LIST_FILE_CAP`]
///
/// # Errors
///
/// Returns `ToolError::Validation` for an unparsable pattern.
pub fn glob_files(root: &Path, pattern: &str) -> ToolResult<Vec<String>> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(false)
        .build()
        .map_err(|e| ToolError::Validation {
            message: format!("bad glob pattern: {e}"),
        })?
        .compile_matcher();

    let all = local_files(root, None).map_err(|e| ToolError::NotFound {
        what: e.to_string(),
    })?;

    let mut matched: Vec<String> = all.into_iter().filter(|f| glob.is_match(f)).collect();
    matched.truncate(LIST_FILE_CAP);
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seed(root: &Path) {
        fs::create_dir_all(root.join("src")).expect("mkdir");
        fs::create_dir_all(root.join("node_modules/pkg")).expect("mkdir");
        fs::write(root.join("src/lib.rs"), "fn a() {}\nfn b() {}\nfn c() {}\n").expect("write");
        fs::write(root.join("README.md"), "# readme\n").expect("write");
        fs::write(root.join("node_modules/pkg/x.js"), "ignored\n").expect("write");
    }

    #[tokio::test]
    async fn test_read_full_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let result = read_file(dir.path(), "src/lib.rs", None).await.expect("read");
        assert_eq!(result.line_start, 1);
        assert_eq!(result.line_end, 3);
        assert_eq!(result.total_lines, 3);
        assert!(!result.truncated);
        assert!(result.text.contains("fn b()"));
    }

    #[tokio::test]
    async fn test_read_with_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let result = read_file(dir.path(), "src/lib.rs", Some((2, 3)))
            .await
            .expect("read");
        assert_eq!(result.line_start, 2);
        assert_eq!(result.line_end, 3);
        assert_eq!(result.text, "fn b() {}\nfn c() {}");
    }

    #[tokio::test]
    async fn test_read_rejects_escaping_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let err = read_file(dir.path(), "../etc/passwd", None)
            .await
            .expect_err("must reject");
        assert!(matches!(err, ToolError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let err = read_file(dir.path(), "nope.rs", None).await.expect_err("missing");
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_read_caps_at_500_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body: String = (1..=600).map(|i| format!("line {i}\n")).collect();
        fs::write(dir.path().join("big.txt"), body).expect("write");

        let result = read_file(dir.path(), "big.txt", None).await.expect("read");
        assert_eq!(result.line_start, 1);
        assert_eq!(result.line_end, 500);
        assert!(result.truncated);
        assert_eq!(result.total_lines, 600);
    }

    #[test]
    fn test_list_prefers_tracked_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let tracked = vec!["a.rs".to_string(), "b.rs".to_string()];
        let files = list_files(dir.path(), Some(tracked.clone())).expect("list");
        assert_eq!(files, tracked);
    }

    #[test]
    fn test_list_walks_when_untracked() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let files = list_files(dir.path(), None).expect("list");
        assert!(files.contains(&"src/lib.rs".to_string()));
        assert!(files.contains(&"README.md".to_string()));
        assert!(
            !files.iter().any(|f| f.starts_with("node_modules")),
            "excluded dirs stay out"
        );
    }

    #[test]
    fn test_glob_matches_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());

        let files = glob_files(dir.path(), "**/*.rs").expect("glob");
        assert_eq!(files, vec!["src/lib.rs"]);

        let err = glob_files(dir.path(), "a{b").expect_err("bad pattern");
        assert!(matches!(err, ToolError::Validation { .. }));
    }
}
