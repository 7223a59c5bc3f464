//! Repository materializer
//!
//! Maps a git resource to a directory under the managed repos root and keeps
//! it current with shallow clones and fetches. Owns that directory for the
//! lifetime of the resource.

use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::command::{run_git, try_git};
use crate::error::{GitError, GitResult};
use ctxpack_store::Resource;

/// Materializes git resources under `<repos_root>/<resource-id>`
#[derive(Debug, Clone)]
pub struct Materializer {
    repos_root: PathBuf,
    git_timeout: Duration,
    ls_remote_timeout: Duration,
}

impl Materializer {
    /// Create a materializer rooted at `repos_root`
    pub const fn new(
        repos_root: PathBuf,
        git_timeout: Duration,
        ls_remote_timeout: Duration,
    ) -> Self {
        Self {
            repos_root,
            git_timeout,
            ls_remote_timeout,
        }
    }

    /// The directory a resource materializes into
    pub fn dir_for(&self, resource_id: &Uuid) -> PathBuf {
        self.repos_root.join(resource_id.to_string())
    }

    /// Bring a git resource's content onto the filesystem; idempotent
    ///
    /// Missing directory (or one without git metadata) is cleaned and
    /// shallow-cloned; an existing clone gets its origin URL refreshed, a
    /// depth-1 fetch of the target branch or pinned commit, and a forced
    /// checkout. Returns the absolute directory.
    ///
    /// # Errors
    ///
    /// - `GitError::MissingUrl` when the resource has no remote URL
    /// - `GitError::CommandFailed` / `GitError::Timeout` when clone or fetch
    ///   fails
    #[tracing::instrument(skip(self, resource), fields(resource_id = %resource.id))]
    pub async fn prepare(&self, resource: &Resource) -> GitResult<PathBuf> {
        let url = resource
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(GitError::MissingUrl)?;

        let dir = self.dir_for(&resource.id);
        let branch = resource.branch.as_deref();
        let commit = resource.commit.as_deref();

        if dir.join(".git").is_dir() {
            self.update(&dir, url, branch, commit).await?;
        } else {
            self.fresh_clone(&dir, url, branch, commit).await?;
        }

        Ok(dir)
    }

    async fn fresh_clone(
        &self,
        dir: &Path,
        url: &str,
        branch: Option<&str>,
        commit: Option<&str>,
    ) -> GitResult<()> {
        if dir.exists() {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::create_dir_all(&self.repos_root).await?;

        let dir_str = dir.to_string_lossy().into_owned();
        let mut args = vec!["clone", "--depth", "1", "--single-branch"];
        if let Some(b) = branch {
            args.extend(["--branch", b]);
        }
        args.extend([url, dir_str.as_str()]);

        if let Err(first) = run_git(&self.repos_root, &args, self.git_timeout).await {
            tracing::warn!(error = %first, "branch-scoped clone failed, retrying without branch");
            if dir.exists() {
                tokio::fs::remove_dir_all(dir).await?;
            }
            run_git(
                &self.repos_root,
                &["clone", "--depth", "1", url, dir_str.as_str()],
                self.git_timeout,
            )
            .await?;
        }

        if let Some(sha) = commit {
            run_git(dir, &["fetch", "--depth", "1", "origin", sha], self.git_timeout).await?;
            run_git(dir, &["checkout", "-f", sha], self.git_timeout).await?;
        }
        Ok(())
    }

    async fn update(
        &self,
        dir: &Path,
        url: &str,
        branch: Option<&str>,
        commit: Option<&str>,
    ) -> GitResult<()> {
        run_git(dir, &["remote", "set-url", "origin", url], self.git_timeout).await?;

        // Pinned commit wins over branch
        let target = commit.or(branch);
        match target {
            Some(t) => {
                run_git(dir, &["fetch", "--depth", "1", "origin", t], self.git_timeout).await?;
            }
            None => {
                run_git(dir, &["fetch", "--depth", "1", "origin"], self.git_timeout).await?;
            }
        }

        let checkout_target = commit.map_or("FETCH_HEAD", |sha| sha);
        run_git(dir, &["checkout", "-f", checkout_target], self.git_timeout).await?;
        Ok(())
    }

    /// HEAD SHA of a materialized (or any) directory; None on failure
    pub async fn head_commit(&self, dir: &Path) -> Option<String> {
        let out = try_git(dir, &["rev-parse", "HEAD"], self.git_timeout).await?;
        let sha = out.trim();
        if sha.is_empty() {
            None
        } else {
            Some(sha.to_string())
        }
    }

    /// SHA of a remote branch head via `ls-remote --heads`; None on failure
    ///
    /// With no branch the remote HEAD ref is resolved instead.
    pub async fn remote_head(&self, url: &str, branch: Option<&str>) -> Option<String> {
        let out = match branch {
            Some(b) => {
                try_git(
                    &self.repos_root,
                    &["ls-remote", "--heads", url, b],
                    self.ls_remote_timeout,
                )
                .await?
            }
            None => {
                try_git(
                    &self.repos_root,
                    &["ls-remote", url, "HEAD"],
                    self.ls_remote_timeout,
                )
                .await?
            }
        };

        out.lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .filter(|sha| !sha.is_empty())
            .map(ToString::to_string)
    }

    /// Tracked files of a clone, as POSIX paths
    ///
    /// # Errors
    ///
    /// Returns the underlying git error when `ls-files` fails.
    pub async fn list_tracked(&self, dir: &Path) -> GitResult<Vec<String>> {
        let out = run_git(dir, &["ls-files", "-z"], self.git_timeout).await?;
        Ok(out
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(|p| p.replace('\\', "/"))
            .collect())
    }
}
