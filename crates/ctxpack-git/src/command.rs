//! Bounded git subprocess runner
//!
//! Every invocation runs with an explicit working directory, a null stdin,
//! captured stdout/stderr, and a deadline. Non-zero exits surface as
//! structured errors carrying the command line.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{GitError, GitResult};

/// Render a command line for error messages
fn render_command(args: &[&str]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run `git <args>` in `cwd` with the given deadline, returning stdout
///
/// # Errors
///
/// - `GitError::Io` when the process cannot be spawned
/// - `GitError::Timeout` when the deadline elapses (the child is killed)
/// - `GitError::CommandFailed` on a non-zero exit, with captured stderr
pub async fn run_git(cwd: &Path, args: &[&str], timeout: Duration) -> GitResult<String> {
    let command_line = render_command(args);
    tracing::debug!(command = %command_line, cwd = %cwd.display(), "running git");

    let child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| GitError::Timeout {
            command: command_line.clone(),
            timeout,
        })??;

    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: command_line,
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run git and reduce the outcome to `Option`, for probes that are allowed
/// to fail (rev-parse on a non-repo, unreachable remotes)
pub async fn try_git(cwd: &Path, args: &[&str], timeout: Duration) -> Option<String> {
    match run_git(cwd, args, timeout).await {
        Ok(stdout) => Some(stdout),
        Err(e) => {
            tracing::debug!(error = %e, "non-fatal git probe failed");
            None
        }
    }
}
