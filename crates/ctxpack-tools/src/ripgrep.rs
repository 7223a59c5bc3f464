//! Ripgrep subprocess runner with line-delimited JSON output
//!
//! Parses the `--json` event stream, keeping only `match` records and the
//! fields the core needs: path, line number, and line text.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{ToolError, ToolResult};

/// One lexical hit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GrepMatch {
    /// POSIX path relative to the searched root
    pub filepath: String,
    /// 1-based line number
    pub line: u32,
    /// The matching line text, trailing newline stripped
    pub text: String,
}

/// Options controlling a ripgrep invocation
#[derive(Debug, Clone)]
pub struct RipgrepOptions {
    /// Treat the pattern as a literal string instead of a regex
    pub fixed_string: bool,
    /// Force case-insensitive matching
    pub case_insensitive: bool,
    /// Use smart case (overridden by `case_insensitive`)
    pub smart_case: bool,
    /// `!`-style exclusion globs applied on top of the search
    pub exclude_globs: Vec<String>,
    /// Stop collecting after this many hits
    pub max_hits: usize,
    /// Subprocess deadline
    pub timeout: Duration,
}

impl Default for RipgrepOptions {
    fn default() -> Self {
        Self {
            fixed_string: false,
            case_insensitive: false,
            smart_case: true,
            exclude_globs: Vec::new(),
            max_hits: 400,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Run ripgrep under `root` and collect match records
///
/// A no-match exit (code 1) is an empty result, not an error.
///
/// # Errors
///
/// - `ToolError::Timeout` when the deadline elapses
/// - `ToolError::Subprocess` on exit code 2 (bad pattern, IO trouble)
/// - `ToolError::Io` when the binary cannot be spawned
pub async fn run_ripgrep(
    root: &Path,
    pattern: &str,
    options: &RipgrepOptions,
) -> ToolResult<Vec<GrepMatch>> {
    let mut command = Command::new("rg");
    command
        .arg("--json")
        .arg("--no-ignore-messages")
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if options.fixed_string {
        command.arg("--fixed-strings");
    }
    if options.case_insensitive {
        command.arg("--ignore-case");
    } else if options.smart_case {
        command.arg("--smart-case");
    }
    for glob in &options.exclude_globs {
        command.arg("--glob").arg(format!("!{glob}"));
    }
    command.arg("--").arg(pattern).arg(".");

    let output = tokio::time::timeout(options.timeout, command.output())
        .await
        .map_err(|_| ToolError::Timeout {
            timeout: options.timeout,
        })??;

    match output.status.code() {
        // 0 = matches found, 1 = clean no-match run
        Some(0 | 1) => {}
        status => {
            return Err(ToolError::Subprocess {
                command: format!("rg --json -- {pattern}"),
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut matches = Vec::new();
    for line in stdout.lines() {
        if matches.len() >= options.max_hits {
            break;
        }
        let Ok(record) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        if record.get("type").and_then(|t| t.as_str()) != Some("match") {
            continue;
        }
        let data = &record["data"];
        let Some(path) = data["path"]["text"].as_str() else {
            continue;
        };
        let Some(line_number) = data["line_number"].as_u64() else {
            continue;
        };
        let text = data["lines"]["text"].as_str().unwrap_or_default();

        #[allow(clippy::cast_possible_truncation)]
        matches.push(GrepMatch {
            filepath: path.trim_start_matches("./").replace('\\', "/"),
            line: line_number as u32,
            text: text.trim_end_matches('\n').to_string(),
        });
    }

    Ok(matches)
}
