//! Lexical subtrack: keyword grep + context-window reconstruction

use std::path::Path;
use std::time::Duration;

use uuid::Uuid;

use crate::error::SearchResult;
use crate::keywords::{QueryPattern, build_pattern};
use crate::types::{RRF_K, TextCandidate};
use ctxpack_store::Resource;
use ctxpack_tools::{GrepMatch, RipgrepOptions, resource_root, run_ripgrep};

/// Globs excluded from lexical search: lock files, minified assets, maps,
/// snapshots, and standard build/output directories
pub const SEARCH_EXCLUDE_GLOBS: &[&str] = &[
    "*.lock",
    "package-lock.json",
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.snap",
    "__snapshots__/**",
    "node_modules/**",
    "dist/**",
    "build/**",
    ".next/**",
    "coverage/**",
    ".git/**",
];

/// Consecutive hits within this many lines merge into one range
const RANGE_MERGE_GAP: u32 = 10;
/// Context lines added on each side of a merged range
const CONTEXT_LINES: usize = 15;
/// Hard cap on a context window
const MAX_WINDOW_LINES: usize = 60;
/// Per-hit score bonus, capped at five hits
const HIT_BONUS: f64 = 0.0005;

/// A merged hit range within one file of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRange {
    pub resource_id: Uuid,
    pub filepath: String,
    /// 1-based hit lines
    pub line_start: u32,
    pub line_end: u32,
    pub hits: usize,
}

/// Group hits by filepath and merge lines within [`RANGE_MERGE_GAP`]
///
/// Input hits must belong to one resource; output ranges preserve file order
/// then line order.
pub fn merge_hits(resource_id: Uuid, mut hits: Vec<GrepMatch>) -> Vec<HitRange> {
    hits.sort_by(|a, b| a.filepath.cmp(&b.filepath).then(a.line.cmp(&b.line)));

    let mut ranges: Vec<HitRange> = Vec::new();
    for hit in hits {
        match ranges.last_mut() {
            Some(last)
                if last.filepath == hit.filepath
                    && hit.line.saturating_sub(last.line_end) <= RANGE_MERGE_GAP =>
            {
                last.line_end = hit.line.max(last.line_end);
                last.hits = last.hits.saturating_add(1);
            }
            _ => ranges.push(HitRange {
                resource_id,
                filepath: hit.filepath,
                line_start: hit.line,
                line_end: hit.line,
                hits: 1,
            }),
        }
    }
    ranges
}

/// Run the lexical subtrack over content-ready resources
///
/// Each resource is grepped with the derived pattern and the standard
/// exclusions, capped at `max_hits_per_resource` hits. Merged ranges are
/// ranked by hit count descending across all resources; each range becomes
/// a context window of at most 60 lines with score
/// `1/(K+rank) + min(hits,5) * 0.0005`.
///
/// # Errors
///
/// Currently infallible at the subtrack level: per-resource grep failures
/// and unreadable files are skipped with a debug log. The `Result` shape is
/// kept so the service treats subtracks uniformly.
#[tracing::instrument(skip(resources, repos_root), fields(resources = resources.len()))]
pub async fn text_search(
    resources: &[Resource],
    query: &str,
    repos_root: &Path,
    max_hits_per_resource: usize,
    timeout: Duration,
) -> SearchResult<Vec<TextCandidate>> {
    let (pattern, fixed) = match build_pattern(query) {
        QueryPattern::Fixed(p) => (p, true),
        QueryPattern::Alternation(p) => (p, false),
    };

    let mut ranges: Vec<(HitRange, &Resource)> = Vec::new();
    for resource in resources {
        let Ok(root) = resource_root(resource, repos_root) else {
            tracing::debug!(resource = %resource.id, "resource root missing, skipping text subtrack");
            continue;
        };

        let options = RipgrepOptions {
            fixed_string: fixed,
            // Multi-keyword alternations force case-insensitive matching;
            // fixed strings rely on smart case
            case_insensitive: !fixed,
            smart_case: true,
            exclude_globs: SEARCH_EXCLUDE_GLOBS.iter().map(ToString::to_string).collect(),
            max_hits: max_hits_per_resource,
            timeout,
        };

        match run_ripgrep(&root, &pattern, &options).await {
            Ok(hits) => {
                for range in merge_hits(resource.id, hits) {
                    ranges.push((range, resource));
                }
            }
            Err(e) => {
                tracing::debug!(resource = %resource.id, error = %e, "text subtrack grep failed");
            }
        }
    }

    // Rank ranges by hit count descending; stable, so earlier resources and
    // files win ties deterministically
    ranges.sort_by(|a, b| b.0.hits.cmp(&a.0.hits));

    let mut candidates = Vec::new();
    for (rank0, (range, resource)) in ranges.into_iter().enumerate() {
        let Ok(root) = resource_root(resource, repos_root) else {
            continue;
        };
        let Some(candidate) = window_candidate(&root, &range, resource, rank0 + 1).await else {
            continue;
        };
        candidates.push(candidate);
    }

    Ok(candidates)
}

/// Build the context window for one ranked range; None when the file is
/// unreadable
async fn window_candidate(
    root: &Path,
    range: &HitRange,
    resource: &Resource,
    rank: usize,
) -> Option<TextCandidate> {
    let content = tokio::fs::read_to_string(root.join(&range.filepath))
        .await
        .ok()?;
    let lines: Vec<&str> = content.lines().collect();
    let total_lines = lines.len();

    // 0-based window start, exclusive end
    let start = (range.line_start as usize)
        .saturating_sub(1)
        .saturating_sub(CONTEXT_LINES);
    let mut end = total_lines.min((range.line_end as usize).saturating_add(CONTEXT_LINES));
    end = end.min(start.saturating_add(MAX_WINDOW_LINES));
    if start >= end {
        return None;
    }

    let text = lines.get(start..end)?.join("\n");

    #[allow(clippy::cast_precision_loss)]
    let score = 1.0 / (RRF_K + rank as f64) + (range.hits.min(5) as f64) * HIT_BONUS;

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let (line_start, line_end) = ((start + 1) as i32, end as i32);

    Some(TextCandidate {
        resource_id: resource.id,
        resource_name: resource.name.clone(),
        filepath: range.filepath.clone(),
        line_start,
        line_end,
        text,
        score,
    })
}
