//! Agent tool set
//!
//! The same read/grep/list/glob operations the outer tool surface exposes,
//! plus `search` over the in-scope resources. When exactly one resource is
//! in scope, tools may omit the resource identifier.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use crate::chat::ToolDefinition;
use ctxpack_common::ErrorContext;
use ctxpack_git::Materializer;
use ctxpack_search::{SearchRequest, SearchService};
use ctxpack_store::{Resource, ResourceKind, SearchMode};
use ctxpack_tools::{glob_files, grep_files, list_files, read_file, resource_root};

/// Preview truncation: first 12 lines
const PREVIEW_MAX_LINES: usize = 12;
/// Preview truncation: 600 characters
const PREVIEW_MAX_CHARS: usize = 600;

/// Default search knobs for a run, overridable per tool call
#[derive(Debug, Clone, Copy)]
pub struct SearchDefaults {
    pub mode: SearchMode,
    pub alpha: f64,
    pub top_k: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            alpha: 0.5,
            top_k: 10,
        }
    }
}

/// Everything the tool handlers need, captured once per run
pub struct ToolContext {
    pub search: Arc<SearchService>,
    pub materializer: Materializer,
    pub repos_root: PathBuf,
    /// Resources in scope for this run
    pub resources: Vec<Resource>,
    pub owner_id: Option<String>,
    pub search_defaults: SearchDefaults,
}

impl ToolContext {
    /// Resolve the target resource from an optional `resource_id` input
    ///
    /// With exactly one resource in scope the id may be omitted.
    fn resolve_resource(&self, input: &Value) -> Result<Resource, String> {
        match input.get("resource_id").and_then(Value::as_str) {
            Some(raw) => {
                let id: Uuid = raw
                    .parse()
                    .map_err(|_| format!("invalid resource_id: {raw}"))?;
                self.resources
                    .iter()
                    .find(|r| r.id == id)
                    .cloned()
                    .ok_or_else(|| format!("resource {id} is not in scope"))
            }
            None => match self.resources.as_slice() {
                [only] => Ok(only.clone()),
                [] => Err("no resources in scope".to_string()),
                _ => Err("resource_id is required when multiple resources are in scope"
                    .to_string()),
            },
        }
    }
}

/// Cut a preview down to the first 12 lines and 600 characters
pub fn truncate_preview(text: &str) -> String {
    let lines: Vec<&str> = text.lines().take(PREVIEW_MAX_LINES).collect();
    let mut preview = lines.join("\n");
    if preview.len() > PREVIEW_MAX_CHARS {
        let cut = preview
            .char_indices()
            .take_while(|(i, _)| *i < PREVIEW_MAX_CHARS)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        preview.truncate(cut);
    }
    preview
}

/// Build the five agent tools over a shared context
pub fn build_toolset(ctx: &Arc<ToolContext>) -> Vec<ToolDefinition> {
    vec![
        search_tool(ctx),
        grep_tool(ctx),
        read_tool(ctx),
        list_tool(ctx),
        glob_tool(ctx),
    ]
}

fn search_tool(ctx: &Arc<ToolContext>) -> ToolDefinition {
    let ctx = Arc::clone(ctx);
    ToolDefinition {
        name: "search".to_string(),
        description: "Hybrid (lexical + semantic) search over the in-scope resources. \
                      Returns ranked snippets with file and line locations."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query text."
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of results. Defaults to 10.",
                    "default": 10
                },
                "mode": {
                    "type": "string",
                    "enum": ["hybrid", "text", "vector"],
                    "description": "Search mode. Defaults to 'hybrid'.",
                    "default": "hybrid"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
        handler: Arc::new(move |input| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let query = input
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "query is required".to_string())?
                    .to_string();
                let defaults = ctx.search_defaults;
                let top_k = input
                    .get("top_k")
                    .and_then(Value::as_u64)
                    .map_or(defaults.top_k, |v| usize::try_from(v).unwrap_or(defaults.top_k));
                let mode = input
                    .get("mode")
                    .and_then(Value::as_str)
                    .and_then(|m| m.parse::<SearchMode>().ok())
                    .unwrap_or(defaults.mode);

                let request = SearchRequest {
                    query,
                    resource_ids: ctx.resources.iter().map(|r| r.id).collect(),
                    mode,
                    alpha: defaults.alpha,
                    top_k,
                };
                let results = ctx
                    .search
                    .search(ctx.owner_id.as_deref(), request)
                    .await
                    .context("searching indexed resources")?;

                let entries: Vec<Value> = results
                    .iter()
                    .map(|r| {
                        json!({
                            "chunk_id": r.chunk_id,
                            "resource_id": r.resource_id,
                            "resource_name": r.resource_name,
                            "filepath": r.filepath,
                            "line_start": r.line_start,
                            "line_end": r.line_end,
                            "preview": truncate_preview(&r.text),
                            "score": r.score,
                            "match_type": r.match_type,
                        })
                    })
                    .collect();
                Ok(Value::Array(entries))
            })
        }),
    }
}

fn grep_tool(ctx: &Arc<ToolContext>) -> ToolDefinition {
    let ctx = Arc::clone(ctx);
    ToolDefinition {
        name: "grep".to_string(),
        description: "Regex search over a resource's files. Returns matching lines \
                      with their locations, capped at 100 matches."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regex pattern to search for."
                },
                "resource_id": {
                    "type": "string",
                    "description": "Target resource. Optional when exactly one resource is in scope."
                }
            },
            "required": ["pattern"],
            "additionalProperties": false
        }),
        handler: Arc::new(move |input| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let pattern = input
                    .get("pattern")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "pattern is required".to_string())?
                    .to_string();
                let resource = ctx.resolve_resource(&input)?;
                let root =
                    resource_root(&resource, &ctx.repos_root).context("resolving resource root")?;

                let matches = grep_files(&root, &pattern)
                    .await
                    .with_context(|| format!("grepping for {pattern}"))?;
                let entries: Vec<Value> = matches
                    .iter()
                    .map(|m| json!({ "filepath": m.filepath, "line": m.line, "text": m.text }))
                    .collect();
                Ok(Value::Array(entries))
            })
        }),
    }
}

fn read_tool(ctx: &Arc<ToolContext>) -> ToolDefinition {
    let ctx = Arc::clone(ctx);
    ToolDefinition {
        name: "read".to_string(),
        description: "Read a file from a resource, optionally a line range. \
                      At most 500 lines come back."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "POSIX path relative to the resource root."
                },
                "line_start": {
                    "type": "integer",
                    "description": "1-based first line of the range."
                },
                "line_end": {
                    "type": "integer",
                    "description": "1-based last line of the range (inclusive)."
                },
                "resource_id": {
                    "type": "string",
                    "description": "Target resource. Optional when exactly one resource is in scope."
                }
            },
            "required": ["filepath"],
            "additionalProperties": false
        }),
        handler: Arc::new(move |input| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let filepath = input
                    .get("filepath")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "filepath is required".to_string())?
                    .to_string();
                let range = match (
                    input.get("line_start").and_then(Value::as_u64),
                    input.get("line_end").and_then(Value::as_u64),
                ) {
                    (Some(s), Some(e)) => Some((
                        usize::try_from(s).unwrap_or(1),
                        usize::try_from(e).unwrap_or(1),
                    )),
                    _ => None,
                };
                let resource = ctx.resolve_resource(&input)?;
                let root =
                    resource_root(&resource, &ctx.repos_root).context("resolving resource root")?;

                let result = read_file(&root, &filepath, range)
                    .await
                    .with_context(|| format!("reading {filepath}"))?;
                serde_json::to_value(result).context("serializing read result")
            })
        }),
    }
}

fn list_tool(ctx: &Arc<ToolContext>) -> ToolDefinition {
    let ctx = Arc::clone(ctx);
    ToolDefinition {
        name: "list".to_string(),
        description: "List a resource's files (tracked files for git resources), \
                      capped at 500."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "resource_id": {
                    "type": "string",
                    "description": "Target resource. Optional when exactly one resource is in scope."
                }
            },
            "additionalProperties": false
        }),
        handler: Arc::new(move |input| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let resource = ctx.resolve_resource(&input)?;
                let root =
                    resource_root(&resource, &ctx.repos_root).context("resolving resource root")?;

                // Prefer the tracked-file listing when the clone has one
                let tracked = match resource.kind {
                    ResourceKind::Git => ctx.materializer.list_tracked(&root).await.ok(),
                    ResourceKind::Local => None,
                };
                let files = list_files(&root, tracked).context("listing resource files")?;
                serde_json::to_value(files).context("serializing file list")
            })
        }),
    }
}

fn glob_tool(ctx: &Arc<ToolContext>) -> ToolDefinition {
    let ctx = Arc::clone(ctx);
    ToolDefinition {
        name: "glob".to_string(),
        description: "Match files in a resource against a glob pattern \
                      (node_modules/ and .git/ excluded), capped at 500."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern, e.g. \"src/**/*.rs\"."
                },
                "resource_id": {
                    "type": "string",
                    "description": "Target resource. Optional when exactly one resource is in scope."
                }
            },
            "required": ["pattern"],
            "additionalProperties": false
        }),
        handler: Arc::new(move |input| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let pattern = input
                    .get("pattern")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "pattern is required".to_string())?
                    .to_string();
                let resource = ctx.resolve_resource(&input)?;
                let root =
                    resource_root(&resource, &ctx.repos_root).context("resolving resource root")?;

                let files = glob_files(&root, &pattern)
                    .with_context(|| format!("matching glob {pattern}"))?;
                serde_json::to_value(files).context("serializing file list")
            })
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preview_caps_lines_and_chars() {
        let long: String = (0..40).map(|i| format!("line {i}\n")).collect();
        let preview = truncate_preview(&long);
        assert_eq!(preview.lines().count(), 12, "line cap applies");

        let wide = "x".repeat(2000);
        let preview = truncate_preview(&wide);
        assert!(preview.len() <= 600, "char cap applies: {}", preview.len());
    }

    fn context_with(resources: Vec<Resource>) -> Arc<ToolContext> {
        use std::time::Duration;
        let store = Arc::new(ctxpack_store::MockStore::new());
        let search = Arc::new(SearchService::new(
            store,
            Arc::new(ctxpack_embeddings::MockEmbedder::new(2)),
            PathBuf::from("/tmp/repos"),
            ctxpack_config::SearchConfig::from_env(),
        ));
        Arc::new(ToolContext {
            search,
            materializer: Materializer::new(
                PathBuf::from("/tmp/repos"),
                Duration::from_secs(60),
                Duration::from_secs(30),
            ),
            repos_root: PathBuf::from("/tmp/repos"),
            resources,
            owner_id: None,
            search_defaults: SearchDefaults::default(),
        })
    }

    fn resource(name: &str) -> Resource {
        let now = chrono::Utc::now();
        Resource {
            id: Uuid::new_v4(),
            owner_id: None,
            name: name.to_string(),
            scope: ctxpack_store::ResourceScope::Global,
            project_key: String::new(),
            kind: ResourceKind::Local,
            url: None,
            path: Some("/tmp/demo".to_string()),
            branch: None,
            commit: None,
            scoped_paths: None,
            notes: None,
            content_status: ctxpack_store::ContentStatus::Ready,
            vector_status: ctxpack_store::VectorStatus::Ready,
            content_error: None,
            vector_error: None,
            chunk_count: 0,
            last_synced_at: None,
            last_indexed_at: None,
            last_local_commit: None,
            last_remote_commit: None,
            update_available: false,
            last_update_check_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_toolset_has_the_five_tools() {
        let ctx = context_with(vec![resource("demo")]);
        let tools = build_toolset(&ctx);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search", "grep", "read", "list", "glob"]);
        for tool in &tools {
            assert!(tool.parameters.is_object());
            assert_eq!(tool.parameters["type"], "object");
            assert!(!tool.description.is_empty());
        }
    }

    #[test]
    fn test_single_resource_scope_may_omit_resource_id() {
        let ctx = context_with(vec![resource("only")]);
        let resolved = ctx.resolve_resource(&json!({})).expect("implicit resource");
        assert_eq!(resolved.name, "only");
    }

    #[test]
    fn test_multi_resource_scope_requires_resource_id() {
        let ctx = context_with(vec![resource("a"), resource("b")]);
        let err = ctx.resolve_resource(&json!({})).expect_err("ambiguous scope");
        assert!(err.contains("resource_id is required"), "got {err}");

        let id = ctx.resources[1].id;
        let resolved = ctx
            .resolve_resource(&json!({ "resource_id": id.to_string() }))
            .expect("explicit id resolves");
        assert_eq!(resolved.name, "b");
    }
}
