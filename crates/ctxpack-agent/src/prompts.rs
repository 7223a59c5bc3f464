//! System and user prompt construction

use ctxpack_search::SearchResultItem;
use ctxpack_store::{Resource, ResourceKind, normalize_git_url};

/// Describe the in-scope resources for the system prompt
fn describe_resources(resources: &[Resource]) -> String {
    if resources.is_empty() {
        return "No resources are currently in scope.".to_string();
    }
    let mut out = String::from("Resources in scope:\n");
    for resource in resources {
        out.push_str(&format!(
            "- {} ({}, id {}): content {}, vectors {}",
            resource.name,
            resource.kind,
            resource.id,
            resource.content_status,
            resource.vector_status
        ));
        if resource.kind == ResourceKind::Git
            && let Some(url) = resource.url.as_deref()
        {
            out.push_str(&format!(" | repo: {}", normalize_git_url(url)));
        }
        if let Some(notes) = &resource.notes {
            out.push_str(&format!(" | notes: {notes}"));
        }
        out.push('\n');
    }
    out
}

const TOOL_GUIDE: &str = "\
You can call tools to inspect the indexed resources:
- search: hybrid lexical+semantic search, best first step for any question
- grep: exact regex match when you know the symbol or string
- read: read a file or line range you found via search or grep
- list: enumerate a resource's files
- glob: find files by name pattern
Cite filepaths and line numbers in your answer.";

/// System prompt for the exploration mode
pub fn explore_system(resources: &[Resource]) -> String {
    format!(
        "You are a code research assistant answering questions about indexed \
         repositories. Investigate with tools before answering; prefer reading \
         the actual code over guessing.\n\n{}\n{}",
        describe_resources(resources),
        TOOL_GUIDE
    )
}

/// System prompt for the deep-research mode: demands broader coverage
pub fn research_system(resources: &[Resource]) -> String {
    format!(
        "You are a code research assistant producing a thorough report on the \
         indexed repositories. Cover every angle of the question: search with \
         multiple phrasings, follow cross-references between files, read the \
         relevant implementations end to end, and reconcile anything \
         contradictory before answering. A short answer backed by three files \
         is not enough; map the whole picture.\n\n{}\n{}",
        describe_resources(resources),
        TOOL_GUIDE
    )
}

/// System prompt for the quick-answer mode (no tools)
pub fn quick_system(resources: &[Resource]) -> String {
    format!(
        "You are a code research assistant. Answer from the provided context \
         snippets only; say so when the context does not contain the answer. \
         Cite filepaths and line numbers.\n\n{}",
        describe_resources(resources)
    )
}

/// User prompt for the quick-answer mode: retrieved context plus question
pub fn quick_prompt(query: &str, results: &[SearchResultItem]) -> String {
    let mut out = String::from("Context from the indexed resources:\n\n");
    if results.is_empty() {
        out.push_str("(no matching context found)\n");
    }
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "[{}] {} {}:{}-{}\n{}\n\n",
            i + 1,
            result.resource_name,
            result.filepath,
            result.line_start,
            result.line_end,
            result.text
        ));
    }
    out.push_str(&format!("Question: {query}"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_prompt_includes_context_and_question() {
        let prompt = quick_prompt("how does fusion work?", &[]);
        assert!(prompt.contains("(no matching context found)"));
        assert!(prompt.ends_with("Question: how does fusion work?"));
    }

    #[test]
    fn test_empty_scope_is_stated() {
        let system = explore_system(&[]);
        assert!(system.contains("No resources are currently in scope."));
        assert!(system.contains("- search:"));
    }

    #[test]
    fn test_git_resources_show_the_normalized_repo() {
        let now = chrono::Utc::now();
        let resource = Resource {
            id: uuid::Uuid::new_v4(),
            owner_id: None,
            name: "demo".to_string(),
            scope: ctxpack_store::ResourceScope::Global,
            project_key: String::new(),
            kind: ResourceKind::Git,
            url: Some("git@github.com:user/repo.git".to_string()),
            path: None,
            branch: Some("main".to_string()),
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
        };

        let system = explore_system(&[resource]);
        assert!(
            system.contains("repo: github.com/user/repo"),
            "got {system}"
        );
    }
}
