//! Source accumulation across agent steps

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ctxpack_search::SearchResultItem;

/// A citation the driver hands back alongside the answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub chunk_id: Option<Uuid>,
    pub resource_id: Uuid,
    pub resource_name: String,
    pub filepath: String,
    pub line_start: i32,
    pub line_end: i32,
}

impl SourceRef {
    /// Dedup key: the chunk id when present, else resource:filepath:line
    pub fn key(&self) -> String {
        self.chunk_id.map_or_else(
            || {
                format!(
                    "{}:{}:{}",
                    self.resource_id, self.filepath, self.line_start
                )
            },
            |id| id.to_string(),
        )
    }
}

impl From<&SearchResultItem> for SourceRef {
    fn from(item: &SearchResultItem) -> Self {
        Self {
            chunk_id: item.chunk_id,
            resource_id: item.resource_id,
            resource_name: item.resource_name.clone(),
            filepath: item.filepath.clone(),
            line_start: item.line_start,
            line_end: item.line_end,
        }
    }
}

/// Unique source accumulator, preserving first-seen order
#[derive(Debug, Default)]
pub struct SourceSet {
    seen: HashSet<String>,
    list: Vec<SourceRef>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one source if its key is new
    pub fn add(&mut self, source: SourceRef) {
        if self.seen.insert(source.key()) {
            self.list.push(source);
        }
    }

    /// Harvest sources from a search tool's JSON output (an array of
    /// serialized results); non-conforming entries are skipped
    pub fn add_from_tool_output(&mut self, output: &serde_json::Value) {
        let Some(entries) = output.as_array() else {
            return;
        };
        for entry in entries {
            if let Ok(source) = serde_json::from_value::<SourceRef>(entry.clone()) {
                self.add(source);
            }
        }
    }

    /// The accumulated sources, in first-seen order
    pub fn into_list(self) -> Vec<SourceRef> {
        self.list
    }

    pub fn as_slice(&self) -> &[SourceRef] {
        &self.list
    }
}
