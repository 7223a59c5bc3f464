//! Domain models for persisted entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of content a resource points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Git,
    Local,
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "local" => Ok(Self::Local),
            _ => Err(format!("Invalid resource kind: {s}")),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Visibility scope of a resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceScope {
    Project,
    Global,
}

impl std::str::FromStr for ResourceScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "global" => Ok(Self::Global),
            _ => Err(format!("Invalid resource scope: {s}")),
        }
    }
}

impl std::fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// Lifecycle of the materialized content (sync side)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Missing,
    Syncing,
    Ready,
    Failed,
}

impl std::str::FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing" => Ok(Self::Missing),
            "syncing" => Ok(Self::Syncing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid content status: {s}")),
        }
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Missing => "missing",
            Self::Syncing => "syncing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

/// Lifecycle of the embedded chunk set (index side)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStatus {
    Missing,
    Indexing,
    Ready,
    Failed,
}

impl std::str::FromStr for VectorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing" => Ok(Self::Missing),
            "indexing" => Ok(Self::Indexing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid vector status: {s}")),
        }
    }
}

impl std::fmt::Display for VectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Missing => "missing",
            Self::Indexing => "indexing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

/// Compatibility status derived from the two status axes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LegacyStatus {
    Pending,
    Indexing,
    Ready,
    Failed,
}

/// An indexed unit: a git repository or a local directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub owner_id: Option<String>,
    /// Unique within (owner, scope, project_key)
    pub name: String,
    pub scope: ResourceScope,
    /// Empty string when scope is global
    pub project_key: String,
    pub kind: ResourceKind,
    pub url: Option<String>,
    pub path: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    /// Restrict indexing to these sub-paths, in order
    pub scoped_paths: Option<Vec<String>>,
    pub notes: Option<String>,
    pub content_status: ContentStatus,
    pub vector_status: VectorStatus,
    pub content_error: Option<String>,
    pub vector_error: Option<String>,
    pub chunk_count: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub last_local_commit: Option<String>,
    pub last_remote_commit: Option<String>,
    pub update_available: bool,
    pub last_update_check_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Derived compatibility status for callers that predate the split axes
    pub const fn legacy_status(&self) -> LegacyStatus {
        match (self.content_status, self.vector_status) {
            (ContentStatus::Failed, _) | (_, VectorStatus::Failed) => LegacyStatus::Failed,
            (ContentStatus::Syncing, _) | (_, VectorStatus::Indexing) => LegacyStatus::Indexing,
            (ContentStatus::Ready, VectorStatus::Ready) => LegacyStatus::Ready,
            _ => LegacyStatus::Pending,
        }
    }
}

/// Input for creating a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResource {
    pub owner_id: Option<String>,
    pub name: String,
    pub scope: ResourceScope,
    pub project_key: String,
    pub kind: ResourceKind,
    pub url: Option<String>,
    pub path: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub scoped_paths: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl NewResource {
    /// Check the structural invariants before any database work
    ///
    /// # Errors
    ///
    /// Returns a message when the kind/url/path pairing or the scope/project
    /// pairing is inconsistent, or the name is empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("resource name must not be empty".to_string());
        }
        match self.kind {
            ResourceKind::Git if self.url.as_deref().is_none_or(str::is_empty) => {
                Err("git resources require a url".to_string())
            }
            ResourceKind::Local if self.path.as_deref().is_none_or(str::is_empty) => {
                Err("local resources require a path".to_string())
            }
            _ => match self.scope {
                ResourceScope::Project if self.project_key.trim().is_empty() => {
                    Err("project-scoped resources require a projectKey".to_string())
                }
                _ => Ok(()),
            },
        }
    }
}

/// A line-ranged slice of a file, embedded as a single vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub resource_id: Uuid,
    /// POSIX-normalized path relative to the resource root
    pub filepath: String,
    /// 1-based, inclusive
    pub line_start: i32,
    pub line_end: i32,
    pub text: String,
    /// The embedded form: text prefixed with scope/entity hints
    pub contextualized_text: String,
    pub scope: Option<String>,
    pub entities: Vec<String>,
    pub language: Option<String>,
    /// sha256 over `filepath:line_start:line_end:contextualized_text`
    pub hash: String,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// A chunk ready to be persisted (id and hash derived on insert)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    pub filepath: String,
    pub line_start: i32,
    pub line_end: i32,
    pub text: String,
    pub contextualized_text: String,
    pub scope: Option<String>,
    pub entities: Vec<String>,
    pub language: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

/// A vector-search hit: chunk plus cosine distance
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub chunk: Chunk,
    pub distance: f32,
}

/// The two job kinds the indexer runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Sync,
    Index,
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(Self::Sync),
            "index" => Ok(Self::Index),
            _ => Err(format!("Invalid job kind: {s}")),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Index => write!(f, "index"),
        }
    }
}

/// Status of an index or research job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal (immutable once written)
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

/// Pipeline stage a warning originated from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WarningStage {
    Scan,
    Read,
    Chunk,
    Embed,
    Sync,
    RemoteCheck,
}

/// A non-fatal problem recorded on a job row, in insertion order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobWarning {
    pub filepath: String,
    pub stage: WarningStage,
    pub message: String,
}

/// A background sync or index job owned by a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    /// 0-100, monotonically non-decreasing while running
    pub progress: i32,
    pub error: Option<String>,
    pub warnings: Vec<JobWarning>,
    pub total_files: i32,
    pub processed_files: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Search mode used by hybrid search and persisted in research jobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Hybrid,
    Text,
    Vector,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hybrid" => Ok(Self::Hybrid),
            "text" => Ok(Self::Text),
            "vector" => Ok(Self::Vector),
            _ => Err(format!("Invalid search mode: {s}")),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::Text => write!(f, "text"),
            Self::Vector => write!(f, "vector"),
        }
    }
}

/// Caller-provided knobs for an asynchronous research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOptions {
    pub mode: SearchMode,
    pub alpha: f64,
    pub top_k: usize,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            alpha: 0.5,
            top_k: 10,
        }
    }
}

/// An asynchronous deep-research run and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchJob {
    pub id: Uuid,
    pub owner_id: Option<String>,
    pub query: String,
    pub resource_ids: Vec<Uuid>,
    pub options: ResearchOptions,
    pub status: JobStatus,
    /// Full driver result, present when completed
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
