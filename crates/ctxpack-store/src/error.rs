//! Structured error handling for the store layer

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store operation type for error context
#[derive(Debug, Clone)]
pub enum StoreOperation {
    CreateResource { name: String },
    GetResource { id: Uuid },
    ListResources,
    DeleteResource { id: Uuid },
    UpdateResource { id: Uuid },
    ReplaceChunks { resource_id: Uuid, count: usize },
    VectorSearch { limit: usize },
    CreateJob { resource_id: Uuid },
    UpdateJob { job_id: Uuid },
    GetJob { job_id: Uuid },
    CreateResearchJob,
    UpdateResearchJob { job_id: Uuid },
    Migration,
    Query { description: String },
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateResource { name } => write!(f, "create_resource(name={name})"),
            Self::GetResource { id } => write!(f, "get_resource(id={id})"),
            Self::ListResources => write!(f, "list_resources"),
            Self::DeleteResource { id } => write!(f, "delete_resource(id={id})"),
            Self::UpdateResource { id } => write!(f, "update_resource(id={id})"),
            Self::ReplaceChunks { resource_id, count } => {
                write!(f, "replace_chunks(resource={resource_id}, count={count})")
            }
            Self::VectorSearch { limit } => write!(f, "vector_search(limit={limit})"),
            Self::CreateJob { resource_id } => write!(f, "create_job(resource={resource_id})"),
            Self::UpdateJob { job_id } => write!(f, "update_job(job={job_id})"),
            Self::GetJob { job_id } => write!(f, "get_job(job={job_id})"),
            Self::CreateResearchJob => write!(f, "create_research_job"),
            Self::UpdateResearchJob { job_id } => write!(f, "update_research_job(job={job_id})"),
            Self::Migration => write!(f, "migration"),
            Self::Query { description } => write!(f, "query({description})"),
        }
    }
}

/// Store error with operation context
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity lookup came back empty
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before touching the database
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Unique tuple already taken
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Query execution error
    #[error("Query failed for operation '{operation}': {message}")]
    Query {
        operation: Box<StoreOperation>,
        message: String,
        #[source]
        source: sqlx::Error,
    },

    /// Connection pool creation or acquisition failed
    #[error("Database connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    /// Embedded migration failed
    #[error("Database migration failed: {message}")]
    Migration {
        message: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// Row contained data the model cannot represent
    #[error("Corrupt row for operation '{operation}': {message}")]
    CorruptRow {
        operation: Box<StoreOperation>,
        message: String,
    },
}

impl StoreError {
    /// Convert an `sqlx::Error` into a contextualized store error
    ///
    /// Unique-constraint violations become `Conflict` so callers can map them
    /// onto duplicate-resource responses.
    pub fn query_failed(operation: StoreOperation, source: sqlx::Error) -> Self {
        if let Some(db_err) = source.as_database_error()
            && db_err.is_unique_violation()
        {
            return Self::Conflict {
                message: format!("duplicate key during {operation}: {db_err}"),
            };
        }

        let message = source.to_string();
        Self::Query {
            operation: Box::new(operation),
            message,
            source,
        }
    }

    /// Shorthand for a missing resource
    pub fn resource_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "resource",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing job
    pub fn job_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "job",
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Extension trait for converting sqlx errors with context
pub trait StoreErrorExt<T> {
    /// Convert to `StoreError` with operation context
    ///
    /// # Errors
    /// Returns `StoreError` carrying the operation that failed
    fn map_store_err(self, operation: StoreOperation) -> StoreResult<T>;
}

impl<T> StoreErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn map_store_err(self, operation: StoreOperation) -> StoreResult<T> {
        self.map_err(|e| StoreError::query_failed(operation, e))
    }
}
