// crates/relief-core/src/error.rs

use thiserror::Error;

use crate::repository::RepositoryError;
use crate::types::{DisasterStatus, TaskStatus};

/// Failures that cross the core boundary. Everything else is absorbed into
/// the outcome map, the audit log or the task origin flags.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("disaster '{0}' not found")]
    DisasterNotFound(String),

    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("repository operation failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("disaster '{id}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: String,
        from: DisasterStatus,
        to: DisasterStatus,
    },

    #[error("task '{id}' cannot move from {from:?} to {to:?}")]
    InvalidTaskTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
