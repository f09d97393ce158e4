//! Document-store contracts for the records the pipelines read and write.
//!
//! Reads return `Ok(None)` when a record is absent so that "not found" stays
//! distinct from a failing backend.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{
    DisasterRecord, DisasterStatus, ProcessingMatrixRecord, ResourceCandidate, TaskRecord,
    UserRequestRecord,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait DisasterRepository: Send + Sync {
    async fn insert_disaster(&self, record: &DisasterRecord) -> Result<(), RepositoryError>;
    async fn fetch_disaster(
        &self,
        disaster_id: &str,
    ) -> Result<Option<DisasterRecord>, RepositoryError>;
    async fn update_disaster_status(
        &self,
        disaster_id: &str,
        status: DisasterStatus,
    ) -> Result<(), RepositoryError>;
    /// Disasters whose geohash starts with `geohash`, submitted after the
    /// given instant, newest first.
    async fn disasters_in_cell(
        &self,
        geohash: &str,
        submitted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DisasterRecord>, RepositoryError>;
    async fn insert_processing_matrix(
        &self,
        record: &ProcessingMatrixRecord,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn resources_for_disaster(
        &self,
        disaster_id: &str,
    ) -> Result<Vec<ResourceCandidate>, RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn tasks_for(
        &self,
        user_id: &str,
        disaster_id: &str,
    ) -> Result<Vec<TaskRecord>, RepositoryError>;
    async fn fetch_task(&self, task_id: &str) -> Result<Option<TaskRecord>, RepositoryError>;
    async fn insert_task(&self, record: &TaskRecord) -> Result<(), RepositoryError>;
    async fn update_task(&self, record: &TaskRecord) -> Result<(), RepositoryError>;
    async fn delete_task(&self, task_id: &str) -> Result<(), RepositoryError>;
}

/// User requests are keyed by requester id: one live request per requester.
#[async_trait]
pub trait UserRequestRepository: Send + Sync {
    async fn fetch_user_request(
        &self,
        user_id: &str,
    ) -> Result<Option<UserRequestRecord>, RepositoryError>;
    async fn insert_user_request(&self, record: &UserRequestRecord) -> Result<(), RepositoryError>;
    async fn delete_user_request(&self, user_id: &str) -> Result<(), RepositoryError>;
}
