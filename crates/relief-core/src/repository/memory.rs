use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{
    DisasterRepository, RepositoryError, ResourceRepository, TaskRepository,
    UserRequestRepository,
};
use crate::types::{
    DisasterRecord, DisasterStatus, ProcessingMatrixRecord, ResourceCandidate, TaskRecord,
    UserRequestRecord,
};

/// Process-local document store implementing every repository contract.
///
/// Each operation is atomic on its own; nothing spans several calls.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Collections>,
}

#[derive(Debug, Default)]
struct Collections {
    disasters: HashMap<String, DisasterRecord>,
    matrices: HashMap<String, ProcessingMatrixRecord>,
    resources: Vec<(String, ResourceCandidate)>,
    tasks: Vec<TaskRecord>,
    user_requests: HashMap<String, UserRequestRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_resource(&self, disaster_id: impl Into<String>, resource: ResourceCandidate) {
        self.inner
            .lock()
            .await
            .resources
            .push((disaster_id.into(), resource));
    }

    pub async fn processing_matrix(&self, disaster_id: &str) -> Option<ProcessingMatrixRecord> {
        self.inner.lock().await.matrices.get(disaster_id).cloned()
    }

    pub async fn all_tasks(&self) -> Vec<TaskRecord> {
        self.inner.lock().await.tasks.clone()
    }
}

#[async_trait]
impl DisasterRepository for InMemoryStore {
    async fn insert_disaster(&self, record: &DisasterRecord) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .await
            .disasters
            .insert(record.disaster_id.clone(), record.clone());
        Ok(())
    }

    async fn fetch_disaster(
        &self,
        disaster_id: &str,
    ) -> Result<Option<DisasterRecord>, RepositoryError> {
        Ok(self.inner.lock().await.disasters.get(disaster_id).cloned())
    }

    async fn update_disaster_status(
        &self,
        disaster_id: &str,
        status: DisasterStatus,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .disasters
            .get_mut(disaster_id)
            .ok_or_else(|| RepositoryError::NotFound(disaster_id.to_string()))?;
        record.status = status;
        Ok(())
    }

    async fn disasters_in_cell(
        &self,
        geohash: &str,
        submitted_after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DisasterRecord>, RepositoryError> {
        let inner = self.inner.lock().await;
        let mut matches: Vec<DisasterRecord> = inner
            .disasters
            .values()
            .filter(|record| record.geohash.starts_with(geohash))
            .filter(|record| record.submitted_at >= submitted_after)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn insert_processing_matrix(
        &self,
        record: &ProcessingMatrixRecord,
    ) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .await
            .matrices
            .insert(record.disaster_id.clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl ResourceRepository for InMemoryStore {
    async fn resources_for_disaster(
        &self,
        disaster_id: &str,
    ) -> Result<Vec<ResourceCandidate>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .resources
            .iter()
            .filter(|(owner, _)| owner == disaster_id)
            .map(|(_, resource)| resource.clone())
            .collect())
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn tasks_for(
        &self,
        user_id: &str,
        disaster_id: &str,
    ) -> Result<Vec<TaskRecord>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id && task.disaster_id == disaster_id)
            .cloned()
            .collect())
    }

    async fn fetch_task(&self, task_id: &str) -> Result<Option<TaskRecord>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .iter()
            .find(|task| task.task_id == task_id)
            .cloned())
    }

    async fn insert_task(&self, record: &TaskRecord) -> Result<(), RepositoryError> {
        self.inner.lock().await.tasks.push(record.clone());
        Ok(())
    }

    async fn update_task(&self, record: &TaskRecord) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let slot = inner
            .tasks
            .iter_mut()
            .find(|task| task.task_id == record.task_id)
            .ok_or_else(|| RepositoryError::NotFound(record.task_id.clone()))?;
        *slot = record.clone();
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|task| task.task_id != task_id);
        if inner.tasks.len() == before {
            return Err(RepositoryError::NotFound(task_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRequestRepository for InMemoryStore {
    async fn fetch_user_request(
        &self,
        user_id: &str,
    ) -> Result<Option<UserRequestRecord>, RepositoryError> {
        Ok(self.inner.lock().await.user_requests.get(user_id).cloned())
    }

    async fn insert_user_request(&self, record: &UserRequestRecord) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .await
            .user_requests
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_user_request(&self, user_id: &str) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .await
            .user_requests
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(user_id.to_string()))
    }
}
