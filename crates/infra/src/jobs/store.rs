use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use super::types::{BulkJob, JobId};

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, job: BulkJob) -> Result<(), JobStoreError>;

    async fn get(&self, id: JobId) -> Result<BulkJob, JobStoreError>;
}

#[async_trait]
impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    async fn put(&self, job: BulkJob) -> Result<(), JobStoreError> {
        (**self).put(job).await
    }

    async fn get(&self, id: JobId) -> Result<BulkJob, JobStoreError> {
        (**self).get(id).await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, BulkJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: BulkJob) -> Result<(), JobStoreError> {
        self.jobs
            .write()
            .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))?
            .insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<BulkJob, JobStoreError> {
        self.jobs
            .read()
            .map_err(|_| JobStoreError::Storage("lock poisoned".to_string()))?
            .get(&id)
            .cloned()
            .ok_or(JobStoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verihire_core::TenantId;

    #[tokio::test]
    async fn jobs_round_trip_and_missing_ids_error() {
        let store = InMemoryJobStore::new();
        let job = BulkJob::new(TenantId::new(), "employee_import", Utc::now());
        let id = job.id;

        store.put(job.clone()).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), job);
        assert!(matches!(
            store.get(JobId::new()).await.unwrap_err(),
            JobStoreError::NotFound
        ));
    }
}
