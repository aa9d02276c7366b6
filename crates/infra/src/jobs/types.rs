use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use verihire_core::TenantId;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    /// Some rows succeeded, some failed.
    Partial,
    Failed,
}

/// One row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub field: Option<String>,
    pub message: String,
}

/// State of one bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkJob {
    pub id: JobId,
    pub company: TenantId,
    pub operation: String,
    pub status: JobStatus,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub succeeded: usize,
    pub errors: Vec<RowError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BulkJob {
    pub fn new(company: TenantId, operation: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            company,
            operation: operation.into(),
            status: JobStatus::Pending,
            total_rows: 0,
            processed_rows: 0,
            succeeded: 0,
            errors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start(&mut self, total_rows: usize, now: DateTime<Utc>) {
        self.status = JobStatus::Processing;
        self.total_rows = total_rows;
        self.updated_at = now;
    }

    pub fn row_succeeded(&mut self, now: DateTime<Utc>) {
        self.processed_rows += 1;
        self.succeeded += 1;
        self.updated_at = now;
    }

    pub fn row_failed(&mut self, error: RowError, now: DateTime<Utc>) {
        self.processed_rows += 1;
        self.errors.push(error);
        self.updated_at = now;
    }

    /// Close the job; the terminal status follows from the row outcomes.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.status = match (self.succeeded, self.errors.len()) {
            (0, 0) => JobStatus::Completed,
            (_, 0) => JobStatus::Completed,
            (0, _) => JobStatus::Failed,
            _ => JobStatus::Partial,
        };
        self.updated_at = now;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Completed | JobStatus::Partial | JobStatus::Failed
        )
    }
}
