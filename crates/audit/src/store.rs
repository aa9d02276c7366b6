//! Store ports for the audit trail and security events.
//!
//! Implementations live in `verihire-infra` (in-memory for tests/dev,
//! Postgres for production). Both stores are append-only from the system's
//! perspective; a security event's resolution fields are the only update.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use verihire_core::{AuditLogId, SecurityEventId, UserId};

use crate::event::{SecurityEvent, SecurityEventKind, Severity};
use crate::log::{AuditAction, AuditEntry};

#[derive(Debug, Error)]
pub enum AuditStoreError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("not found")]
    NotFound,

    #[error("event is already resolved")]
    AlreadyResolved,
}

/// Query filter for audit log listings.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Query filter for security event listings.
#[derive(Debug, Clone, Default)]
pub struct SecurityEventFilter {
    pub kind: Option<SecurityEventKind>,
    pub min_severity: Option<Severity>,
    pub resolved: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Durable, append-only audit trail.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Append one entry; entries are never updated or deleted.
    async fn append(&self, entry: AuditEntry) -> Result<AuditLogId, AuditStoreError>;

    /// List entries, newest first.
    async fn list(&self, filter: AuditLogFilter) -> Result<Vec<AuditEntry>, AuditStoreError>;
}

/// Durable security event recorder.
#[async_trait]
pub trait SecurityEventStore: Send + Sync {
    async fn append(&self, event: SecurityEvent) -> Result<SecurityEventId, AuditStoreError>;

    /// Count events of `kind` from `ip` recorded at or after `since`.
    ///
    /// This feeds the credential verifier's lockout pre-check.
    async fn count_recent(
        &self,
        kind: SecurityEventKind,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AuditStoreError>;

    /// List events, newest first.
    async fn list(
        &self,
        filter: SecurityEventFilter,
    ) -> Result<Vec<SecurityEvent>, AuditStoreError>;

    /// Mark an event resolved; fails with [`AuditStoreError::AlreadyResolved`]
    /// on a second call.
    async fn resolve(
        &self,
        id: SecurityEventId,
        resolver: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AuditStoreError>;
}

#[async_trait]
impl<S> AuditLogStore for Arc<S>
where
    S: AuditLogStore + ?Sized,
{
    async fn append(&self, entry: AuditEntry) -> Result<AuditLogId, AuditStoreError> {
        (**self).append(entry).await
    }

    async fn list(&self, filter: AuditLogFilter) -> Result<Vec<AuditEntry>, AuditStoreError> {
        (**self).list(filter).await
    }
}

#[async_trait]
impl<S> SecurityEventStore for Arc<S>
where
    S: SecurityEventStore + ?Sized,
{
    async fn append(&self, event: SecurityEvent) -> Result<SecurityEventId, AuditStoreError> {
        (**self).append(event).await
    }

    async fn count_recent(
        &self,
        kind: SecurityEventKind,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AuditStoreError> {
        (**self).count_recent(kind, ip, since).await
    }

    async fn list(
        &self,
        filter: SecurityEventFilter,
    ) -> Result<Vec<SecurityEvent>, AuditStoreError> {
        (**self).list(filter).await
    }

    async fn resolve(
        &self,
        id: SecurityEventId,
        resolver: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AuditStoreError> {
        (**self).resolve(id, resolver, notes, now).await
    }
}
