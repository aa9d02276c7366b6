use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use verihire_audit::store::{
    AuditLogFilter, AuditLogStore, AuditStoreError, SecurityEventFilter, SecurityEventStore,
};
use verihire_audit::{AuditEntry, ResolveError, SecurityEvent, SecurityEventKind, Severity};
use verihire_core::{AuditLogId, SecurityEventId, UserId};

fn storage(err: impl std::fmt::Display) -> AuditStoreError {
    AuditStoreError::Storage(err.to_string())
}

fn severity_rank(severity: Severity) -> i16 {
    match severity {
        Severity::Low => 0,
        Severity::Medium => 1,
        Severity::High => 2,
        Severity::Critical => 3,
    }
}

/// Postgres-backed audit trail. Rows are insert-only.
#[derive(Debug, Clone)]
pub struct PostgresAuditLogStore {
    pool: Arc<PgPool>,
}

impl PostgresAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Insert one entry inside an existing transaction.
    pub(crate) async fn insert_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        entry: &AuditEntry,
    ) -> Result<(), sqlx::Error> {
        let payload =
            serde_json::to_value(entry).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, action, actor_user, recorded_at, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.actor.user.map(|u| *u.as_uuid()))
        .bind(entry.recorded_at)
        .bind(payload)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditLogStore for PostgresAuditLogStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditLogId, AuditStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        Self::insert_in_tx(&mut tx, &entry).await.map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(entry.id)
    }

    async fn list(&self, filter: AuditLogFilter) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let limit = filter.limit.unwrap_or(200) as i64;
        let rows = sqlx::query(
            r#"
            SELECT payload FROM audit_logs
            WHERE ($1::uuid IS NULL OR actor_user = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::timestamptz IS NULL OR recorded_at >= $3)
            ORDER BY recorded_at DESC
            LIMIT $4
            "#,
        )
        .bind(filter.actor.map(|u| *u.as_uuid()))
        .bind(filter.action.map(|a| a.as_str()))
        .bind(filter.since)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(storage)?;

        rows.into_iter()
            .map(|row| {
                let payload: serde_json::Value = row.get("payload");
                serde_json::from_value(payload).map_err(storage)
            })
            .collect()
    }
}

/// Postgres-backed security event recorder.
#[derive(Debug, Clone)]
pub struct PostgresSecurityEventStore {
    pool: Arc<PgPool>,
}

impl PostgresSecurityEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl SecurityEventStore for PostgresSecurityEventStore {
    async fn append(&self, event: SecurityEvent) -> Result<SecurityEventId, AuditStoreError> {
        let payload = serde_json::to_value(&event).map_err(storage)?;
        sqlx::query(
            r#"
            INSERT INTO security_events (id, kind, severity, ip, resolved, recorded_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.kind.as_str())
        .bind(severity_rank(event.severity))
        .bind(&event.ip)
        .bind(event.resolved)
        .bind(event.recorded_at)
        .bind(payload)
        .execute(self.pool.as_ref())
        .await
        .map_err(storage)?;
        Ok(event.id)
    }

    async fn count_recent(
        &self,
        kind: SecurityEventKind,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AuditStoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM security_events
             WHERE kind = $1 AND ip = $2 AND recorded_at >= $3",
        )
        .bind(kind.as_str())
        .bind(ip)
        .bind(since)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(storage)?;
        let count: i64 = row.get("n");
        Ok(count as u64)
    }

    async fn list(
        &self,
        filter: SecurityEventFilter,
    ) -> Result<Vec<SecurityEvent>, AuditStoreError> {
        let limit = filter.limit.unwrap_or(200) as i64;
        let rows = sqlx::query(
            r#"
            SELECT payload FROM security_events
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::smallint IS NULL OR severity >= $2)
              AND ($3::boolean IS NULL OR resolved = $3)
              AND ($4::timestamptz IS NULL OR recorded_at >= $4)
            ORDER BY recorded_at DESC
            LIMIT $5
            "#,
        )
        .bind(filter.kind.map(|k| k.as_str()))
        .bind(filter.min_severity.map(severity_rank))
        .bind(filter.resolved)
        .bind(filter.since)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(storage)?;

        rows.into_iter()
            .map(|row| {
                let payload: serde_json::Value = row.get("payload");
                serde_json::from_value(payload).map_err(storage)
            })
            .collect()
    }

    async fn resolve(
        &self,
        id: SecurityEventId,
        resolver: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AuditStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let row = sqlx::query("SELECT payload FROM security_events WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?
            .ok_or(AuditStoreError::NotFound)?;

        let payload: serde_json::Value = row.get("payload");
        let mut event: SecurityEvent = serde_json::from_value(payload).map_err(storage)?;
        event.resolve(resolver, notes, now).map_err(|e| match e {
            ResolveError::AlreadyResolved => AuditStoreError::AlreadyResolved,
        })?;

        let payload = serde_json::to_value(&event).map_err(storage)?;
        sqlx::query("UPDATE security_events SET resolved = TRUE, payload = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}
