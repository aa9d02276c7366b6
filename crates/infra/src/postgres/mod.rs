//! Postgres-backed store implementations.
//!
//! All queries are runtime-bound (`sqlx::query` + `bind`); audited mutations
//! run inside a single transaction with their audit row. Audit and security
//! event rows keep a serialized `payload` column alongside the indexed
//! columns, the same shape the filters query against.

pub mod audit;
pub mod counters;
pub mod directory;

pub use audit::{PostgresAuditLogStore, PostgresSecurityEventStore};
pub use counters::PostgresCounterStore;
pub use directory::PostgresDirectoryStore;

use sqlx::PgPool;

/// Create the schema when it does not exist yet. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id UUID PRIMARY KEY,
            action TEXT NOT NULL,
            actor_user UUID,
            recorded_at TIMESTAMPTZ NOT NULL,
            payload JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS security_events (
            id UUID PRIMARY KEY,
            kind TEXT NOT NULL,
            severity SMALLINT NOT NULL,
            ip TEXT,
            resolved BOOLEAN NOT NULL DEFAULT FALSE,
            recorded_at TIMESTAMPTZ NOT NULL,
            payload JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rate_counters (
            key TEXT PRIMARY KEY,
            count BIGINT NOT NULL,
            window_expires_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            registration_number TEXT NOT NULL UNIQUE,
            registration_date DATE NOT NULL,
            address TEXT NOT NULL,
            contact_person TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            employee_count BIGINT NOT NULL DEFAULT 0,
            created_by UUID,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id UUID PRIMARY KEY,
            company UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id UUID PRIMARY KEY,
            company UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            employee_ref TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            date_joined DATE NOT NULL,
            created_by UUID,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employee_positions (
            id UUID PRIMARY KEY,
            employee UUID NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
            department UUID,
            title TEXT NOT NULL,
            duties TEXT NOT NULL DEFAULT '',
            start_date DATE NOT NULL,
            end_date DATE,
            is_current BOOLEAN NOT NULL,
            employment_type TEXT NOT NULL,
            salary_cents BIGINT,
            created_by UUID,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_security_events_lockout
         ON security_events (kind, ip, recorded_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_positions_current
         ON employee_positions (employee) WHERE is_current",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
