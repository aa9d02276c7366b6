use std::sync::Arc;

use verihire_audit::{AuditLogStore, SecurityEventStore};
use verihire_auth::{Principal, RoleCatalog};
use verihire_core::UserId;
use verihire_directory::DirectoryStore;
use verihire_infra::jobs::{EmployeeBulkImporter, JobStore};
use verihire_infra::mail::{LogMailSender, MailSender};
use verihire_infra::memory::{
    InMemoryAuditLogStore, InMemoryCounterStore, InMemoryDirectoryStore,
    InMemorySecurityEventStore, InMemorySessionStore, InMemoryUserDirectory,
};
use verihire_infra::postgres::{
    ensure_schema, PostgresAuditLogStore, PostgresCounterStore, PostgresDirectoryStore,
    PostgresSecurityEventStore,
};
use verihire_infra::InMemoryJobStore;
use verihire_pii::FieldCipher;
use verihire_security::credentials::{CredentialVerifier, TokenIssuer, UserDirectory};
use verihire_security::rate_limit::{CounterStore, RateLimiter};
use verihire_security::SecurityPipeline;

use super::AppConfig;

/// Shared service graph behind every handler.
pub struct AppServices {
    pub pipeline: SecurityPipeline,
    pub verifier: CredentialVerifier,
    pub sessions: Arc<dyn TokenIssuer>,
    pub users: Arc<InMemoryUserDirectory>,
    pub directory: Arc<dyn DirectoryStore>,
    pub audit: Arc<dyn AuditLogStore>,
    pub events: Arc<dyn SecurityEventStore>,
    pub jobs: Arc<dyn JobStore>,
    pub importer: EmployeeBulkImporter,
    pub cipher: FieldCipher,
}

/// Wire the store set.
///
/// With a `DATABASE_URL` the audit trail, security events, counters and the
/// directory land in Postgres; the user directory and sessions stay in
/// memory either way.
pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    let users = Arc::new(InMemoryUserDirectory::new());
    let sessions: Arc<dyn TokenIssuer> = Arc::new(InMemorySessionStore::new());

    let (audit, events, counters, directory): (
        Arc<dyn AuditLogStore>,
        Arc<dyn SecurityEventStore>,
        Arc<dyn CounterStore>,
        Arc<dyn DirectoryStore>,
    ) = match &config.database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            ensure_schema(&pool).await?;
            (
                Arc::new(PostgresAuditLogStore::new(pool.clone())),
                Arc::new(PostgresSecurityEventStore::new(pool.clone())),
                Arc::new(PostgresCounterStore::new(pool.clone())),
                Arc::new(PostgresDirectoryStore::new(pool)),
            )
        }
        None => {
            let audit = Arc::new(InMemoryAuditLogStore::new());
            (
                audit.clone(),
                Arc::new(InMemorySecurityEventStore::new()),
                Arc::new(InMemoryCounterStore::new()),
                Arc::new(InMemoryDirectoryStore::new(audit)),
            )
        }
    };

    if let Some(password) = &config.admin_password {
        users.seed(
            Principal::new(UserId::new(), "admin").system_admin(),
            password,
        )?;
        tracing::info!("seeded system admin user 'admin'");
    }

    let verifier = CredentialVerifier::new(
        users.clone() as Arc<dyn UserDirectory>,
        sessions.clone(),
        events.clone(),
        audit.clone(),
    );
    let limiter = RateLimiter::new(counters, events.clone());
    let pipeline = SecurityPipeline::new(
        limiter,
        RoleCatalog::builtin(),
        audit.clone(),
        events.clone(),
    );

    let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let importer = EmployeeBulkImporter::new(
        directory.clone(),
        jobs.clone(),
        audit.clone(),
        Arc::new(LogMailSender) as Arc<dyn MailSender>,
    );

    Ok(AppServices {
        pipeline,
        verifier,
        sessions,
        users,
        directory,
        audit,
        events,
        jobs,
        importer,
        cipher: config.cipher,
    })
}
